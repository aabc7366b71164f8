//! Component resolution.
//!
//! A [`Loader`] turns component ids into classes, asynchronously. A [`Resolver`] caches what its loader produced for
//! as long as the resolver lives, runs each class's `init` hook once before the class is handed out, and can walk
//! the dependencies each class declares ahead of the first render.

use crate::{component::ComponentRef, error::ComponentResolutionError};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use futures_util::future::{self, LocalBoxFuture};
use hashbrown::{HashMap, HashSet};
use tracing::{debug, instrument, trace};

pub trait Loader {
	fn load(&self, id: &str) -> LocalBoxFuture<'_, Result<ComponentRef, ComponentResolutionError>>;
}

/// A [`Loader`] over a fixed set of statically linked classes.
#[derive(Debug, Default)]
pub struct StaticLoader {
	classes: HashMap<String, ComponentRef>,
}
impl StaticLoader {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, id: impl Into<String>, component: ComponentRef) -> Self {
		self.insert(id, component);
		self
	}

	pub fn insert(&mut self, id: impl Into<String>, component: ComponentRef) {
		self.classes.insert(id.into(), component);
	}
}

impl Loader for StaticLoader {
	fn load(&self, id: &str) -> LocalBoxFuture<'_, Result<ComponentRef, ComponentResolutionError>> {
		Box::pin(future::ready(self.classes.get(id).cloned().ok_or_else(|| ComponentResolutionError::NotFound(id.to_string()))))
	}
}

pub struct Resolver {
	loader: Box<dyn Loader>,
	cache: RefCell<HashMap<String, ComponentRef>>,
}
impl Resolver {
	pub fn new(loader: impl Loader + 'static) -> Self {
		Self {
			loader: Box::new(loader),
			cache: RefCell::new(HashMap::new()),
		}
	}

	/// A resolver that can't resolve anything, for applications that only reference classes directly.
	#[must_use]
	pub fn empty() -> Self {
		Self::new(StaticLoader::new())
	}

	/// Looks `id` up in the cache only.
	#[must_use]
	pub fn get(&self, id: &str) -> Option<ComponentRef> {
		self.cache.borrow().get(id).cloned()
	}

	#[must_use]
	pub fn is_resolved(&self, id: &str) -> bool {
		self.cache.borrow().contains_key(id)
	}

	/// Loads and initializes `id` unless it's cached already.
	///
	/// # Errors
	///
	/// Whatever the loader or the class's `init` hook fail with. Failures aren't cached, so a later call retries.
	#[instrument(skip(self))]
	pub async fn resolve(&self, id: &str) -> Result<ComponentRef, ComponentResolutionError> {
		if let Some(component) = self.get(id) {
			trace!("Cache hit");
			return Ok(component);
		}

		let component = self.loader.load(id).await?;
		component.initialize().await?;
		debug!(class = component.name(), "Resolved component");
		self.cache.borrow_mut().insert(id.to_string(), component.clone());
		Ok(component)
	}

	/// Resolves `id` and, recursively, every dependency it declares. Each id is visited once.
	///
	/// # Errors
	///
	/// The first resolution error encountered.
	#[instrument(skip(self))]
	pub async fn preload(&self, id: &str) -> Result<(), ComponentResolutionError> {
		self.preload_into(id.to_string(), &mut HashSet::new()).await
	}

	/// Initializes `component` and preloads its declared dependencies.
	///
	/// # Errors
	///
	/// The first initialization or resolution error encountered.
	#[instrument(skip(self))]
	pub async fn preload_dependencies(&self, component: &ComponentRef) -> Result<(), ComponentResolutionError> {
		component.initialize().await?;
		let mut visited = HashSet::new();
		for dependency in component.dependencies() {
			self.preload_into(dependency.clone(), &mut visited).await?;
		}
		Ok(())
	}

	fn preload_into<'a>(&'a self, id: String, visited: &'a mut HashSet<String>) -> LocalBoxFuture<'a, Result<(), ComponentResolutionError>> {
		Box::pin(async move {
			if visited.contains(&id) {
				return Ok(());
			}
			let component = self.resolve(&id).await?;
			visited.insert(id);
			for dependency in component.dependencies() {
				self.preload_into(dependency.clone(), visited).await?;
			}
			Ok(())
		})
	}
}

impl Debug for Resolver {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Resolver").field("cache", &self.cache.borrow().keys().collect::<Vec<_>>()).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::{Resolver, StaticLoader};
	use crate::{
		component::{ComponentClass, Context},
		error::ComponentResolutionError,
		value::Value,
		Component,
	};
	use core::cell::Cell;
	use std::rc::Rc;

	struct Leaf;
	impl Component for Leaf {
		fn render(&self, _: &Context<'_>) -> Value {
			Value::Null
		}
	}

	#[test]
	fn preload_walks_declared_dependencies_once() {
		let inits = Rc::new(Cell::new(0));
		let counted = |name: &'static str| {
			let inits = Rc::clone(&inits);
			ComponentClass::new(name, || Leaf).with_init(move || {
				inits.set(inits.get() + 1);
				async { Ok(()) }
			})
		};

		let loader = StaticLoader::new()
			.with("app", counted("App").depends_on("list").depends_on("item").into_ref())
			.with("list", counted("List").depends_on("item").depends_on("app").into_ref())
			.with("item", counted("Item").into_ref());
		let resolver = Resolver::new(loader);

		pollster::block_on(resolver.preload("app")).unwrap();
		assert!(resolver.is_resolved("app") && resolver.is_resolved("list") && resolver.is_resolved("item"));
		assert_eq!(inits.get(), 3);

		pollster::block_on(resolver.preload("app")).unwrap();
		assert_eq!(inits.get(), 3, "`init` runs once per class.");
	}

	#[test]
	fn failures_surface_and_are_not_cached() {
		let resolver = Resolver::new(StaticLoader::new().with("broken", ComponentClass::new("Broken", || Leaf).with_init(|| async { Err("no network".to_string()) }).into_ref()));

		assert_eq!(pollster::block_on(resolver.resolve("missing")).unwrap_err(), ComponentResolutionError::NotFound("missing".to_string()));
		assert!(matches!(pollster::block_on(resolver.resolve("broken")), Err(ComponentResolutionError::Init { .. })));
		assert!(!resolver.is_resolved("broken"));
	}
}
