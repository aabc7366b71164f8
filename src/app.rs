//! The render pipeline: reduce, describe, diff, notify, patch.

use crate::{
	component::ComponentRef,
	description::{ComponentDescription, Description},
	diff::{calculate, RootContext},
	document::Document,
	error::{ComponentResolutionError, Error},
	lifecycle::{after_update, before_update},
	node::Tree,
	patch::Patch,
	resolver::Resolver,
	store::{Command, CommandSink, Store},
	value::{Object, Value},
};
use core::fmt::{self, Debug, Formatter};
use tracing::{debug, error, info, instrument, trace, trace_span, Instrument};

/// Runtime configuration of an [`App`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	/// How deeply render tree nodes may nest.
	pub depth_limit: usize,
	/// Whether [`App::mount`] resolves every declared component dependency before the first render.
	/// Without preloading, components referenced by id are resolved when a render first reaches them.
	pub preload: bool,
}
impl Default for Config {
	fn default() -> Self {
		Self { depth_limit: 256, preload: true }
	}
}

/// Owns a render tree, its state and the resolver its templates are described with.
///
/// The root component receives the state as props: the fields of an object state, or a single `state` prop otherwise.
/// Every command is reduced and fully rendered before the next one is taken from the queue.
pub struct App<D: Document> {
	tree: Tree<D>,
	store: Store,
	resolver: Resolver,
	root_class: ComponentRef,
	container: D::Handle,
	sink: CommandSink,
	config: Config,
}

impl<D: Document> App<D> {
	pub fn new(document: D, container: D::Handle, root_class: ComponentRef, store: Store, resolver: Resolver, config: Config) -> Self {
		Self {
			tree: Tree::new(document),
			store,
			resolver,
			root_class,
			container,
			sink: CommandSink::new(),
			config,
		}
	}

	#[must_use]
	pub fn tree(&self) -> &Tree<D> {
		&self.tree
	}

	#[must_use]
	pub fn document(&self) -> &D {
		self.tree.document()
	}

	#[must_use]
	pub fn state(&self) -> &Value {
		self.store.state()
	}

	/// The queue commands are dispatched into, e.g. from event listeners.
	#[must_use]
	pub fn sink(&self) -> &CommandSink {
		&self.sink
	}

	#[must_use]
	pub fn resolver(&self) -> &Resolver {
		&self.resolver
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	#[must_use]
	pub fn is_mounted(&self) -> bool {
		self.tree.root().is_some()
	}

	/// Renders the root component into the container, then processes commands dispatched meanwhile.
	///
	/// # Errors
	///
	/// Resolution errors from preloading, and anything the render pass raises.
	#[instrument(skip(self), fields(root = self.root_class.name()))]
	pub async fn mount(&mut self) -> Result<(), Error> {
		if self.config.preload {
			self.resolver.preload_dependencies(&self.root_class).await?;
		} else {
			self.root_class.initialize().await?;
		}
		self.render().await?;
		self.process_pending().await?;
		Ok(())
	}

	/// Queues `command` and processes the queue.
	///
	/// # Errors
	///
	/// Anything a resulting render pass raises.
	pub async fn dispatch(&mut self, command: Command) -> Result<(), Error> {
		self.sink.dispatch(command);
		self.process_pending().await.map(drop)
	}

	/// Reduces queued commands one at a time, re-rendering after each that changed the state.
	/// Returns the number of commands processed.
	///
	/// # Errors
	///
	/// Anything a render pass raises. Commands still queued at that point stay queued.
	pub async fn process_pending(&mut self) -> Result<usize, Error> {
		let mut processed = 0;
		while let Some(command) = self.sink.pop() {
			processed += 1;
			if self.store.apply(&command) && self.is_mounted() {
				self.render().instrument(trace_span!("command", name = %command.name)).await?;
			}
		}
		Ok(processed)
	}

	/// Removes the root from the container. Pending commands are kept.
	///
	/// # Errors
	///
	/// [`Error::UnknownNode`], [`Error::PatchMismatch`] or [`Error::Document`] if the tree was corrupted.
	#[instrument(skip(self))]
	pub fn unmount(&mut self) -> Result<(), Error> {
		let root = self.tree.root();
		let context = RootContext {
			container: self.container.clone(),
			sink: self.sink.clone(),
			resolver: Some(&self.resolver),
			depth_limit: self.config.depth_limit,
		};
		let patches = calculate(&mut self.tree, root, None, &context)?;
		Self::run(&mut self.tree, &patches)
	}

	fn root_description(&self) -> Description {
		let props = match self.store.state() {
			Value::Object(state) => state.clone(),
			state => {
				let mut props = Object::new();
				props.insert("state", state.clone());
				props
			}
		};
		Description::Component(ComponentDescription {
			component: self.root_class.clone(),
			props,
			children: Vec::new(),
			key: None,
		})
	}

	/// One full render pass. Components that aren't resolved yet are resolved and the pass is restarted.
	#[instrument(skip(self))]
	async fn render(&mut self) -> Result<(), Error> {
		let description = self.root_description();
		let mut resolved = None;
		loop {
			let root = self.tree.root();
			let context = RootContext {
				container: self.container.clone(),
				sink: self.sink.clone(),
				resolver: Some(&self.resolver),
				depth_limit: self.config.depth_limit,
			};
			match calculate(&mut self.tree, root, Some(&description), &context) {
				Ok(patches) => return Self::run(&mut self.tree, &patches),
				Err(Error::ComponentResolution(ComponentResolutionError::NotLoaded(id))) => {
					if resolved.as_ref() == Some(&id) {
						error!(%id, "Component is still missing after resolving it");
						return Err(ComponentResolutionError::NotLoaded(id).into());
					}
					debug!(%id, "Resolving component on demand");
					self.resolver.resolve(&id).await?;
					resolved = Some(id);
				}
				Err(error) => return Err(error),
			}
		}
	}

	fn run(tree: &mut Tree<D>, patches: &[Patch]) -> Result<(), Error> {
		before_update(tree, patches)?;
		for patch in patches {
			patch.apply(tree)?;
		}
		after_update(tree, patches)?;
		trace!(nodes = tree.len());
		info!(patches = patches.len(), "Render pass complete");
		Ok(())
	}
}

impl<D: Document> Debug for App<D>
where
	D: Debug,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("App")
			.field("tree", &self.tree)
			.field("state", self.store.state())
			.field("root_class", &self.root_class)
			.field("pending", &self.sink.len())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}
