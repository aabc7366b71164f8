//! User components: the [`Component`] trait, component classes and the [`Context`] they render in.

use crate::{
	description::Description,
	error::ComponentResolutionError,
	store::{Command, CommandSink},
	value::{Object, Value},
};
use core::{
	cell::Cell,
	fmt::{self, Debug, Formatter},
};
use futures_util::future::LocalBoxFuture;
use std::{borrow::Cow, rc::Rc};

/// A component instance.
///
/// Props and children are owned by the render tree and handed in through [`Context`], so `render` always sees the
/// values it is about to be updated to. Hooks run in the order documented in [`lifecycle`](`crate::lifecycle`).
pub trait Component: 'static {
	/// Returns this component's template. [`Value::Null`] or `false` render nothing (a placeholder comment).
	fn render(&self, context: &Context<'_>) -> Value;

	fn on_created(&mut self, _context: &Context<'_>) {}
	fn on_attached(&mut self, _context: &Context<'_>) {}
	fn on_props_received(&mut self, _context: &Context<'_>, _next_props: &Object) {}
	fn on_updated(&mut self, _context: &Context<'_>) {}
	fn on_destroyed(&mut self, _context: &Context<'_>) {}
	fn on_detached(&mut self, _context: &Context<'_>) {}
}

pub type InitHook = Box<dyn Fn() -> LocalBoxFuture<'static, Result<(), String>>>;

/// The static side of a component: a name, a constructor, declared dependencies and an optional async `init` hook.
pub struct ComponentClass {
	name: Cow<'static, str>,
	construct: Box<dyn Fn() -> Box<dyn Component>>,
	dependencies: Vec<String>,
	init: Option<InitHook>,
	initialized: Cell<bool>,
}
impl ComponentClass {
	pub fn new<C: Component>(name: impl Into<Cow<'static, str>>, construct: impl Fn() -> C + 'static) -> Self {
		Self {
			name: name.into(),
			construct: Box::new(move || -> Box<dyn Component> { Box::new(construct()) }),
			dependencies: Vec::new(),
			init: None,
			initialized: Cell::new(false),
		}
	}

	/// Declares a component id that [`Resolver::preload`](`crate::resolver::Resolver::preload`) fetches alongside this one.
	#[must_use]
	pub fn depends_on(mut self, id: impl Into<String>) -> Self {
		self.dependencies.push(id.into());
		self
	}

	#[must_use]
	pub fn with_init<F>(mut self, init: impl Fn() -> F + 'static) -> Self
	where
		F: core::future::Future<Output = Result<(), String>> + 'static,
	{
		self.init = Some(Box::new(move || -> LocalBoxFuture<'static, Result<(), String>> { Box::pin(init()) }));
		self
	}

	#[must_use]
	pub fn into_ref(self) -> ComponentRef {
		ComponentRef(Rc::new(self))
	}
}

impl Debug for ComponentClass {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentClass")
			.field("name", &self.name)
			.field("dependencies", &self.dependencies)
			.field("init", &self.init.is_some())
			.field("initialized", &self.initialized.get())
			.finish()
	}
}

/// A shared [`ComponentClass`]. Equality is identity: two classes with the same name are still different components.
#[derive(Clone)]
pub struct ComponentRef(Rc<ComponentClass>);
impl ComponentRef {
	#[must_use]
	pub fn name(&self) -> &str {
		&self.0.name
	}

	#[must_use]
	pub fn dependencies(&self) -> &[String] {
		&self.0.dependencies
	}

	#[must_use]
	pub fn instantiate(&self) -> Box<dyn Component> {
		(self.0.construct)()
	}

	#[must_use]
	pub fn is_initialized(&self) -> bool {
		self.0.init.is_none() || self.0.initialized.get()
	}

	/// Runs the class's `init` hook unless it already completed successfully.
	pub async fn initialize(&self) -> Result<(), ComponentResolutionError> {
		if self.is_initialized() {
			return Ok(());
		}
		if let Some(init) = &self.0.init {
			init().await.map_err(|message| ComponentResolutionError::Init {
				id: self.name().to_string(),
				message,
			})?;
		}
		self.0.initialized.set(true);
		Ok(())
	}
}

impl PartialEq for ComponentRef {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for ComponentRef {}

impl Debug for ComponentRef {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "<{}>", self.name())
	}
}

/// What a component sees while rendering or receiving a lifecycle notification.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
	props: &'a Object,
	children: &'a [Description],
	sink: &'a CommandSink,
}
impl<'a> Context<'a> {
	#[must_use]
	pub fn new(props: &'a Object, children: &'a [Description], sink: &'a CommandSink) -> Self {
		Self { props, children, sink }
	}

	#[must_use]
	pub fn props(&self) -> &'a Object {
		self.props
	}

	#[must_use]
	pub fn prop(&self, name: &str) -> Option<&'a Value> {
		self.props.get(name)
	}

	#[must_use]
	pub fn children(&self) -> &'a [Description] {
		self.children
	}

	/// The children as templates, ready to be embedded into this component's own template.
	#[must_use]
	pub fn child_templates(&self) -> Vec<Value> {
		self.children.iter().map(Description::as_template).collect()
	}

	#[must_use]
	pub fn sink(&self) -> &'a CommandSink {
		self.sink
	}

	/// Queues a command. It is processed after the current render pass has completed.
	pub fn dispatch(&self, command: Command) {
		self.sink.dispatch(command);
	}
}
