use crate::node::NodeId;
use thiserror::Error;

/// Everything that can go wrong while describing, diffing or patching.
///
/// None of these are recovered from internally. A failure during patch application leaves the render tree partially
/// patched, and the render session should be treated as broken afterwards.
#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	InvalidTemplate(#[from] InvalidTemplateError),

	/// A stale or freed [`NodeId`] reached lifecycle dispatch or patch application.
	#[error("Unknown render tree node {0:?}")]
	UnknownNode(NodeId),

	#[error(transparent)]
	ComponentResolution(#[from] ComponentResolutionError),

	#[error(transparent)]
	CommandConflict(#[from] CommandConflictError),

	#[error(transparent)]
	Document(#[from] DocumentError),

	#[error("Patch {patch} does not match the render tree: {reason}")]
	PatchMismatch { patch: &'static str, reason: String },

	#[error("Depth limit of {0} reached while rendering")]
	DepthLimit(usize),

	#[error("The root description must describe a component")]
	InvalidRoot,
}

/// A template that does not follow the `[type, props?, text | ...children]` grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid template at index {index}: expected {expected}, found {found}")]
pub struct InvalidTemplateError {
	pub index: usize,
	pub expected: &'static str,
	pub found: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentResolutionError {
	#[error("Component `{0}` was not found")]
	NotFound(String),

	#[error("Component `{id}` failed to load: {message}")]
	Load { id: String, message: String },

	#[error("Component `{id}` failed to initialize: {message}")]
	Init { id: String, message: String },

	/// Raised synchronously by [`describe_with`](`crate::template::describe_with`) for ids that haven't been resolved yet.
	#[error("Component `{0}` has not been resolved yet")]
	NotLoaded(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Command `{command}` is defined by more than one reducer")]
pub struct CommandConflictError {
	pub command: String,
}

/// A failed call into a [`Document`](`crate::document::Document`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Document operation `{operation}` failed: {message}")]
pub struct DocumentError {
	pub operation: &'static str,
	pub message: String,
}
impl DocumentError {
	#[must_use]
	pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
		Self {
			operation,
			message: message.into(),
		}
	}
}
