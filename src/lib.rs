#![doc(html_root_url = "https://docs.rs/ligature/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A component-based render tree differ.
//!
//! Templates are described into [`Description`]s, diffed against a persistent render [`Tree`] into [`Patch`]es, and
//! applied to a [`Document`] between two rounds of [`lifecycle`] notifications. [`App`] ties this to a [`Store`] and
//! a [`Resolver`].

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod allow_list;
pub mod app;
pub mod component;
pub mod description;
pub mod diff;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod listener_bindings;
pub mod node;
pub mod patch;
pub mod reconciler;
pub mod resolver;
pub mod store;
pub mod template;
pub mod value;
#[cfg(feature = "web")]
pub mod web;

pub use app::{App, Config};
pub use component::{Component, ComponentClass, ComponentRef, Context};
pub use description::{Description, Key};
pub use diff::{calculate, RootContext};
pub use document::{Document, MemoryDocument, MemoryHandle};
pub use error::Error;
pub use node::{NodeId, Tree};
pub use patch::Patch;
pub use reconciler::{calculate_moves, Move};
pub use resolver::{Loader, Resolver, StaticLoader};
pub use store::{combine, Command, CommandSink, Reducer, Store};
pub use template::{describe, describe_with};
pub use value::{Callback, Event, Object, Value};
#[cfg(feature = "web")]
pub use web::WebDocument;
