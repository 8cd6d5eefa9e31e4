//! Text building blocks for generated documents.
//!
//! - [`CodeBuilder`] - indentation-aware text buffer
//! - [`CodeFragment`] - intermediate representation for pieces of output
//! - [`Renderable`] - trait for nodes that can be turned into fragments
//! - [`Indent`] - indentation configuration

mod code_builder;
mod renderable;

pub use code_builder::{CodeBuilder, Indent};
pub use renderable::{CodeFragment, Renderable};
