//! Execution and analysis orchestration for editor snippets.
//!
//! Snippets are dispatched to a remote execution service and a remote model service;
//! results are normalized into stable shapes the editor can render.

pub mod analysis;
pub mod config;
pub mod debug;
pub mod error;
pub mod execution;
pub mod language;
pub mod llm;
pub mod printer;
pub mod workbench;

pub use error::EngineError;
