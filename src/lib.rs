//! Administrative console for Tryton servers.
//!
//! The library holds everything below the terminal: the JSON-RPC client,
//! view parsing, field coercion, form and table state, menu navigation and
//! the wizard driver. The binary only wires these to commands and prompts.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod fields;
pub mod form;
pub mod navigation;
pub mod session_store;
pub mod view;
pub mod wizard;

pub use error::{ConsoleError, Result};
