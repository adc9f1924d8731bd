//! Project Kisan assistant core.
//!
//! Two mechanisms carry the assistant: [`fallback`] resolves a lookup against
//! an AI model, a local database and an external API in priority order, and
//! [`sandbox`] runs short snippets under a timeout, always answering with
//! displayable text. [`advisor`] wires both into farmer-facing lookups.

pub mod advisor;
pub mod cli;
pub mod config;
pub mod error;
pub mod external;
pub mod fallback;
pub mod llm;
pub mod logging;
pub mod printer;
pub mod sandbox;
pub mod store;

pub use error::{Error, Result};
