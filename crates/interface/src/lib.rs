//! Command surface of the engine.
//!
//! A [`SceneInterface`] queues [`Command`]s, either through its methods or by
//! parsing a scene script, and [`SceneInterface::run`] applies them in order
//! against a [`Session`].
//!
//! # Invariants
//! - Commands take effect strictly in queue order.
//! - The first failing command stops the run; nothing after it is applied.

pub mod command;
pub mod error;
pub mod script;
pub mod session;

pub use command::{Command, SceneInterface};
pub use error::{CommandError, EngineError};
pub use script::{ParseError, parse};
pub use session::Session;
