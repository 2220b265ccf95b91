//! Ontoclaw Core - Types, UI protocol, wire protocol, config, and error handling

pub mod config;
pub mod error;
pub mod intent;
pub mod protocol;
pub mod records;
pub mod types;
pub mod ui;

pub use config::OntoclawConfig;
pub use error::{Error, Result};
pub use intent::{Action, ContextSnapshot, Intent};
pub use protocol::*;
pub use records::*;
pub use types::*;
pub use ui::{CallbackAction, CallbackEvent, FormField, RadioOption, UiElement, UiSpec};
