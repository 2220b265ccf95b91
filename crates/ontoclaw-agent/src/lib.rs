//! Ontoclaw Agent - Sessions and the task executor that turns requests into actions

pub mod executor;
pub mod guard;
pub mod session;

pub use executor::{ExecutorConfig, TaskExecutor, TurnOutcome};
pub use session::{Session, SessionKey, SessionRegistry, SessionState, SharedSession, GREETING};
