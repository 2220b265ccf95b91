//! Ontoclaw Gateway - WebSocket JSON-RPC server and the terminal chat surface

pub mod auth;
pub mod render;
pub mod rpc;
pub mod server;
pub mod terminal;
pub mod ws;

pub use server::{router, start_gateway};
pub use terminal::{Command, Terminal};
pub use ws::WsState;
