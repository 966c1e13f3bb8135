//! Lifecycle events emitted by the compiler and dispatcher.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::TetherEventHandler;
pub use types::*;
