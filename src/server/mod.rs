//! Connection acceptor, shared worker state and shutdown plumbing.

pub mod context;
pub mod listener;
pub mod shutdown;

pub use context::ServerContext;
pub use listener::Server;
pub use shutdown::{Shutdown, Signals};
