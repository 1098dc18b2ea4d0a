//! Message transport between relay clients and the background process.
//!
//! This crate provides:
//! - the [`Transport`] seam the relay sends through
//! - an action-keyed [`Dispatcher`] for handlers
//! - a Unix domain socket server and client speaking NDJSON
//! - an in-process [`LocalTransport`]

mod dispatcher;
mod error;
mod server;
mod transport;

pub use dispatcher::{Dispatcher, HandlerFn};
pub use error::{IpcError, IpcResult};
pub use relay_protocol_types::{Action, Message, Reply};
pub use server::{IpcClient, IpcServer};
pub use transport::{LocalTransport, Transport};
