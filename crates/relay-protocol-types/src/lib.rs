//! Wire types shared by the relay client and the background process.
//!
//! Every message is a single JSON object tagged by `action`; every reply is a
//! single [`Reply`] envelope. Nothing in this crate performs I/O.

mod protocol;
mod request;

pub use protocol::{Action, CacheCommand, CacheOp, Message, Reply, ResponseInit, SerializedResponse};
pub use request::{HttpMethod, ParseMethodError, QueryValue, RequestBody, RequestDescriptor};
