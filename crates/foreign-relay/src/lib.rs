//! Client side of the relay.
//!
//! Code that cannot reach the network itself hands a [`RequestDescriptor`] to
//! [`Relay`], which forwards it to the background process and rebuilds the
//! HTTP response from the reply. [`UserIdentity`] builds on top of it to keep
//! a single, shared answer to "who is signed in".
//!
//! [`RequestDescriptor`]: relay_protocol_types::RequestDescriptor

mod api;
mod cache;
mod error;
mod identity;
mod purify;
mod relay;
mod response;

pub use api::Query;
pub use cache::{DurableCache, LocalCache, RelayCache};
pub use error::{CacheError, IdentityError, RelayError, RelayResult};
pub use identity::{UserData, UserDetails, UserIdentity, MAX_ATTEMPTS};
pub use purify::{HtmlPurifier, Sanitizer};
pub use relay::Relay;
pub use response::RelayResponse;
