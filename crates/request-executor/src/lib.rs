//! HTTP execution for relayed requests.
//!
//! The background process owns the only HTTP client. Every `tb-request`
//! descriptor is turned into one upstream request and packed back into a
//! [`Reply`](relay_protocol_types::Reply).

mod encode;
mod error;
mod executor;
mod token;

pub use error::{ExecutorError, ExecutorResult};
pub use executor::{ExecutorSettings, RequestExecutor};
pub use token::{load_oauth_token, OAUTH_TOKEN_ENV};
