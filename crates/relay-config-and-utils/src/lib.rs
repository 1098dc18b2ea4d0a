//! Configuration, paths, errors and logging setup shared by the tbrelay crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_API_BASE_URL, DEFAULT_CACHE_TTL_SECS, DEFAULT_OAUTH_BASE_URL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_client_logging, init_logging};
pub use paths::Paths;
