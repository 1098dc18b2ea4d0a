//! Storage key constants.

/// Namespaces and keys used by the relay.
pub struct CacheKeys;

impl CacheKeys {
    /// Namespace for shared utility values
    pub const UTILS_NAMESPACE: &'static str = "Utils";

    /// Signed-in user's details (JSON)
    pub const USER_DETAILS: &'static str = "userDetails";

    /// Namespace for OAuth credentials
    pub const OAUTH_NAMESPACE: &'static str = "oauth";

    /// OAuth bearer token
    pub const ACCESS_TOKEN: &'static str = "accessToken";
}
