//! Connection string resolution.

use std::time::Duration;

/// Default MongoDB connection string.
pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";

/// The environment variable used to override the connection string.
pub const MONGO_URI_ENV: &str = "MONGODB_URI";

/// How long to wait for a reachable server before giving up.
pub const DEFAULT_SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Application name reported to the server.
pub const APP_NAME: &str = "dbseed";

/// Pick the connection string: an explicit value wins, then the `MONGODB_URI`
/// environment variable, then [`DEFAULT_MONGO_URI`].
#[must_use]
pub fn resolve_uri(explicit: Option<&str>) -> String {
    resolve_uri_with(explicit, |var| std::env::var(var).ok())
}

/// [`resolve_uri`] with the environment read through `lookup`.
#[must_use]
pub fn resolve_uri_with(explicit: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| lookup(MONGO_URI_ENV).filter(|uri| !uri.is_empty()))
        .unwrap_or_else(|| DEFAULT_MONGO_URI.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_uri_wins() {
        let uri = resolve_uri_with(Some("mongodb://db:27017"), |_| {
            Some("mongodb://env:27017".to_string())
        });
        assert_eq!(uri, "mongodb://db:27017");
    }

    #[test]
    fn test_env_uri_is_used() {
        let uri = resolve_uri_with(None, |var| {
            (var == MONGO_URI_ENV).then(|| "mongodb://env:27017".to_string())
        });
        assert_eq!(uri, "mongodb://env:27017");
    }

    #[test]
    fn test_default_uri() {
        assert_eq!(resolve_uri_with(None, |_| None), DEFAULT_MONGO_URI);
        assert_eq!(
            resolve_uri_with(None, |_| Some(String::new())),
            DEFAULT_MONGO_URI
        );
    }
}
