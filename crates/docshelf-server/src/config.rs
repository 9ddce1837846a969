//! Server configuration for docshelf.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `DOCSHELF_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use docshelf_core::credentials::DEFAULT_CREDENTIALS_KEY;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 4567;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Directory holding the credential file.
    pub data_dir: PathBuf,
    /// Directory holding the documents.
    pub documents_dir: PathBuf,
    /// Name of the credential file inside `data_dir`.
    pub credentials_file: String,
    /// bcrypt work factor for new hashes. `None` uses the bcrypt default.
    pub bcrypt_cost: Option<u32>,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Whether session cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// How long a signed-in session survives without a request.
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on, listening on `0.0.0.0`
    /// - `DOCSHELF_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:4567`)
    /// - `DOCSHELF_DATA_DIR`: credential directory (default: `./data`)
    /// - `DOCSHELF_DOCUMENTS_DIR`: document directory (default: `./user_files`)
    /// - `DOCSHELF_CREDENTIALS_FILE`: credential file name (default: `credentials.json`)
    /// - `DOCSHELF_BCRYPT_COST`: bcrypt work factor (default: bcrypt's own)
    /// - `DOCSHELF_LOG_LEVEL`: log filter (default: `info`)
    /// - `DOCSHELF_SECURE_COOKIES`: mark cookies `Secure` (default: `false`)
    /// - `DOCSHELF_REQUEST_TIMEOUT_SECS`: request timeout (default: `30`)
    /// - `DOCSHELF_SESSION_TTL_SECS`: idle session lifetime (default: `43200`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // DOCSHELF_BIND_ADDR > PORT > default
        let fallback = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT));
        let bind_addr = if let Some(addr) = lookup("DOCSHELF_BIND_ADDR") {
            addr.parse().unwrap_or(fallback)
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            fallback
        };

        let data_dir = lookup("DOCSHELF_DATA_DIR").map_or_else(|| PathBuf::from("./data"), PathBuf::from);
        let documents_dir = lookup("DOCSHELF_DOCUMENTS_DIR")
            .map_or_else(|| PathBuf::from("./user_files"), PathBuf::from);

        let credentials_file = lookup("DOCSHELF_CREDENTIALS_FILE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CREDENTIALS_KEY.to_owned());

        let bcrypt_cost = lookup("DOCSHELF_BCRYPT_COST").and_then(|v| v.parse().ok());

        let log_level = lookup("DOCSHELF_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let secure_cookies = lookup("DOCSHELF_SECURE_COOKIES")
            .is_some_and(|v| v == "true" || v == "1");

        let request_timeout = lookup("DOCSHELF_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map_or(Duration::from_secs(30), Duration::from_secs);

        let session_ttl = lookup("DOCSHELF_SESSION_TTL_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .map_or(Duration::from_secs(12 * 60 * 60), Duration::from_secs);

        Self {
            bind_addr,
            data_dir,
            documents_dir,
            credentials_file,
            bcrypt_cost,
            log_level,
            secure_cookies,
            request_timeout,
            session_ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 4567)));
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.documents_dir, PathBuf::from("./user_files"));
        assert_eq!(config.credentials_file, "credentials.json");
        assert_eq!(config.bcrypt_cost, None);
        assert_eq!(config.log_level, "info");
        assert!(!config.secure_cookies);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.session_ttl, Duration::from_secs(43_200));
    }

    #[test]
    fn port_binds_all_interfaces() {
        let config = config_from(&[("PORT", "8080")]);
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
    }

    #[test]
    fn bind_addr_overrides_port() {
        let config = config_from(&[("PORT", "8080"), ("DOCSHELF_BIND_ADDR", "127.0.0.1:9000")]);
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
    }

    #[test]
    fn unparsable_values_fall_back() {
        let config = config_from(&[
            ("DOCSHELF_BIND_ADDR", "not an address"),
            ("DOCSHELF_BCRYPT_COST", "high"),
            ("DOCSHELF_REQUEST_TIMEOUT_SECS", "-1"),
            ("DOCSHELF_CREDENTIALS_FILE", "  "),
            ("DOCSHELF_SESSION_TTL_SECS", "0"),
        ]);
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 4567)));
        assert_eq!(config.bcrypt_cost, None);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.credentials_file, "credentials.json");
        assert_eq!(config.session_ttl, Duration::from_secs(43_200));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("DOCSHELF_DATA_DIR", "/srv/docshelf"),
            ("DOCSHELF_DOCUMENTS_DIR", "/srv/docs"),
            ("DOCSHELF_CREDENTIALS_FILE", "users.json"),
            ("DOCSHELF_BCRYPT_COST", "10"),
            ("DOCSHELF_SECURE_COOKIES", "1"),
            ("DOCSHELF_REQUEST_TIMEOUT_SECS", "5"),
            ("DOCSHELF_SESSION_TTL_SECS", "900"),
        ]);
        assert_eq!(config.data_dir, PathBuf::from("/srv/docshelf"));
        assert_eq!(config.documents_dir, PathBuf::from("/srv/docs"));
        assert_eq!(config.credentials_file, "users.json");
        assert_eq!(config.bcrypt_cost, Some(10));
        assert!(config.secure_cookies);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.session_ttl, Duration::from_secs(900));
    }
}
