//! Credential lookup for conduit endpoints.
//!
//! Credentials live in an `.arcrc`-layout JSON file: a `hosts` object keyed
//! by API URL, each entry carrying the user and their conduit certificate
//! (the shared signing secret).
//!
//! ```json
//! {
//!   "hosts": {
//!     "https://conduit.example.com/api/": {
//!       "user": "alice",
//!       "cert": "nope-not-a-real-cert"
//!     }
//!   }
//! }
//! ```

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConduitError, Result};

/// Credentials for one conduit host.
#[derive(Clone, Deserialize)]
pub struct HostCredentials {
    /// Authenticated user name.
    pub user: String,
    /// Conduit certificate: the shared secret every call is signed with.
    pub cert: String,
}

// The certificate never appears in logs or error output.
impl fmt::Debug for HostCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCredentials")
            .field("user", &self.user)
            .field("cert", &"<redacted>")
            .finish()
    }
}

/// Host-keyed credential collection, usually loaded from `~/.arcrc`.
///
/// Hosts are kept in key order so that the fallback behavior of
/// [`for_url`](Self::for_url) is deterministic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialStore {
    /// Credentials keyed by conduit API URL.
    #[serde(default)]
    pub hosts: BTreeMap<String, HostCredentials>,
}

impl CredentialStore {
    /// Loads credentials from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Config`] if the file cannot be read or does
    /// not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ConduitError::Config(format!("cannot read credentials file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ConduitError::Config(format!("malformed credentials file {}: {e}", path.display()))
        })
    }

    /// Conventional credential file location: `$HOME/.arcrc`.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Config`] if `HOME` is not set.
    pub fn default_path() -> Result<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".arcrc"))
            .ok_or_else(|| {
                ConduitError::Config("HOME is not set; cannot locate .arcrc".to_owned())
            })
    }

    /// Looks up credentials for an endpoint URL.
    ///
    /// An exact match on the URL wins. On a miss the first configured host
    /// (in key order) is used instead — a deliberate convenience for the
    /// common single-host file, kept from the original tooling and called
    /// out here rather than applied silently.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Config`] naming the URL when no hosts are
    /// configured at all.
    pub fn for_url(&self, url: &str) -> Result<&HostCredentials> {
        if let Some(creds) = self.hosts.get(url) {
            return Ok(creds);
        }
        if let Some((host, creds)) = self.hosts.iter().next() {
            debug!(url, fallback = %host, "no exact credential match, using first configured host");
            return Ok(creds);
        }
        Err(ConduitError::Config(format!(
            "no conduit credentials configured for {url}; run `arc install-certificate` to fix"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, &str, &str)]) -> CredentialStore {
        CredentialStore {
            hosts: pairs
                .iter()
                .map(|(url, user, cert)| {
                    (
                        (*url).to_owned(),
                        HostCredentials { user: (*user).to_owned(), cert: (*cert).to_owned() },
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn test_exact_match_wins() {
        let store = store(&[
            ("https://a.example.com/api/", "alice", "cert-a"),
            ("https://b.example.com/api/", "bob", "cert-b"),
        ]);
        let creds = store.for_url("https://b.example.com/api/").unwrap();
        assert_eq!(creds.user, "bob");
    }

    #[test]
    fn test_fallback_to_first_host_in_key_order() {
        let store = store(&[
            ("https://b.example.com/api/", "bob", "cert-b"),
            ("https://a.example.com/api/", "alice", "cert-a"),
        ]);
        // BTreeMap orders by key, so "a.example.com" is the first host.
        let creds = store.for_url("https://missing.example.com/api/").unwrap();
        assert_eq!(creds.user, "alice");
    }

    #[test]
    fn test_empty_store_is_a_config_error_naming_the_url() {
        let store = CredentialStore::default();
        let err = store.for_url("https://missing.example.com/api/").unwrap_err();
        assert!(matches!(err, ConduitError::Config(_)));
        assert!(err.to_string().contains("https://missing.example.com/api/"));
        assert!(err.to_string().contains("arc install-certificate"));
    }

    #[test]
    fn test_load_parses_arcrc_layout() {
        let path = std::env::temp_dir().join(format!("arcrc-test-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{"hosts": {"https://conduit.example.com/api/": {"user": "alice", "cert": "c"}}}"#,
        )
        .unwrap();

        let store = CredentialStore::load(&path).unwrap();
        assert_eq!(store.hosts.len(), 1);
        assert_eq!(store.for_url("https://conduit.example.com/api/").unwrap().user, "alice");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = CredentialStore::load("/nonexistent/arcrc").unwrap_err();
        assert!(matches!(err, ConduitError::Config(_)));
    }

    #[test]
    fn test_load_malformed_file_is_config_error() {
        let path = std::env::temp_dir().join(format!("arcrc-bad-{}.json", std::process::id()));
        fs::write(&path, "hosts: not json").unwrap();

        let err = CredentialStore::load(&path).unwrap_err();
        assert!(matches!(err, ConduitError::Config(_)));
        assert!(err.to_string().contains("malformed"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_debug_redacts_certificate() {
        let creds = HostCredentials { user: "alice".to_owned(), cert: "super-secret".to_owned() };
        let debug = format!("{creds:?}");
        assert!(debug.contains("alice"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("super-secret"));
    }
}
