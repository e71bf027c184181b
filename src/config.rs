//! Client settings.
//!
//! [`Settings`] collects everything needed to build a conduit client: the
//! endpoint URL, the per-call timeout, the cache idle budget, and the
//! optional credential-file and mock-script locations. Defaults match the
//! well-known public endpoint and the conventional timeouts; every field can
//! be overridden programmatically, from a deserialized config file, or from
//! the environment via [`Settings::from_env`].

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::error::{ConduitError, Result};

/// Well-known conduit API base URL, used when no endpoint is configured.
pub const DEFAULT_API_URL: &str = "https://secure.phabricator.com/api/";

/// Default per-call timeout in seconds.
///
/// Applies to the whole request-response round trip. Conduit methods that
/// walk large revision graphs can be slow, so this is deliberately generous.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default client-cache idle budget in seconds.
///
/// A cached client older than this is discarded and rebuilt, in case the
/// remote side silently closed a long-unused connection.
pub const DEFAULT_MAX_IDLE_SECS: u64 = 10;

/// Configuration for a conduit client.
///
/// # Examples
///
/// ```
/// use conduit_client::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.api_url, "https://secure.phabricator.com/api/");
/// assert_eq!(settings.timeout_secs, 60);
/// assert_eq!(settings.max_idle_secs, 10);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Conduit API base URL. Method names are joined onto it, so it names
    /// the `/api/` root, not an individual method.
    pub api_url: String,

    /// Per-call timeout in seconds.
    pub timeout_secs: u64,

    /// Idle budget for the client cache in seconds.
    pub max_idle_secs: u64,

    /// Credential file location. `None` means `$HOME/.arcrc`.
    pub credentials_path: Option<PathBuf>,

    /// Mock replay script location. When set, the whole client is replaced
    /// by a [`MockClient`](crate::MockClient) replaying this script and no
    /// network traffic happens at all.
    pub mock_script: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_idle_secs: DEFAULT_MAX_IDLE_SECS,
            credentials_path: None,
            mock_script: None,
        }
    }
}

impl Settings {
    /// Builds settings from the process environment.
    ///
    /// Recognized variables, each overriding the corresponding default:
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `CONDUIT_URL` | `api_url` |
    /// | `CONDUIT_TIMEOUT_SECS` | `timeout_secs` |
    /// | `CONDUIT_MAX_IDLE_SECS` | `max_idle_secs` |
    /// | `CONDUIT_CREDENTIALS` | `credentials_path` |
    /// | `CONDUIT_MOCK` | `mock_script` |
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Config`] if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Env-independent core of [`from_env`](Self::from_env); tests drive it
    /// with a map lookup instead of mutating the process environment.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(url) = lookup("CONDUIT_URL") {
            settings.api_url = url;
        }
        if let Some(raw) = lookup("CONDUIT_TIMEOUT_SECS") {
            settings.timeout_secs = parse_secs("CONDUIT_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("CONDUIT_MAX_IDLE_SECS") {
            settings.max_idle_secs = parse_secs("CONDUIT_MAX_IDLE_SECS", &raw)?;
        }
        if let Some(path) = lookup("CONDUIT_CREDENTIALS") {
            settings.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("CONDUIT_MOCK") {
            settings.mock_script = Some(PathBuf::from(path));
        }
        Ok(settings)
    }

    /// Per-call timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Cache idle budget as a [`Duration`].
    #[must_use]
    pub const fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }

    /// Parses and normalizes the API URL.
    ///
    /// The path is normalized to end with `/` so that method names join
    /// cleanly (`…/api/` + `differential.query` = `…/api/differential.query`).
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Config`] if the URL does not parse or uses a
    /// scheme other than `http`/`https`.
    pub fn parsed_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.api_url).map_err(|e| {
            ConduitError::Config(format!("invalid conduit URL '{}': {e}", self.api_url))
        })?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConduitError::Config(format!(
                    "conduit URL must be http or https, got '{other}'"
                )));
            }
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| ConduitError::Config(format!("{name} is not a number of seconds: '{raw}'")))
}
