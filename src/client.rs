//! The conduit client.
//!
//! [`Conduit`] is the call capability: `apply_config` plus `call`. It has
//! exactly two implementations — [`ConduitClient`], which performs signed
//! HTTP POSTs, and [`MockClient`](crate::MockClient), which replays a
//! scripted exchange — and [`Client`] selects between them from
//! [`Settings`], never by swapping symbols at runtime.
//!
//! # Wire protocol
//!
//! A call is an HTTP POST to `<api_url><method>` with a form body
//! `params=<url-encoded JSON>&output=json`, where the JSON payload is the
//! caller's arguments plus the authentication envelope under
//! [`auth::CONDUIT_KEY`]. The endpoint answers with a JSON object carrying
//! `error_code` (null on success), `error_info`, and `result`. HTTP status
//! is not consulted: conduit reports failures in the body.

use std::{fmt, sync::LazyLock, time::Duration};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::{
    auth::{self, AuthEnvelope},
    config::Settings,
    credentials::CredentialStore,
    error::{ConduitError, Result},
    mock::MockClient,
};

pub(crate) mod sealed {
    //! Sealed trait marker for `Conduit` implementations.

    pub(crate) mod private {
        /// Sealed trait marker.
        ///
        /// Keeps `Conduit` implementations inside this crate; the mock is
        /// selected by configuration, not by substituting a foreign type.
        pub trait Sealed {}
    }
}

/// Shared HTTP client with connection pooling.
///
/// One pool serves every `ConduitClient` in the process; reqwest re-opens
/// sockets the remote side has dropped, so discarded clients need no
/// explicit teardown.
static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to create HTTP client")
});

/// Identity and endpoint for one conduit host.
///
/// Immutable once constructed; the client cache rebuilds one from settings
/// and credentials whenever it has to construct a fresh client.
#[derive(Clone)]
pub struct EndpointConfig {
    /// Conduit API root. Method names are joined onto it.
    pub url: Url,
    /// Authenticated user.
    pub user: String,
    /// Identity calls act as; defaults to `user`.
    pub act_as: String,
    /// Conduit certificate used to sign every call.
    pub cert: String,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("url", &self.url.as_str())
            .field("user", &self.user)
            .field("act_as", &self.act_as)
            .field("cert", &"<redacted>")
            .finish()
    }
}

impl EndpointConfig {
    /// Resolves an endpoint config from settings and a credential store.
    ///
    /// The acting identity defaults to the authenticated user; see
    /// [`with_act_as`](Self::with_act_as) to act as someone else.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Config`] for an invalid URL or when the store
    /// holds no usable credentials.
    pub fn resolve(settings: &Settings, store: &CredentialStore) -> Result<Self> {
        let url = settings.parsed_url()?;
        let creds = store.for_url(url.as_str())?;
        Ok(Self {
            url,
            user: creds.user.clone(),
            act_as: creds.user.clone(),
            cert: creds.cert.clone(),
        })
    }

    /// Replaces the acting identity.
    #[must_use]
    pub fn with_act_as(mut self, act_as: impl Into<String>) -> Self {
        self.act_as = act_as.into();
        self
    }
}

/// The call capability: what both the HTTP client and the mock provide.
///
/// Sealed; the two implementations in this crate are selected through
/// [`Client::from_settings`].
pub trait Conduit: sealed::private::Sealed + Send + Sync {
    /// Replaces the endpoint identity (URL, user, acting identity,
    /// certificate). Any connection-equivalent state tied to the previous
    /// endpoint is invalidated.
    fn apply_config(&mut self, config: EndpointConfig);

    /// Calls `method` with `args`, bounded by `timeout`.
    ///
    /// The caller's `args` map is never mutated; the authentication
    /// envelope is injected into a copy. No retries happen here — retry
    /// policy belongs to the caller.
    ///
    /// # Errors
    ///
    /// Any [`ConduitError`]; see the error taxonomy in
    /// [`crate::error`].
    fn call<'a>(
        &'a self,
        method: &'a str,
        args: &'a Map<String, Value>,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value>> + Send + 'a;
}

/// Signed HTTP conduit client.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use conduit_client::{Conduit, ConduitClient, CredentialStore, EndpointConfig, Settings};
/// use serde_json::Map;
///
/// # async fn example() -> conduit_client::Result<()> {
/// let settings = Settings::default();
/// let store = CredentialStore::load(CredentialStore::default_path()?)?;
/// let client = ConduitClient::new(EndpointConfig::resolve(&settings, &store)?);
///
/// let result = client.call("conduit.ping", &Map::new(), Duration::from_secs(60)).await?;
/// println!("{result}");
/// # Ok(())
/// # }
/// ```
pub struct ConduitClient {
    url: Url,
    user: String,
    act_as: String,
    cert: String,
    http: reqwest::Client,
}

impl fmt::Debug for ConduitClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConduitClient")
            .field("url", &self.url.as_str())
            .field("user", &self.user)
            .field("act_as", &self.act_as)
            .field("cert", &"<redacted>")
            .finish()
    }
}

impl ConduitClient {
    /// Creates a client for the given endpoint.
    #[must_use]
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            url: config.url,
            user: config.user,
            act_as: config.act_as,
            cert: config.cert,
            http: HTTP_CLIENT.clone(),
        }
    }

    /// Copies `args` and injects the authentication envelope for `token`
    /// under the reserved key. The caller's map is left untouched.
    fn signed_params(&self, args: &Map<String, Value>, token: &str) -> Map<String, Value> {
        let envelope = AuthEnvelope::new(&self.user, &self.act_as, &self.cert, token);
        let mut params = args.clone();
        params.insert(auth::CONDUIT_KEY.to_owned(), envelope.into_value());
        params
    }

    #[instrument(skip(self, args), fields(url = %self.url))]
    async fn perform(
        &self,
        method: &str,
        args: &Map<String, Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let token = auth::epoch_seconds()?.to_string();
        let params = self.signed_params(args, &token);
        let endpoint = self.url.join(method).map_err(|e| {
            ConduitError::Config(format!("invalid conduit method name '{method}': {e}"))
        })?;

        // Value -> String via Display is infallible; the params are plain
        // JSON values by construction.
        let params_json = Value::Object(params).to_string();

        debug!(method, "issuing conduit call");
        let response = self
            .http
            .post(endpoint)
            .header(reqwest::header::CONNECTION, "Keep-Alive")
            .form(&[("params", params_json.as_str()), ("output", "json")])
            .timeout(timeout)
            .send()
            .await?;
        let body = response.bytes().await?;
        decode_response(&body)
    }
}

impl sealed::private::Sealed for ConduitClient {}

impl Conduit for ConduitClient {
    fn apply_config(&mut self, config: EndpointConfig) {
        self.url = config.url;
        self.user = config.user;
        self.act_as = config.act_as;
        self.cert = config.cert;
    }

    fn call<'a>(
        &'a self,
        method: &'a str,
        args: &'a Map<String, Value>,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value>> + Send + 'a {
        self.perform(method, args, timeout)
    }
}

/// A conduit response on the wire.
///
/// `error_code` must be present (though null on success); a JSON body
/// without it is not a conduit response.
#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(deserialize_with = "Option::deserialize")]
    error_code: Option<String>,
    error_info: Option<String>,
    result: Option<Value>,
}

/// Decodes a response body into a call result.
fn decode_response(body: &[u8]) -> Result<Value> {
    let response: WireResponse =
        serde_json::from_slice(body).map_err(|_| ConduitError::InvalidResponse)?;
    if let Some(code) = response.error_code {
        return Err(ConduitError::Conduit {
            code: Some(code),
            message: response.error_info.unwrap_or_default(),
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// A usable conduit client: HTTP against a real endpoint, or mock replay.
///
/// Which one you get is decided by configuration: a
/// [`mock_script`](Settings::mock_script) in the settings selects the mock.
#[derive(Debug)]
pub enum Client {
    /// Signed HTTP calls against a real endpoint.
    Http(ConduitClient),
    /// Scripted replay, for deterministic tests.
    Mock(MockClient),
}

impl Client {
    /// Builds a client from settings.
    ///
    /// When `settings.mock_script` is set the script is loaded and a
    /// [`MockClient`] is returned; no credentials are read and no network
    /// traffic will happen. Otherwise credentials are loaded (from
    /// `settings.credentials_path`, or `$HOME/.arcrc`) and a
    /// [`ConduitClient`] is built for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Config`] for an unloadable script, missing
    /// credentials, or an invalid endpoint URL.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if let Some(script) = &settings.mock_script {
            debug!(script = %script.display(), "mock script configured, replaying canned responses");
            return Ok(Self::Mock(MockClient::load(script)?));
        }
        let store = match &settings.credentials_path {
            Some(path) => CredentialStore::load(path)?,
            None => CredentialStore::load(CredentialStore::default_path()?)?,
        };
        let config = EndpointConfig::resolve(settings, &store)?;
        Ok(Self::Http(ConduitClient::new(config)))
    }
}

impl sealed::private::Sealed for Client {}

impl Conduit for Client {
    fn apply_config(&mut self, config: EndpointConfig) {
        match self {
            Self::Http(client) => client.apply_config(config),
            Self::Mock(client) => client.apply_config(config),
        }
    }

    fn call<'a>(
        &'a self,
        method: &'a str,
        args: &'a Map<String, Value>,
        timeout: Duration,
    ) -> impl Future<Output = Result<Value>> + Send + 'a {
        async move {
            match self {
                Self::Http(client) => client.call(method, args, timeout).await,
                Self::Mock(client) => client.call(method, args, timeout).await,
            }
        }
    }
}
