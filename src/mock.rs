//! Scripted replay of conduit calls.
//!
//! For deterministic tests the whole client can be replaced by a
//! [`MockClient`] that consumes a pre-recorded script instead of talking to
//! the network. A script is a JSON array of exchanges, consumed strictly
//! front to back:
//!
//! ```json
//! [
//!   {"cmd": ["conduit.ping", {}], "result": "pong"},
//!   {"cmd": ["differential.query", {"ids": [1]}],
//!    "error_code": "E_NOPE", "error_info": "not yours"}
//! ]
//! ```
//!
//! Each incoming call must match the next scripted `cmd`; comparison is
//! structural (by value, with stable field ordering), since expectations
//! are written independently of the caller's objects. Calling past the end
//! of the script, or out of order, is an error that names the offending
//! call.

use std::{collections::VecDeque, path::Path, time::Duration};

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::{
    client::{Conduit, EndpointConfig, sealed},
    error::{ConduitError, Result},
};

/// One scripted exchange: the expected call and its canned outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct MockExchange {
    /// Expected call, as a `[method, args]` pair.
    pub cmd: Value,
    /// Canned result, returned when the call matches.
    #[serde(default)]
    pub result: Option<Value>,
    /// Scripted error code, reported together with `error_info`.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Scripted error message; its presence makes the exchange a failure.
    #[serde(default)]
    pub error_info: Option<String>,
}

/// Replays a script of expected calls and canned responses.
///
/// Selected through [`Client::from_settings`](crate::Client::from_settings)
/// when a mock script is configured.
#[derive(Debug)]
pub struct MockClient {
    script: Mutex<VecDeque<MockExchange>>,
}

impl MockClient {
    /// Loads a script from a JSON file. The script is read once; there is
    /// no reloading.
    ///
    /// # Errors
    ///
    /// Returns [`ConduitError::Config`] if the file cannot be read or does
    /// not parse as an array of exchanges.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConduitError::Config(format!("cannot read mock script {}: {e}", path.display()))
        })?;
        let script: Vec<MockExchange> = serde_json::from_str(&text).map_err(|e| {
            ConduitError::Config(format!("malformed mock script {}: {e}", path.display()))
        })?;
        Ok(Self::from_exchanges(script))
    }

    /// Builds a mock directly from exchanges, bypassing the filesystem.
    ///
    /// # Examples
    ///
    /// ```
    /// use conduit_client::{MockClient, MockExchange};
    /// use serde_json::json;
    ///
    /// let mock = MockClient::from_exchanges([MockExchange {
    ///     cmd: json!(["conduit.ping", {}]),
    ///     result: Some(json!("pong")),
    ///     error_code: None,
    ///     error_info: None,
    /// }]);
    /// ```
    pub fn from_exchanges(script: impl IntoIterator<Item = MockExchange>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()) }
    }

    #[instrument(skip(self, args))]
    async fn replay(&self, method: &str, args: &Map<String, Value>) -> Result<Value> {
        let got = canonical(&Value::Array(vec![
            Value::String(method.to_owned()),
            Value::Object(args.clone()),
        ]));

        let Some(exchange) = self.script.lock().await.pop_front() else {
            return Err(ConduitError::Conduit {
                code: None,
                message: format!("no more mocked responses for call to {got}"),
            });
        };

        let expect = canonical(&exchange.cmd);
        if got != expect {
            return Err(ConduitError::Conduit {
                code: None,
                message: format!("mock mismatch: got {got} expected {expect}"),
            });
        }

        if let Some(message) = exchange.error_info {
            return Err(ConduitError::Conduit { code: exchange.error_code, message });
        }

        debug!(method, "replayed mocked response");
        Ok(exchange.result.unwrap_or(Value::Null))
    }
}

/// Canonical text form of a JSON value, used for structural comparison.
///
/// serde_json's default map keeps keys in sorted order (the `preserve_order`
/// feature must stay off), so rendering a `Value` yields a stable canonical
/// form at every nesting level.
fn canonical(value: &Value) -> String {
    value.to_string()
}

impl sealed::private::Sealed for MockClient {}

impl Conduit for MockClient {
    /// No-op: the mock has no endpoint identity.
    fn apply_config(&mut self, _config: EndpointConfig) {}

    fn call<'a>(
        &'a self,
        method: &'a str,
        args: &'a Map<String, Value>,
        _timeout: Duration,
    ) -> impl Future<Output = Result<Value>> + Send + 'a {
        self.replay(method, args)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args_of(value: Value) -> Map<String, Value> {
        value.as_object().expect("test args must be an object").clone()
    }

    fn exchange(cmd: Value, result: Value) -> MockExchange {
        MockExchange { cmd, result: Some(result), error_code: None, error_info: None }
    }

    const TIMEOUT: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_replays_matching_calls_in_order() {
        let mock = MockClient::from_exchanges([
            exchange(json!(["conduit.ping", {}]), json!("pong")),
            exchange(json!(["differential.query", {"ids": [1]}]), json!([{"id": 1}])),
        ]);

        let ping = mock.call("conduit.ping", &Map::new(), TIMEOUT).await.unwrap();
        assert_eq!(ping, json!("pong"));

        let query = mock
            .call("differential.query", &args_of(json!({"ids": [1]})), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(query, json!([{"id": 1}]));
    }

    #[tokio::test]
    async fn test_ping_scenario_then_exhaustion() {
        let mock =
            MockClient::from_exchanges([exchange(json!(["ping", {"x": 1}]), json!({"ok": true}))]);

        let first = mock.call("ping", &args_of(json!({"x": 1})), TIMEOUT).await.unwrap();
        assert_eq!(first, json!({"ok": true}));

        let err = mock.call("ping", &args_of(json!({"x": 2})), TIMEOUT).await.unwrap_err();
        match err {
            ConduitError::Conduit { code: None, message } => {
                assert!(message.contains("no more mocked responses"));
                assert!(message.contains(r#"["ping",{"x":2}]"#));
            }
            other => panic!("expected exhaustion error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_order_call_is_a_mismatch() {
        let mock = MockClient::from_exchanges([
            exchange(json!(["first.method", {}]), json!(1)),
            exchange(json!(["second.method", {}]), json!(2)),
        ]);

        let err = mock.call("second.method", &Map::new(), TIMEOUT).await.unwrap_err();
        match err {
            ConduitError::Conduit { code: None, message } => {
                assert!(message.contains("mock mismatch"));
                assert!(message.contains("second.method"));
                assert!(message.contains("first.method"));
            }
            other => panic!("expected mismatch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_comparison_is_by_value_not_key_order() {
        // Script text lists keys in one order, the caller builds them in
        // another; structural comparison must not care.
        let mock = MockClient::from_exchanges([exchange(
            json!(["diffusion.query", {"b": 2, "a": 1}]),
            json!("match"),
        )]);

        let result = mock
            .call("diffusion.query", &args_of(json!({"a": 1, "b": 2})), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(result, json!("match"));
    }

    #[tokio::test]
    async fn test_scripted_error_carries_code_and_message() {
        let mock = MockClient::from_exchanges([MockExchange {
            cmd: json!(["differential.query", {}]),
            result: None,
            error_code: Some("E_NOPE".to_owned()),
            error_info: Some("not yours".to_owned()),
        }]);

        let err = mock.call("differential.query", &Map::new(), TIMEOUT).await.unwrap_err();
        match err {
            ConduitError::Conduit { code, message } => {
                assert_eq!(code.as_deref(), Some("E_NOPE"));
                assert_eq!(message, "not yours");
            }
            other => panic!("expected scripted error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_with_no_result_replays_null() {
        let mock = MockClient::from_exchanges([MockExchange {
            cmd: json!(["conduit.ping", {}]),
            result: None,
            error_code: None,
            error_info: None,
        }]);

        let result = mock.call("conduit.ping", &Map::new(), TIMEOUT).await.unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_canonical_sorts_keys_at_every_level() {
        let value = json!({"outer_b": {"z": 1, "a": 2}, "outer_a": [3]});
        assert_eq!(canonical(&value), r#"{"outer_a":[3],"outer_b":{"a":2,"z":1}}"#);
    }

    #[test]
    fn test_load_missing_script_is_config_error() {
        let err = MockClient::load("/nonexistent/script.json").unwrap_err();
        assert!(matches!(err, ConduitError::Config(_)));
    }

    #[test]
    fn test_load_malformed_script_is_config_error() {
        let path = std::env::temp_dir().join(format!("conduit-mock-bad-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"cmd": "not an array"}"#).unwrap();

        let err = MockClient::load(&path).unwrap_err();
        assert!(matches!(err, ConduitError::Config(_)));
        assert!(err.to_string().contains("malformed"));

        let _ = std::fs::remove_file(&path);
    }
}
