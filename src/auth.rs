//! Call signing.
//!
//! Every conduit call carries an authentication envelope injected into the
//! request parameters under [`CONDUIT_KEY`]. The envelope binds the current
//! epoch second (the token) to the caller's certificate via a SHA-1 digest;
//! the server recomputes the digest from its copy of the certificate to
//! authenticate the call.
//!
//! The digest algorithm and field names are a fixed wire format — the far
//! end verifies this exact shape, so neither can change unilaterally.

use std::time::SystemTime;

use serde_json::{Value, json};
use sha1::{Digest, Sha1};

use crate::error::{ConduitError, Result};

/// Reserved parameter key the authentication envelope is injected under.
pub const CONDUIT_KEY: &str = "__conduit__";

/// Signs a token with a conduit certificate.
///
/// The signature is the lowercase hex SHA-1 digest of the UTF-8 bytes of
/// `token` followed by `cert`. Deterministic: the same inputs always produce
/// the same signature.
///
/// # Examples
///
/// ```
/// use conduit_client::auth::sign_token;
///
/// let signature = sign_token("secret", "1234567890");
/// assert_eq!(signature, "aadd7b779812392e372fa4c9893e2823343825a7");
/// ```
#[must_use]
pub fn sign_token(cert: &str, token: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(token.as_bytes());
    hasher.update(cert.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current wall-clock time as whole seconds since the Unix epoch.
///
/// # Errors
///
/// Returns [`ConduitError::Config`] if the system clock reads before the
/// epoch.
pub fn epoch_seconds() -> Result<u64> {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|e| ConduitError::Config(format!("system clock reads before the Unix epoch: {e}")))
}

/// Authentication envelope sent with every call.
///
/// Built fresh per call from the endpoint identity and the current epoch
/// second; never persisted or reused.
#[derive(Debug, Clone)]
pub struct AuthEnvelope {
    /// Authenticated user.
    pub auth_user: String,
    /// Identity the call acts as (usually the authenticated user).
    pub act_as_user: String,
    /// Epoch-second timestamp, as a decimal string.
    pub auth_token: String,
    /// [`sign_token`] digest of the token and certificate.
    pub auth_signature: String,
}

impl AuthEnvelope {
    /// Builds an envelope for a call issued at `token` (epoch seconds, as a
    /// decimal string), signing it with `cert`.
    #[must_use]
    pub fn new(user: &str, act_as: &str, cert: &str, token: &str) -> Self {
        Self {
            auth_user: user.to_owned(),
            act_as_user: act_as.to_owned(),
            auth_token: token.to_owned(),
            auth_signature: sign_token(cert, token),
        }
    }

    /// Renders the envelope with its wire field names.
    ///
    /// This is the single serialization point for the envelope; the field
    /// names are part of the fixed wire format.
    #[must_use]
    pub fn into_value(self) -> Value {
        json!({
            "authUser": self.auth_user,
            "actAsUser": self.act_as_user,
            "authToken": self.auth_token,
            "authSignature": self.auth_signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_known_signature_vectors() {
        // Vectors computed independently with another SHA-1 implementation.
        assert_eq!(sign_token("secret", "1234567890"), "aadd7b779812392e372fa4c9893e2823343825a7");
        assert_eq!(
            sign_token("conduit-cert", "1700000000"),
            "e42f29d123acde26846d2542933be8cb654dda09"
        );
        assert_eq!(sign_token("", "0"), "b6589fc6ab0dc82cf12099d1c2d40ab994e8410c");
    }

    #[test]
    fn test_changing_either_input_changes_the_signature() {
        let base = sign_token("conduit-cert", "1700000000");
        assert_ne!(base, sign_token("conduit-cert2", "1700000000"));
        assert_ne!(base, sign_token("conduit-cert", "1700000001"));
    }

    #[test]
    fn test_envelope_wire_field_names() {
        let envelope = AuthEnvelope::new("alice", "bot", "cert", "1700000000");
        let value = envelope.into_value();

        assert_eq!(value["authUser"], "alice");
        assert_eq!(value["actAsUser"], "bot");
        assert_eq!(value["authToken"], "1700000000");
        assert_eq!(value["authSignature"], sign_token("cert", "1700000000"));
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_act_as_may_differ_from_user() {
        let envelope = AuthEnvelope::new("alice", "deploy-bot", "cert", "1");
        assert_eq!(envelope.auth_user, "alice");
        assert_eq!(envelope.act_as_user, "deploy-bot");
    }

    proptest! {
        #[test]
        fn prop_signature_is_deterministic(cert in ".{0,64}", token in "[0-9]{1,12}") {
            prop_assert_eq!(sign_token(&cert, &token), sign_token(&cert, &token));
        }

        #[test]
        fn prop_signature_is_lowercase_hex(cert in ".{0,64}", token in "[0-9]{1,12}") {
            let signature = sign_token(&cert, &token);
            prop_assert_eq!(signature.len(), 40);
            prop_assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }

        #[test]
        fn prop_distinct_tokens_sign_differently(
            cert in ".{0,64}",
            a in "[0-9]{1,12}",
            b in "[0-9]{1,12}",
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(sign_token(&cert, &a), sign_token(&cert, &b));
        }
    }
}
