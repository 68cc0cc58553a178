//! License-check token construction.
//!
//! Tokens are compact HS256 JWTs:
//!
//! ```text
//! base64url({"alg":"HS256","typ":"JWT"}) . base64url({"iss":..,"jti":..,"sub":..}) . base64url(hmac)
//! ```
//!
//! Header and claims are serialized canonically (sorted keys, no
//! whitespace) and every segment is base64url without padding. The `jti`
//! claim is a fresh UUID per token, so two tokens for the same resource share
//! their header but never their claims or signature.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{DrmError, Result};
use crate::secret::SecretResolver;

type HmacSha256 = Hmac<Sha256>;

/// A signed compact token and its segment boundaries.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken {
    token: String,
    header_len: usize,
    claims_len: usize,
}

impl SignedToken {
    fn from_segments(header: &str, claims: &str, signature: &str) -> Self {
        Self {
            token: format!("{}.{}.{}", header, claims, signature),
            header_len: header.len(),
            claims_len: claims.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn header(&self) -> &str {
        &self.token[..self.header_len]
    }

    pub fn claims(&self) -> &str {
        let start = self.header_len + 1;
        &self.token[start..start + self.claims_len]
    }

    pub fn signature(&self) -> &str {
        &self.token[self.header_len + self.claims_len + 2..]
    }

    pub fn into_string(self) -> String {
        self.token
    }
}

// Tokens are credentials; keep them out of debug output.
impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedToken")
            .field("header", &self.header())
            .field("claims", &self.claims())
            .field("signature", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

fn canonical_json(fields: &BTreeMap<&str, &str>) -> Result<String> {
    Ok(serde_json::to_string(fields)?)
}

pub struct LicenseTokenSigner {
    issuer: String,
    secrets: SecretResolver,
}

impl LicenseTokenSigner {
    pub fn new(issuer: impl Into<String>, secrets: SecretResolver) -> Self {
        Self {
            issuer: issuer.into(),
            secrets,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Sign a token for `resource_uri` with the secret of `profile_id`.
    #[instrument(skip(self), fields(issuer = %self.issuer))]
    pub async fn sign(&self, profile_id: &str, resource_uri: &str) -> Result<SignedToken> {
        let key = self.secrets.resolve(profile_id).await?;
        let token = self.sign_with_key(&key, resource_uri)?;
        debug!(claims = token.claims(), "Signed license check token");
        Ok(token)
    }

    /// Sign with an already resolved key.
    pub fn sign_with_key(&self, key: &[u8], resource_uri: &str) -> Result<SignedToken> {
        let header = canonical_json(&BTreeMap::from([("alg", "HS256"), ("typ", "JWT")]))?;

        let jti = Uuid::new_v4().to_string();
        let claims = canonical_json(&BTreeMap::from([
            ("iss", self.issuer.as_str()),
            ("jti", jti.as_str()),
            ("sub", resource_uri),
        ]))?;

        let header = URL_SAFE_NO_PAD.encode(header);
        let claims = URL_SAFE_NO_PAD.encode(claims);

        let mut mac = HmacSha256::new_from_slice(key)
            .map_err(|e| DrmError::Config(format!("Invalid HMAC key: {}", e)))?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(SignedToken::from_segments(&header, &claims, &signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::SecureStore;
    use core_runtime::config::{SecretPolicy, DEFAULT_TOKEN_ISSUER};
    use serde_json::Value;
    use std::sync::Arc;

    struct FixedSecret(Option<&'static [u8]>);

    #[async_trait]
    impl SecureStore for FixedSecret {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.0.map(<[u8]>::to_vec))
        }

        async fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn signer(secret: Option<&'static [u8]>, policy: SecretPolicy) -> LicenseTokenSigner {
        LicenseTokenSigner::new(
            DEFAULT_TOKEN_ISSUER,
            SecretResolver::new(Arc::new(FixedSecret(secret)), policy),
        )
    }

    fn decode_segment(segment: &str) -> Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn token_has_canonical_header_and_claims() {
        let token = signer(Some(b"c2VjcmV0"), SecretPolicy::EmptyKeyFallback)
            .sign("default", "https://example.com/lsd/1")
            .await
            .unwrap();

        assert_eq!(token.as_str().split('.').count(), 3);
        assert!(!token.as_str().contains('='));

        let header = URL_SAFE_NO_PAD.decode(token.header()).unwrap();
        assert_eq!(header, br#"{"alg":"HS256","typ":"JWT"}"#);

        let claims = decode_segment(token.claims());
        assert_eq!(claims["iss"], DEFAULT_TOKEN_ISSUER);
        assert_eq!(claims["sub"], "https://example.com/lsd/1");
        assert!(Uuid::parse_str(claims["jti"].as_str().unwrap()).is_ok());

        let raw_claims = String::from_utf8(URL_SAFE_NO_PAD.decode(token.claims()).unwrap()).unwrap();
        assert!(raw_claims.starts_with(r#"{"iss":"#));
        assert!(!raw_claims.contains(' '));
    }

    #[tokio::test]
    async fn signature_verifies_with_decoded_secret() {
        let token = signer(Some(b"c2VjcmV0"), SecretPolicy::EmptyKeyFallback)
            .sign("default", "urn:book:1")
            .await
            .unwrap();

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(format!("{}.{}", token.header(), token.claims()).as_bytes());
        let expected = URL_SAFE_NO_PAD.decode(token.signature()).unwrap();
        assert!(mac.verify_slice(&expected).is_ok());
    }

    #[tokio::test]
    async fn identical_inputs_share_header_but_not_token() {
        let signer = signer(Some(b"c2VjcmV0"), SecretPolicy::EmptyKeyFallback);
        let first = signer.sign("default", "urn:book:1").await.unwrap();
        let second = signer.sign("default", "urn:book:1").await.unwrap();

        assert_eq!(first.header(), second.header());
        assert_ne!(first.claims(), second.claims());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn missing_secret_signs_with_empty_key() {
        let token = signer(None, SecretPolicy::EmptyKeyFallback)
            .sign("default", "urn:book:1")
            .await
            .unwrap();

        let mut mac = HmacSha256::new_from_slice(&[]).unwrap();
        mac.update(format!("{}.{}", token.header(), token.claims()).as_bytes());
        let expected = URL_SAFE_NO_PAD.decode(token.signature()).unwrap();
        assert!(mac.verify_slice(&expected).is_ok());
    }

    #[tokio::test]
    async fn strict_policy_refuses_to_sign() {
        let result = signer(None, SecretPolicy::Strict)
            .sign("default", "urn:book:1")
            .await;
        assert!(matches!(result, Err(DrmError::SecretUnavailable { .. })));
    }

    #[test]
    fn debug_output_hides_signature() {
        let token = signer(None, SecretPolicy::EmptyKeyFallback)
            .sign_with_key(b"k", "urn:book:1")
            .unwrap();
        let debug = format!("{:?}", token);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(token.signature()));
    }
}
