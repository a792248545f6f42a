//! HS256 JSON Web Tokens.
//!
//! Tokens are `base64url(header).base64url(claims).base64url(signature)` with
//! an HMAC-SHA256 signature over the first two segments. Only `HS256` is
//! accepted; the header is checked before the signature so `alg: none` and
//! asymmetric algorithms are rejected outright.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use storefront_core::UserId;

use crate::config::JwtConfig;

type HmacSha256 = Hmac<Sha256>;

/// Errors from issuing or verifying a token.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Not three dot-separated base64url segments of valid JSON.
    #[error("malformed token")]
    Malformed,

    /// The header names an algorithm other than HS256.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match.
    #[error("invalid signature")]
    BadSignature,

    /// `exp` is in the past.
    #[error("token expired")]
    Expired,

    /// An access token was presented where a refresh token is required, or
    /// the other way round.
    #[error("wrong token type")]
    WrongTokenType,

    /// The signing key could not be used.
    #[error("invalid signing key")]
    InvalidKey,

    /// Claims could not be encoded.
    #[error("claims encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Which of the token pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub user_id: UserId,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// An access/refresh pair returned on login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Signing key and lifetimes.
pub struct JwtKeys {
    secret: SecretString,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("secret", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl JwtKeys {
    /// Build keys from configuration.
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    /// Issue a refresh token and an access token for a user.
    ///
    /// # Errors
    ///
    /// Returns `JwtError` if the token cannot be signed.
    pub fn issue_pair(&self, user_id: UserId, is_staff: bool) -> Result<TokenPair, JwtError> {
        let now = Utc::now();
        Ok(TokenPair {
            refresh: self.issue_at(TokenType::Refresh, user_id, is_staff, now)?,
            access: self.issue_at(TokenType::Access, user_id, is_staff, now)?,
        })
    }

    /// Issue a single access token.
    ///
    /// # Errors
    ///
    /// Returns `JwtError` if the token cannot be signed.
    pub fn issue_access(&self, user_id: UserId, is_staff: bool) -> Result<String, JwtError> {
        self.issue_at(TokenType::Access, user_id, is_staff, Utc::now())
    }

    /// Verify a token and check it is of the expected type.
    ///
    /// # Errors
    ///
    /// Returns `JwtError` if the token is malformed, forged, expired or of
    /// the wrong type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let claims = self.decode_at(token, Utc::now())?;
        if claims.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Verify a token of either type.
    ///
    /// # Errors
    ///
    /// Returns `JwtError` if the token is malformed, forged or expired.
    pub fn verify_any(&self, token: &str) -> Result<Claims, JwtError> {
        self.decode_at(token, Utc::now())
    }

    fn issue_at(
        &self,
        token_type: TokenType,
        user_id: UserId,
        is_staff: bool,
        now: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let iat = now.timestamp();
        let claims = Claims {
            token_type,
            exp: iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
            iat,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            is_staff,
        };

        let header = Header {
            alg: "HS256".to_owned(),
            typ: Some("JWT".to_owned()),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let (signing_input, signature_b64) =
            token.rsplit_once('.').ok_or(JwtError::Malformed)?;
        let (header_b64, claims_b64) = signing_input
            .split_once('.')
            .ok_or(JwtError::Malformed)?;
        if claims_b64.contains('.') {
            return Err(JwtError::Malformed);
        }

        let header: Header = decode_segment(header_b64)?;
        if header.alg != "HS256" {
            return Err(JwtError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| JwtError::Malformed)?;
        self.mac(signing_input)?
            .verify_slice(&signature)
            .map_err(|_| JwtError::BadSignature)?;

        let claims: Claims = decode_segment(claims_b64)?;
        if claims.exp <= now.timestamp() {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> Result<HmacSha256, JwtError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| JwtError::InvalidKey)?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, JwtError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| JwtError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| JwtError::Malformed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys {
            secret: SecretString::from("k3Y-for-unit-tests-0123456789-abcdefXYZ"),
            access_ttl: Duration::from_secs(300),
            refresh_ttl: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_issue_and_verify_pair() {
        let keys = keys();
        let pair = keys.issue_pair(UserId::new(7), true).unwrap();

        let access = keys.verify(&pair.access, TokenType::Access).unwrap();
        assert_eq!(access.user_id, UserId::new(7));
        assert!(access.is_staff);
        assert_eq!(access.exp - access.iat, 300);

        let refresh = keys.verify(&pair.refresh, TokenType::Refresh).unwrap();
        assert_eq!(refresh.exp - refresh.iat, 3600);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn test_wrong_token_type() {
        let keys = keys();
        let pair = keys.issue_pair(UserId::new(1), false).unwrap();
        assert!(matches!(
            keys.verify(&pair.access, TokenType::Refresh),
            Err(JwtError::WrongTokenType)
        ));
        assert!(keys.verify_any(&pair.access).is_ok());
    }

    #[test]
    fn test_expired_token() {
        let keys = keys();
        let issued = Utc::now() - chrono::Duration::seconds(600);
        let token = keys
            .issue_at(TokenType::Access, UserId::new(1), false, issued)
            .unwrap();
        assert!(matches!(keys.verify_any(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let keys = keys();
        let token = keys.issue_access(UserId::new(1), false).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims.is_staff = true;
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
            parts[2]
        );

        assert!(matches!(
            keys.verify_any(&forged),
            Err(JwtError::BadSignature)
        ));
    }

    #[test]
    fn test_other_key_rejected() {
        let token = keys().issue_access(UserId::new(1), false).unwrap();
        let other = JwtKeys {
            secret: SecretString::from("a-completely-different-key-9876543210zz"),
            ..keys()
        };
        assert!(matches!(
            other.verify_any(&token),
            Err(JwtError::BadSignature)
        ));
    }

    #[test]
    fn test_alg_none_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let token = keys().issue_access(UserId::new(1), true).unwrap();
        let claims = token.split('.').nth(1).unwrap();
        let forged = format!("{header}.{claims}.");
        assert!(matches!(
            keys().verify_any(&forged),
            Err(JwtError::UnsupportedAlgorithm(alg)) if alg == "none"
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let keys = keys();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.##"] {
            assert!(
                matches!(keys.verify_any(token), Err(JwtError::Malformed)),
                "{token} should be malformed"
            );
        }
    }
}
