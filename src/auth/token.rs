use std::fmt::Debug;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::types::Identity;
use crate::types::LedgerError;
use crate::types::Result;

pub const NO_TOKEN: &str = "No token provided";
pub const INVALID_TOKEN: &str = "Invalid token";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id:       i32,
    username: String,
    iat:      i64,
    exp:      i64,
}

/// Issues and verifies HS256 bearer tokens carrying an [`Identity`].
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl:      Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, identity: &Identity) -> Result<String> {
        self.issue_at(identity, Utc::now())
    }

    pub fn issue_at(&self, identity: &Identity, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            id:       identity.id,
            username: identity.username.clone(),
            iat:      issued_at.timestamp(),
            exp:      (issued_at + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| LedgerError::internal(format!("token encoding failed: {e}")))
    }

    /// Verify signature and expiry of `token`.
    pub fn verify(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256)).map_err(|e| {
            debug!("token rejected: {e}");
            LedgerError::Auth(INVALID_TOKEN.to_owned())
        })?;

        Ok(Identity {
            id:       data.claims.id,
            username: data.claims.username,
        })
    }

    /// Resolve the value of an `Authorization` header, if any, into an identity.
    pub fn authorize(&self, header: Option<&str>) -> Result<Identity> {
        let Some(header) = header.map(str::trim).filter(|h| !h.is_empty())
        else {
            return Err(LedgerError::Auth(NO_TOKEN.to_owned()));
        };

        match header.strip_prefix("Bearer ").map(str::trim) {
            Some(token) if !token.is_empty() => self.verify(token),
            _ => Err(LedgerError::Auth(INVALID_TOKEN.to_owned())),
        }
    }
}

impl Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity {
            id:       7,
            username: "alice".to_owned(),
        }
    }

    fn auth_message(res: Result<Identity>) -> String {
        match res {
            Err(LedgerError::Auth(msg)) => msg,
            other => panic!("expected an auth error, got {other:?}"),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let issuer = TokenIssuer::new("s3cret-key", Duration::hours(24));
        let token = issuer.issue(&alice()).unwrap();

        assert_eq!(issuer.verify(&token).unwrap(), alice());
        assert_eq!(issuer.authorize(Some(&format!("Bearer {token}"))).unwrap(), alice());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::new("s3cret-key", Duration::hours(24));
        let token = issuer.issue_at(&alice(), Utc::now() - Duration::hours(48)).unwrap();

        assert_eq!(auth_message(issuer.verify(&token)), INVALID_TOKEN);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let ours = TokenIssuer::new("s3cret-key", Duration::hours(24));
        let theirs = TokenIssuer::new("another-key", Duration::hours(24));
        let token = theirs.issue(&alice()).unwrap();

        assert_eq!(auth_message(ours.verify(&token)), INVALID_TOKEN);
        assert_eq!(auth_message(ours.verify("not.a.jwt")), INVALID_TOKEN);
    }

    #[test]
    fn missing_header() {
        let issuer = TokenIssuer::new("s3cret-key", Duration::hours(24));

        assert_eq!(auth_message(issuer.authorize(None)), NO_TOKEN);
        assert_eq!(auth_message(issuer.authorize(Some("  "))), NO_TOKEN);
        assert_eq!(auth_message(issuer.authorize(Some("Bearer "))), INVALID_TOKEN);
        assert_eq!(auth_message(issuer.authorize(Some("Basic YWxpY2U6"))), INVALID_TOKEN);
        assert_eq!(auth_message(issuer.authorize(Some("Bearer garbage"))), INVALID_TOKEN);
    }
}
