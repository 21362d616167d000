use anyhow::Context;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::{JwtConfig, MAX_JWT_EXPIRATION_HOURS};

/// Claims carried by the login credential.
///
/// Nothing in this service verifies the credential yet; any consumer that relies
/// on it must validate signature, `iss`, `aud` and `exp` itself.
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    pub sub: i64,    // user ID
    pub iat: i64,    // issued at (unix timestamp)
    pub exp: i64,    // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
    pub jti: Uuid,   // credential ID
}

/// A signed credential and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// HS256 signing key plus the claim values stamped on every credential.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        let hours = cfg.expiration_hours.clamp(1, MAX_JWT_EXPIRATION_HOURS);
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::hours(hours),
        }
    }

    pub fn issue(&self, user_id: i64) -> anyhow::Result<IssuedToken> {
        // JWT timestamps have second precision; keep expires_at identical to exp.
        let now = OffsetDateTime::now_utc().replace_nanosecond(0)?;
        let expires_at = now
            .checked_add(self.ttl)
            .context("credential expiry out of range")?;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, %expires_at, "credential issued");
        Ok(IssuedToken { token, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Decoded {
        sub: i64,
        iat: i64,
        exp: i64,
        iss: String,
        aud: String,
        jti: Uuid,
    }

    fn jwt_config(secret: &str, hours: i64) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: "smart-dating-optimizer".into(),
            audience: "smart-dating-optimizer-users".into(),
            expiration_hours: hours,
        }
    }

    fn decode_with(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Decoded> {
        let mut validation = Validation::default();
        validation.set_audience(&["smart-dating-optimizer-users"]);
        validation.set_issuer(&["smart-dating-optimizer"]);
        decode::<Decoded>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
    }

    #[test]
    fn credential_is_signed_for_the_user_with_configured_lifetime() {
        let issued = TokenIssuer::new(&jwt_config("s3cret", 168)).issue(42).unwrap();
        assert!(!issued.token.is_empty());

        let claims = decode_with("s3cret", &issued.token).expect("decodes with same secret");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "smart-dating-optimizer");
        assert_eq!(claims.aud, "smart-dating-optimizer-users");
        assert_eq!(claims.exp, issued.expires_at.unix_timestamp());
        assert_eq!(claims.exp - claims.iat, 168 * 3600);
    }

    #[test]
    fn credential_does_not_decode_under_another_secret() {
        let issued = TokenIssuer::new(&jwt_config("s3cret", 1)).issue(1).unwrap();
        assert!(decode_with("other", &issued.token).is_err());
    }

    #[test]
    fn each_login_gets_a_fresh_credential_id() {
        let issuer = TokenIssuer::new(&jwt_config("s3cret", 1));
        let a = decode_with("s3cret", &issuer.issue(1).unwrap().token).unwrap();
        let b = decode_with("s3cret", &issuer.issue(1).unwrap().token).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn oversized_lifetime_is_capped_instead_of_overflowing() {
        let issuer = TokenIssuer::new(&jwt_config("s3cret", i64::MAX));
        let issued = issuer.issue(1).expect("issue stays in range");
        let max = OffsetDateTime::now_utc() + Duration::hours(MAX_JWT_EXPIRATION_HOURS + 1);
        assert!(issued.expires_at < max);
    }
}
