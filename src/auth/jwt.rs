use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::config::JwtConfig;

/// Signing and verification keys, built once at startup from [`JwtConfig`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    /// Token for `username` with the configured lifetime.
    pub fn sign(&self, username: &str) -> anyhow::Result<String> {
        self.issue(username, self.ttl)
    }

    pub fn issue(&self, username: &str, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: username.to_string(),
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(username, "jwt signed");
        Ok(token)
    }

    /// Checks signature, algorithm and expiry.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(username = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            ttl_minutes: 30,
        })
    }

    #[test]
    fn sign_and_verify() {
        let keys = make_keys("dev-secret");
        let token = keys.sign("sarah_fitness").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "sarah_fitness");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn rejects_tampered_signature() {
        let keys = make_keys("dev-secret");
        let token = keys.sign("sarah").unwrap();
        let (body, sig) = token.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{body}.{flipped}{}", &sig[1..]);
        assert!(keys.verify(&tampered).is_err());
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = make_keys("secret-a").sign("sarah").unwrap();
        assert!(make_keys("secret-b").verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let token = keys.issue("sarah", Duration::minutes(-5)).unwrap();
        let err = keys.verify(&token).unwrap_err();
        assert!(err.to_string().contains("ExpiredSignature"));
    }

    #[test]
    fn rejects_algorithm_mismatch() {
        let hs256 = make_keys("dev-secret");
        let hs512 = JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            algorithm: Algorithm::HS512,
            ttl_minutes: 30,
        });
        let token = hs256.sign("sarah").unwrap();
        assert!(hs512.verify(&token).is_err());
    }
}
