use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Login of the account, looked up again on every request.
    pub sub: String,
    pub user_id: i64,
    pub role_id: i64,
    pub exp: usize,
    pub jti: String,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

/// Issue a signed bearer token valid for `ttl` seconds from now.
/// Fixed window: there is no refresh path, callers re-login after expiry.
pub fn issue_token(
    login: &str,
    user_id: i64,
    role_id: i64,
    secret: &str,
    ttl: usize,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: login.to_string(),
        user_id,
        role_id,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-unit-test-secret";

    #[test]
    fn round_trip() {
        let token = issue_token("ivanov", 7, 1, SECRET, 1800).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "ivanov");
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.role_id, 1);
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_token("ivanov", 7, 1, SECRET, 1800).unwrap();
        assert!(verify_token(&token, "some-other-secret").is_err());
    }

    fn token_with_exp(exp: usize) -> String {
        let claims = Claims {
            sub: "ivanov".to_string(),
            user_id: 7,
            role_id: 1,
            exp,
            jti: Uuid::new_v4().to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    // A 30-minute token must still resolve just before the window closes
    // and must fail once it is past.
    #[test]
    fn thirty_minute_window() {
        let one_minute_left = token_with_exp(now() + 60);
        assert!(verify_token(&one_minute_left, SECRET).is_ok());

        // exp must clear the default 60 s validation leeway
        let past_leeway = token_with_exp(now().saturating_sub(120));
        assert!(verify_token(&past_leeway, SECRET).is_err());
    }
}
