use chrono::Utc;

use crate::{
    model::user::User,
    models::{Claims, TokenType},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn claims_for(user: &User, token_type: TokenType, ttl: usize) -> Claims {
    Claims {
        id: user.id.clone(),
        role: user.role,
        name: user.name.clone(),
        email: user.email.clone(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

/// Signs `claims` as-is; used for re-issuing from a refresh token too.
pub fn sign(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn generate_access_token(user: &User, secret: &str, ttl: usize) -> Result<String, Error> {
    sign(&claims_for(user, TokenType::Access, ttl), secret)
}

pub fn generate_refresh_token(user: &User, secret: &str, ttl: usize) -> Result<(String, Claims), Error> {
    let claims = claims_for(user, TokenType::Refresh, ttl);
    let token = sign(&claims, secret)?;
    Ok((token, claims))
}

/// Checks signature and expiry and returns the claims.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
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
    use crate::model::role::Role;

    fn user(role: Role) -> User {
        User {
            id: "u-42".into(),
            name: "Jane Doe".into(),
            email: "jane@company.com".into(),
            password_hash: String::new(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trips_claims() {
        let token = generate_access_token(&user(Role::Hr), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.id, "u-42");
        assert_eq!(claims.role, Role::Hr);
        assert_eq!(claims.email, "jane@company.com");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&user(Role::User), "secret", 60).unwrap();
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = claims_for(&user(Role::User), TokenType::Access, 0);
        // past the default 60s leeway
        claims.exp = now() - 3600;
        let token = sign(&claims, "secret").unwrap();

        assert!(verify_token(&token, "secret").is_err());
    }

    #[test]
    fn refresh_tokens_get_distinct_ids() {
        let (_, a) = generate_refresh_token(&user(Role::Admin), "secret", 60).unwrap();
        let (_, b) = generate_refresh_token(&user(Role::Admin), "secret", 60).unwrap();

        assert_eq!(a.token_type, TokenType::Refresh);
        assert_ne!(a.jti, b.jti);
    }
}
