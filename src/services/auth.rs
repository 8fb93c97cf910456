// src/services/auth.rs

use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    common::error::AppError,
    models::auth::{Actor, Claims},
};

// Tokens are issued by the platform's auth provider; this side only verifies them
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<Actor, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )?;

        Ok(Actor::from(token_data.claims))
    }
}

#[cfg(test)]
impl AuthService {
    pub fn create_token(&self, actor: &Actor, ttl: chrono::Duration) -> Result<String, AppError> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = chrono::Utc::now();
        let claims = Claims {
            sub: actor.id,
            name: actor.name.clone(),
            role: actor.role,
            workshop_id: actor.workshop_id,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::actor;
    use chrono::Duration;

    #[test]
    fn valid_token_yields_the_actor() {
        let auth = AuthService::new("secret".into());
        let actor = actor();
        let token = auth.create_token(&actor, Duration::hours(1)).unwrap();
        assert_eq!(auth.validate_token(&token).unwrap(), actor);
    }

    #[test]
    fn expired_or_foreign_tokens_are_rejected() {
        let auth = AuthService::new("secret".into());
        let actor = actor();

        let expired = auth.create_token(&actor, Duration::hours(-2)).unwrap();
        assert!(matches!(auth.validate_token(&expired), Err(AppError::InvalidToken)));

        let foreign = AuthService::new("other".into()).create_token(&actor, Duration::hours(1)).unwrap();
        assert!(matches!(auth.validate_token(&foreign), Err(AppError::InvalidToken)));

        assert!(matches!(auth.validate_token("not-a-jwt"), Err(AppError::InvalidToken)));
    }
}
