use database::UserClaimsRow;
use jsonwebtoken::{
    errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::OffsetDateTime;
use uuid::Uuid;

/// Issues and checks HS256 tokens with a signing key handed in from configuration.
#[derive(Clone)]
pub struct TokenHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenHandler {
    pub fn new(signing_key: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_key.as_bytes()),
        }
    }

    pub fn parse_token(&self, token: &str) -> Result<UserClaims, JwtError> {
        match jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        ) {
            Ok(token_data) => Ok(UserClaims::from(token_data.claims)),
            Err(e) => {
                error!("failed to validate token with error: '{}'", e);
                Err(e)
            }
        }
    }

    pub fn generate_token(
        &self,
        user: UserClaims,
        expires_at: OffsetDateTime,
    ) -> Result<String, JwtError> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &Claims::new(user, expires_at.unix_timestamp()),
            &self.encoding_key,
        )
    }
}

/// Who is calling, as carried by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserClaims {
    pub uuid: Uuid,
    pub superuser: bool,
}

impl From<UserClaimsRow> for UserClaims {
    fn from(row: UserClaimsRow) -> Self {
        Self {
            uuid: row.uuid,
            superuser: row.superuser,
        }
    }
}

impl From<Claims> for UserClaims {
    fn from(claims: Claims) -> Self {
        Self {
            uuid: claims.user_uuid,
            superuser: claims.superuser,
        }
    }
}

/// Token payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    user_uuid: Uuid,
    superuser: bool,
    exp: i64,
}

impl Claims {
    fn new(user: UserClaims, exp: i64) -> Self {
        Self {
            user_uuid: user.uuid,
            superuser: user.superuser,
            exp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::ext::NumericalDuration;

    fn user() -> UserClaims {
        UserClaims {
            uuid: Uuid::new_v4(),
            superuser: false,
        }
    }

    #[test]
    fn token_round_trip() {
        let tokens = TokenHandler::new("a secret for tests");
        let user = user();
        let token = tokens
            .generate_token(user, OffsetDateTime::now_utc() + 1.hours())
            .unwrap();

        assert_eq!(tokens.parse_token(&token).unwrap(), user);
    }

    #[test]
    fn token_signed_with_another_key() {
        let token = TokenHandler::new("first key")
            .generate_token(user(), OffsetDateTime::now_utc() + 1.hours())
            .unwrap();

        assert!(TokenHandler::new("second key").parse_token(&token).is_err());
    }

    #[test]
    fn expired_token() {
        let tokens = TokenHandler::new("a secret for tests");
        let token = tokens
            .generate_token(user(), OffsetDateTime::now_utc() - 2.hours())
            .unwrap();

        assert!(tokens.parse_token(&token).is_err());
    }
}
