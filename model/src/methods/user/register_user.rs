use crate::JsonRpcRequest;
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

pub const PASSWORD_MIN_LEN: usize = 10;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Params {
    pub fn new(username: String, email: String, password: String) -> Result<Self, InvalidParams> {
        if username.trim().is_empty() {
            return Err(InvalidParams::EmptyUsername);
        }

        if !email.contains('@') {
            return Err(InvalidParams::InvalidEmail);
        }

        if password.len() < PASSWORD_MIN_LEN {
            return Err(InvalidParams::PasswordTooShort);
        }

        Ok(Self {
            username,
            email,
            password,
        })
    }
}

impl TryFrom<JsonRpcRequest> for Params {
    type Error = InvalidParams;

    fn try_from(request: JsonRpcRequest) -> Result<Self, Self::Error> {
        let builder: ParamsBuilder =
            crate::parse_params(request).map_err(InvalidParams::InvalidFormat)?;
        builder.try_into()
    }
}

impl TryFrom<ParamsBuilder> for Params {
    type Error = InvalidParams;

    fn try_from(builder: ParamsBuilder) -> Result<Self, Self::Error> {
        Params::new(builder.username, builder.email, builder.password)
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    EmptyUsername,
    InvalidEmail,
    PasswordTooShort,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::EmptyUsername => crate::generic_invalid_value_message("username"),
            InvalidParams::InvalidEmail => crate::invalid_value_because_message(
                "email",
                "not an email address".to_string(),
            ),
            InvalidParams::PasswordTooShort => crate::invalid_value_because_message(
                "password",
                format!("must be at least {} characters long", PASSWORD_MIN_LEN),
            ),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub success: bool,
    pub id: Option<Uuid>,
}

impl MethodResult {
    pub fn success(id: Uuid) -> Self {
        Self {
            success: true,
            id: Some(id),
        }
    }

    pub fn failure() -> Self {
        Self {
            success: false,
            id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest::new("register_user".to_string(), params, Some("1".to_string())).unwrap()
    }

    #[test]
    fn valid_params() {
        let params = Params::try_from(request(json!({
            "username": "sporiff",
            "email": "test@test.com",
            "password": "correct horse battery"
        })))
        .unwrap();

        assert_eq!(params.username, "sporiff");
    }

    #[test]
    fn short_password() {
        let result = Params::try_from(request(json!({
            "username": "sporiff",
            "email": "test@test.com",
            "password": "short"
        })));

        assert!(matches!(result, Err(InvalidParams::PasswordTooShort)));
    }

    #[test]
    fn bad_email() {
        let result = Params::try_from(request(json!({
            "username": "sporiff",
            "email": "test.test.com",
            "password": "correct horse battery"
        })));

        assert!(matches!(result, Err(InvalidParams::InvalidEmail)));
    }
}
