use crate::JsonRpcRequest;
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};

/// Login with either a username or an email address.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub login: String,
    pub password: String,
}

impl Params {
    pub fn new(
        username: Option<String>,
        email: Option<String>,
        password: String,
    ) -> Result<Self, InvalidParams> {
        let login = username
            .or(email)
            .filter(|login| !login.trim().is_empty())
            .ok_or(InvalidParams::MissingLogin)?;

        Ok(Self { login, password })
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
    username: Option<String>,
    email: Option<String>,
    password: String,
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    MissingLogin,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::MissingLogin => "one of 'username' or 'email' is required".to_string(),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub token: String,
    /// Unix timestamp (seconds) at which the token expires
    pub expires_at: i64,
    /// Can be traded for a new `token` through `refresh_token`
    pub refresh_token: String,
    pub refresh_expires_at: i64,
}

impl MethodResult {
    pub fn new(
        token: String,
        expires_at: i64,
        refresh_token: String,
        refresh_expires_at: i64,
    ) -> Self {
        Self {
            token,
            expires_at,
            refresh_token,
            refresh_expires_at,
        }
    }
}
