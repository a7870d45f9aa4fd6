use crate::JsonRpcRequest;
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};

/// Revoke one of the caller's refresh tokens.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub refresh_token: String,
}

impl Params {
    pub fn new(refresh_token: String) -> Result<Self, InvalidParams> {
        if refresh_token.trim().is_empty() {
            return Err(InvalidParams::EmptyToken);
        }
        Ok(Self { refresh_token })
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
        Params::new(builder.refresh_token)
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    refresh_token: String,
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    EmptyToken,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::EmptyToken => crate::generic_invalid_value_message("refresh_token"),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub logged_out: bool,
}

impl MethodResult {
    pub fn new(logged_out: bool) -> Self {
        Self { logged_out }
    }
}
