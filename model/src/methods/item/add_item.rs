use crate::JsonRpcRequest;
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub title: String,
}

impl Params {
    pub fn new(title: String) -> Result<Self, InvalidParams> {
        if title.trim().is_empty() {
            return Err(InvalidParams::EmptyTitle);
        }
        Ok(Self { title })
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
        Params::new(builder.title)
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    title: String,
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    EmptyTitle,
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::EmptyTitle => crate::invalid_value_because_message(
                "title",
                "title is required".to_string(),
            ),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub id: Uuid,
    pub title: String,
}

impl MethodResult {
    pub fn new(id: Uuid, title: String) -> Self {
        Self { id, title }
    }
}
