use crate::JsonRpcRequest;
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

pub use super::PlacementResult as MethodResult;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub list_id: Uuid,
    pub item_id: Uuid,
    pub position: i32,
}

impl Params {
    pub fn new(list_id: Uuid, item_id: Uuid, position: i32) -> Self {
        Self {
            list_id,
            item_id,
            position,
        }
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
        Ok(Params::new(
            builder.list_id,
            builder.item_id,
            builder.position,
        ))
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    list_id: Uuid,
    item_id: Uuid,
    position: i32,
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
        };
        write!(f, "{}", output)
    }
}
