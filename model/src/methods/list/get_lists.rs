use crate::JsonRpcRequest;
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

/// The caller's lists. Takes no parameters.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {}

impl Params {
    pub fn new() -> Self {
        Self {}
    }
}

impl TryFrom<JsonRpcRequest> for Params {
    type Error = InvalidParams;

    fn try_from(request: JsonRpcRequest) -> Result<Self, Self::Error> {
        if request.params.is_null() {
            return Ok(Params::new());
        }
        let builder: ParamsBuilder =
            crate::parse_params(request).map_err(InvalidParams::InvalidFormat)?;
        builder.try_into()
    }
}

impl TryFrom<ParamsBuilder> for Params {
    type Error = InvalidParams;

    fn try_from(_: ParamsBuilder) -> Result<Self, Self::Error> {
        Ok(Params::new())
    }
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamsBuilder {}

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

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct List {
    pub id: Uuid,
    pub name: String,
}

impl List {
    pub fn new(id: Uuid, name: String) -> Self {
        Self { id, name }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub lists: Vec<List>,
}

impl MethodResult {
    pub fn new(lists: Vec<List>) -> Self {
        Self { lists }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn request(params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new("get_lists".to_string(), params, Some("1".to_string())).unwrap()
    }

    #[test]
    fn empty_or_missing_params() {
        assert!(Params::try_from(request(json!({}))).is_ok());
        assert!(Params::try_from(request(Value::Null)).is_ok());
    }

    #[test]
    fn unexpected_params_are_rejected() {
        assert!(matches!(
            Params::try_from(request(json!({ "user_id": "someone" }))),
            Err(InvalidParams::InvalidFormat(_))
        ));
    }
}
