use crate::JsonRpcRequest;
use std::{
    convert::{TryFrom, TryInto},
    error::Error,
    fmt::Display,
};
use uuid::Uuid;

/// Look up a user. Without an `id` the caller is looked up; other users need a superuser.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ParamsBuilder")]
#[non_exhaustive]
pub struct Params {
    pub id: Option<Uuid>,
}

impl Params {
    pub fn new(id: Option<Uuid>) -> Self {
        Self { id }
    }
}

impl TryFrom<JsonRpcRequest> for Params {
    type Error = InvalidParams;

    fn try_from(request: JsonRpcRequest) -> Result<Self, Self::Error> {
        if request.params.is_null() {
            return Ok(Params::new(None));
        }
        let builder: ParamsBuilder =
            crate::parse_params(request).map_err(InvalidParams::InvalidFormat)?;
        builder.try_into()
    }
}

impl TryFrom<ParamsBuilder> for Params {
    type Error = InvalidParams;

    fn try_from(builder: ParamsBuilder) -> Result<Self, Self::Error> {
        Ok(Params::new(builder.id))
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    id: Option<Uuid>,
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

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub superuser: bool,
    /// Unix timestamp (seconds) of registration
    pub created_date: i64,
}

impl MethodResult {
    pub fn new(
        id: Uuid,
        username: String,
        email: String,
        superuser: bool,
        created_date: i64,
    ) -> Self {
        Self {
            id,
            username,
            email,
            superuser,
            created_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn id_defaults_to_the_caller() {
        let request =
            JsonRpcRequest::new("get_user".to_string(), json!({}), Some("1".to_string())).unwrap();
        assert_eq!(Params::try_from(request).unwrap().id, None);

        let request =
            JsonRpcRequest::new("get_user".to_string(), Value::Null, Some("1".to_string()))
                .unwrap();
        assert_eq!(Params::try_from(request).unwrap().id, None);
    }
}
