use super::ListItem;
use crate::{InvalidPagination, JsonRpcRequest, Pagination};
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
    pub list_id: Uuid,
    pub pagination: Pagination,
}

impl Params {
    pub fn new(
        list_id: Uuid,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Self, InvalidParams> {
        let pagination = Pagination::new(page, page_size).map_err(InvalidParams::Pagination)?;
        Ok(Self {
            list_id,
            pagination,
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
        Params::new(builder.list_id, builder.page, builder.page_size)
    }
}

#[derive(serde::Deserialize)]
struct ParamsBuilder {
    list_id: Uuid,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug)]
pub enum InvalidParams {
    InvalidFormat(serde_json::Error),
    Pagination(InvalidPagination),
}

impl Error for InvalidParams {}

impl Display for InvalidParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidParams::InvalidFormat(serde_error) => {
                crate::invalid_params_serde_message(serde_error)
            }
            InvalidParams::Pagination(pagination_error) => pagination_error.to_string(),
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct MethodResult {
    pub pagination: Pagination,
    pub list_items: Vec<ListItem>,
}

impl MethodResult {
    pub fn new(pagination: Pagination, list_items: Vec<ListItem>) -> Self {
        Self {
            pagination,
            list_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_pagination() {
        let request = JsonRpcRequest::new(
            "get_list_items".to_string(),
            json!({ "list_id": Uuid::new_v4() }),
            Some("1".to_string()),
        )
        .unwrap();

        let params = Params::try_from(request).unwrap();
        assert_eq!(params.pagination, Pagination::default());
    }

    #[test]
    fn invalid_page() {
        let request = JsonRpcRequest::new(
            "get_list_items".to_string(),
            json!({ "list_id": Uuid::new_v4(), "page": 0 }),
            Some("1".to_string()),
        )
        .unwrap();

        assert!(matches!(
            Params::try_from(request),
            Err(InvalidParams::Pagination(InvalidPagination::Page(0)))
        ));
    }
}
