#![allow(clippy::new_without_default)]

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    convert::{Infallible, TryFrom},
    error::Error,
    fmt::Display,
    str::FromStr,
};

pub use methods::*;
pub use pagination::{InvalidPagination, Pagination};

mod methods;
mod pagination;

mod method_names {
    pub const REGISTER_USER: &str = "register_user";
    pub const GET_TOKEN: &str = "get_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const LOGOUT: &str = "logout";
    pub const GET_USER: &str = "get_user";

    pub const ADD_LIST: &str = "add_list";
    pub const GET_LISTS: &str = "get_lists";
    pub const DELETE_LIST: &str = "delete_list";
    pub const ADD_ITEM: &str = "add_item";
    pub const ADD_STATUS: &str = "add_status";

    pub const ADD_LIST_ITEM: &str = "add_list_item";
    pub const REMOVE_LIST_ITEM: &str = "remove_list_item";
    pub const MOVE_LIST_ITEM: &str = "move_list_item";
    pub const MOVE_LIST_ITEM_TO_LIST: &str = "move_list_item_to_list";
    pub const GET_LIST_ITEMS: &str = "get_list_items";
    pub const SET_LIST_ITEM_STATUS: &str = "set_list_item_status";
}

pub mod error_codes {
    pub mod standard {
        pub const PARSE_ERROR: i32 = -32700;
        pub const INVALID_REQUEST: i32 = -32600;
        pub const METHOD_NOT_FOUND: i32 = -32601;
        pub const INVALID_PARAMS: i32 = -32602;
        pub const INTERNAL_ERROR: i32 = -32603;
    }

    pub mod application {
        pub const ITEM_DOES_NOT_EXIST: i32 = -31999;
        pub const NOT_AUTHORIZED: i32 = -31998;
        pub const CONFLICT: i32 = -31997;
    }
}

/// A JSONRPC method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Register a new user, seeding a default list and status
    RegisterUser,
    /// Get a JWT and a refresh token
    GetToken,
    /// Trade a refresh token for a new JWT
    RefreshToken,
    /// Revoke a refresh token
    Logout,
    /// Look up the caller, or any user for a superuser
    GetUser,

    /// Add a list owned by the caller
    AddList,
    /// Get the lists owned by the caller
    GetLists,
    /// Delete a list owned by the caller, with its list items
    DeleteList,
    /// Add a catalog item
    AddItem,
    /// Add a status label owned by the caller
    AddStatus,

    /// Place an item into a list at a position
    AddListItem,
    /// Remove a list item from its list
    RemoveListItem,
    /// Move a list item to another position in the same list
    MoveListItem,
    /// Move a list item into another list
    MoveListItemToList,
    /// Get a page of the list items of a list, in order
    GetListItems,
    /// Set or clear the status of a list item
    SetListItemStatus,
}

impl Method {
    /// Methods that can be called without a token.
    pub fn is_anonymous(&self) -> bool {
        matches!(
            self,
            Method::RegisterUser | Method::GetToken | Method::RefreshToken
        )
    }
}

impl FromStr for Method {
    type Err = (); // any failure means the method simply doesn't exist
    fn from_str(s: &str) -> Result<Method, Self::Err> {
        use method_names::*;
        use Method::*;
        match s {
            REGISTER_USER => Ok(RegisterUser),
            GET_TOKEN => Ok(GetToken),
            REFRESH_TOKEN => Ok(RefreshToken),
            LOGOUT => Ok(Logout),
            GET_USER => Ok(GetUser),
            ADD_LIST => Ok(AddList),
            GET_LISTS => Ok(GetLists),
            DELETE_LIST => Ok(DeleteList),
            ADD_ITEM => Ok(AddItem),
            ADD_STATUS => Ok(AddStatus),
            ADD_LIST_ITEM => Ok(AddListItem),
            REMOVE_LIST_ITEM => Ok(RemoveListItem),
            MOVE_LIST_ITEM => Ok(MoveListItem),
            MOVE_LIST_ITEM_TO_LIST => Ok(MoveListItemToList),
            GET_LIST_ITEMS => Ok(GetListItems),
            SET_LIST_ITEM_STATUS => Ok(SetListItemStatus),
            _ => Err(()),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use method_names::*;
        use Method::*;
        let output = match self {
            RegisterUser => REGISTER_USER,
            GetToken => GET_TOKEN,
            RefreshToken => REFRESH_TOKEN,
            Logout => LOGOUT,
            GetUser => GET_USER,
            AddList => ADD_LIST,
            GetLists => GET_LISTS,
            DeleteList => DELETE_LIST,
            AddItem => ADD_ITEM,
            AddStatus => ADD_STATUS,
            AddListItem => ADD_LIST_ITEM,
            RemoveListItem => REMOVE_LIST_ITEM,
            MoveListItem => MOVE_LIST_ITEM,
            MoveListItemToList => MOVE_LIST_ITEM_TO_LIST,
            GetListItems => GET_LIST_ITEMS,
            SetListItemStatus => SET_LIST_ITEM_STATUS,
        };
        write!(f, "{}", output)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Copy)]
pub enum JsonRpcVersion {
    #[serde(alias = "2.0", rename = "2.0")]
    Two,
}

/// A JSONRPC request.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone)]
#[non_exhaustive]
pub struct JsonRpcRequest {
    /// JSONRPC version.
    pub jsonrpc: JsonRpcVersion,
    /// RPC method to call.
    pub method: String,
    /// Parameters to pass to the method.
    pub params: Value,
    /// A response to this request should contain this same id (provided by the requester).
    /// If the request is a notification, then `id` is `None`.
    pub id: Option<String>,
}

impl JsonRpcRequest {
    pub fn new<T>(method: String, params: T, id: Option<String>) -> Result<Self, serde_json::Error>
    where
        T: Serialize,
    {
        Ok(Self {
            jsonrpc: JsonRpcVersion::Two,
            method,
            params: serde_json::to_value(params)?,
            id,
        })
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// A JSONRPC response object. Contains _either_ a `result` (in case of success) or `error` (in case of failure).
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct JsonRpcResponse {
    /// JSONRPC version of the response.
    pub jsonrpc: JsonRpcVersion,
    /// Optional data to be returned in case of success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Optional data to be returned in case of failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Id corresponding to `id` property of request (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl JsonRpcResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Deserialize the contained json result (if any)
    pub fn result_as<T>(self) -> Result<Option<T>, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        Ok(match self.result {
            Some(r) => {
                let deserialized: T = serde_json::from_value(r)?;
                Some(deserialized)
            }
            None => None,
        })
    }

    /// Create a `JsonRpcResponse` with a `result` property (indicating success).
    ///
    /// A result that fails to serialize is turned into an internal error response.
    pub fn success<T: Serialize>(result: T, id: Option<String>) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                jsonrpc: JsonRpcVersion::Two,
                result: Some(value),
                error: None,
                id,
            },
            Err(serde_error) => Self::error(
                JsonRpcError::internal_error()
                    .with_message(format!("failed to serialize result: '{}'", serde_error)),
                id,
            ),
        }
    }

    /// Create a `JsonRpcResponse` with an `error` property (indicating failure).
    pub fn error(error: JsonRpcError, id: Option<String>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion::Two,
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// Error object to be returned in a `JsonRpcResponse` if something failed.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct JsonRpcError {
    /// JSONRPC error code.
    pub code: i32,
    /// Short description of what went wrong.
    pub message: String,
    /// Optional field containing structured error information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn new(code: ErrorCode, message: String, data: Option<Value>) -> Self {
        Self {
            code: code.into(),
            message,
            data,
        }
    }

    /// Set the `message` property on `self`.
    pub fn with_message<T>(mut self, message: T) -> Self
    where
        T: Into<String>,
    {
        self.message = message.into();
        self
    }

    /// Set the `data` property on `self`. Data that fails to serialize is dropped.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// Constructor for a "Method not found" JSONRPC error.
    ///
    /// ## Definition
    /// The method does not exist / is not available.
    pub fn method_not_found() -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            "Method not found".to_owned(),
            None,
        )
    }

    /// Constructor for a "Invalid request" JSONRPC error.
    ///
    /// ## Definition
    /// The JSON sent is not a valid Request object.
    pub fn invalid_request() -> Self {
        Self::new(
            ErrorCode::InvalidRequest,
            "Invalid request".to_owned(),
            None,
        )
    }

    /// Constructor for an "Invalid params" JSONRPC error.
    ///
    /// ## Definition
    /// Invalid method parameter(s).
    pub fn invalid_params() -> Self {
        Self::new(ErrorCode::InvalidParams, "Invalid params".to_owned(), None)
    }

    /// Constructor for an "Internal error" JSONRPC error.
    ///
    /// ## Definition
    /// Internal JSON-RPC error.
    pub fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError, "Internal error".to_owned(), None)
    }

    /// Constructor for an "Application error" webserver error.
    ///
    /// This error means your request could not be processed due to a failure in the application level logic.
    /// Reserved codes (see the [JSONRPC specification](https://www.jsonrpc.org/specification#error_object))
    /// are replaced by an internal error.
    pub fn application_error(code: i32) -> Self {
        if ErrorCode::is_reserved(code) {
            return Self::internal_error()
                .with_message(format!("error code '{}' is reserved", code));
        }
        Self {
            code,
            message: String::new(),
            data: None,
        }
    }

    /// Constructor for a "Not found" webserver error.
    pub fn not_found() -> Self {
        Self::application_error(error_codes::application::ITEM_DOES_NOT_EXIST)
            .with_message("not found")
    }

    /// Constructor for a "Not permitted" webserver error.
    pub fn not_permitted() -> Self {
        Self::application_error(error_codes::application::NOT_AUTHORIZED)
            .with_message("not permitted")
    }

    /// Constructor for a "Conflict" webserver error, the request can be retried as is.
    pub fn conflict() -> Self {
        Self::application_error(error_codes::application::CONFLICT)
            .with_message("concurrent modification, retry the request")
    }

    pub fn database_error() -> Self {
        Self::internal_error().with_message("database error")
    }
}

impl From<Infallible> for JsonRpcError {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

/// Code identifying which type of error has occurred.
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON received was not a valid JSONRPC request object.
    InvalidRequest,
    /// The method does not exist / is not available.
    MethodNotFound,
    /// Invalid method parameter(s).
    InvalidParams,
    /// Internal JSONRPC error.
    InternalError,
}

impl ErrorCode {
    pub fn is_reserved(code: i32) -> bool {
        (-32768..=-32000).contains(&code)
    }
}

impl From<ErrorCode> for i32 {
    fn from(error_code: ErrorCode) -> Self {
        match error_code {
            ErrorCode::ParseError => error_codes::standard::PARSE_ERROR,
            ErrorCode::InvalidRequest => error_codes::standard::INVALID_REQUEST,
            ErrorCode::MethodNotFound => error_codes::standard::METHOD_NOT_FOUND,
            ErrorCode::InvalidParams => error_codes::standard::INVALID_PARAMS,
            ErrorCode::InternalError => error_codes::standard::INTERNAL_ERROR,
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            error_codes::standard::PARSE_ERROR => ErrorCode::ParseError,
            error_codes::standard::INVALID_REQUEST => ErrorCode::InvalidRequest,
            error_codes::standard::INTERNAL_ERROR => ErrorCode::InternalError,
            error_codes::standard::INVALID_PARAMS => ErrorCode::InvalidParams,
            error_codes::standard::METHOD_NOT_FOUND => ErrorCode::MethodNotFound,
            _ => return Err(()),
        })
    }
}

/// Parse the `params` of `request` into a method's params builder.
fn parse_params<T>(request: JsonRpcRequest) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned,
{
    serde_json::from_value(request.params)
}

fn invalid_params_serde_message(err: &serde_json::Error) -> String {
    format!("invalid format of params object: '{}'", err)
}

fn generic_invalid_value_message(param_name: &str) -> String {
    format!("invalid value of '{}'", param_name)
}

fn invalid_value_because_message(param_name: &str, clarification: String) -> String {
    format!(
        "{}, {}",
        generic_invalid_value_message(param_name),
        clarification
    )
}

impl Error for JsonRpcError {}

impl Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}
