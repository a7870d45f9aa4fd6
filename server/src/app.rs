use crate::{
    auth::{TokenHandler, UserClaims},
    controller::{
        ItemController, ListController, ListItemController, StatusController, UserController,
    },
    Opts,
};
use database::{ordering::OrderingError, Database, DatabaseError, PgPool};
use model::*;
use std::{
    error::Error,
    fmt::{Debug, Display},
    str::FromStr,
};

pub type AppResult<T> = Result<T, AppError>;

pub struct App {
    list_controller: ListController,
    item_controller: ItemController,
    list_item_controller: ListItemController<Database<database::ListItem>>,
    status_controller: StatusController,
    user_controller: UserController,
}

impl App {
    pub fn new(pool: PgPool, opts: &Opts, tokens: TokenHandler) -> Self {
        Self {
            list_controller: ListController::new(Database::new(pool.clone())),
            item_controller: ItemController::new(Database::new(pool.clone())),
            list_item_controller: ListItemController::new(
                Database::new(pool.clone()),
                opts.conflict_retries,
            ),
            status_controller: StatusController::new(Database::new(pool.clone())),
            user_controller: UserController::new(
                Database::new(pool.clone()),
                Database::new(pool),
                tokens,
            ),
        }
    }

    /// Handle a single JSON RPC request
    pub async fn handle_single(
        &self,
        request: JsonRpcRequest,
        claims: &Option<UserClaims>,
    ) -> JsonRpcResponse {
        let timer = std::time::Instant::now();
        let id = request.id.clone();
        let method = request.method.to_owned();
        info!(
            "handling request with id {:?} with method: '{}'",
            id, request.method
        );

        let result = match Method::from_str(&method) {
            Err(_) => Err(AppError::from(JsonRpcError::method_not_found())),
            Ok(method) => {
                trace!("request: {:?}", request);
                match (method.is_anonymous(), claims) {
                    (false, None) => Err(AppError::not_permitted()),
                    (_, claims) => self.dispatch(method, request, claims, id.clone()).await,
                }
            }
        };

        info!(
            "handled request with id {:?} and method: '{}' in {:?}",
            id,
            method,
            timer.elapsed()
        );

        match result {
            Ok(response) => response,
            Err(err) => {
                if err.context.is_some() {
                    error!("error with context: {:?}", err);
                }
                JsonRpcResponse::error(err.rpc_error, id)
            }
        }
    }

    async fn dispatch(
        &self,
        method: Method,
        request: JsonRpcRequest,
        claims: &Option<UserClaims>,
        id: Option<String>,
    ) -> AppResult<JsonRpcResponse> {
        match (method, claims) {
            (Method::RegisterUser, _) => self
                .user_controller
                .register_user(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::GetToken, _) => self
                .user_controller
                .get_token(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::RefreshToken, _) => self
                .user_controller
                .refresh_token(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::Logout, Some(claims)) => self
                .user_controller
                .logout(request, claims)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::GetUser, Some(claims)) => self
                .user_controller
                .get_user(request, claims)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::GetLists, Some(claims)) => self
                .list_controller
                .get_lists(request, claims)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::DeleteList, Some(claims)) => self
                .list_controller
                .delete_list(request, claims)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::AddList, Some(claims)) => self
                .list_controller
                .add_list(request, claims)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::AddItem, Some(_)) => self
                .item_controller
                .add_item(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::AddStatus, Some(claims)) => self
                .status_controller
                .add_status(request, claims)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::AddListItem, Some(_)) => self
                .list_item_controller
                .add_list_item(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::RemoveListItem, Some(_)) => self
                .list_item_controller
                .remove_list_item(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::MoveListItem, Some(_)) => self
                .list_item_controller
                .move_list_item(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::MoveListItemToList, Some(_)) => self
                .list_item_controller
                .move_list_item_to_list(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::GetListItems, Some(_)) => self
                .list_item_controller
                .get_list_items(request)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (Method::SetListItemStatus, Some(claims)) => self
                .status_controller
                .set_list_item_status(request, claims)
                .await
                .map(|result| JsonRpcResponse::success(result, id)),
            (_, None) => Err(AppError::not_permitted()),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub rpc_error: JsonRpcError,
    pub context: Option<String>,
}

impl AppError {
    pub fn with_context<T>(mut self, value: &T) -> Self
    where
        T: Debug,
    {
        self.context = Some(format!("{:?}", value));
        self
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.rpc_error.message = message.to_owned();
        self
    }

    pub fn invalid_request() -> Self {
        Self::from(JsonRpcError::invalid_request())
    }

    pub fn invalid_params() -> Self {
        Self::from(JsonRpcError::invalid_params())
    }

    pub fn internal_error() -> Self {
        Self::from(JsonRpcError::internal_error())
    }

    pub fn database_error() -> Self {
        Self::from(JsonRpcError::database_error())
    }

    pub fn not_found() -> Self {
        Self::from(JsonRpcError::not_found())
    }

    pub fn not_permitted() -> Self {
        Self::from(JsonRpcError::not_permitted())
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rpc_error.message)
    }
}

impl Error for AppError {}

impl From<JsonRpcError> for AppError {
    fn from(rpc_error: JsonRpcError) -> Self {
        Self {
            rpc_error,
            context: None,
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(db_error: DatabaseError) -> Self {
        AppError::database_error().with_context(&db_error)
    }
}

impl From<OrderingError> for AppError {
    fn from(ordering_error: OrderingError) -> Self {
        match &ordering_error {
            OrderingError::NotFound(_) => {
                AppError::not_found().with_message(&ordering_error.to_string())
            }
            OrderingError::InvalidPosition { .. } => {
                AppError::invalid_params().with_message(&ordering_error.to_string())
            }
            OrderingError::ConflictRetryable => AppError::from(JsonRpcError::conflict()),
            OrderingError::StoreUnavailable(context) => {
                AppError::database_error().with_context(context)
            }
        }
    }
}

impl From<hyper::http::Error> for AppError {
    fn from(e: hyper::http::Error) -> Self {
        AppError::internal_error().with_context(&e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::internal_error().with_context(&e)
    }
}

pub trait ParamsError: Error {}

impl<T> From<T> for AppError
where
    T: ParamsError,
{
    fn from(err: T) -> Self {
        AppError::invalid_params()
            .with_message(&err.to_string())
            .with_context(&err)
    }
}
