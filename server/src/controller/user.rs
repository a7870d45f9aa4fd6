use crate::{
    app::{AppError, AppResult, ParamsError},
    auth::{TokenHandler, UserClaims},
};
use database::{InsertionResult, RefreshTokenDatabase, UserDatabase};
use model::{
    user::{get_token, get_user, logout, refresh_token, register_user},
    JsonRpcRequest,
};
use std::convert::TryFrom;
use time::{ext::NumericalDuration, OffsetDateTime};
use uuid::Uuid;

pub struct UserController {
    user_db: UserDatabase,
    token_db: RefreshTokenDatabase,
    token_handler: TokenHandler,
}

impl UserController {
    pub fn new(
        user_db: UserDatabase,
        token_db: RefreshTokenDatabase,
        token_handler: TokenHandler,
    ) -> Self {
        Self {
            user_db,
            token_db,
            token_handler,
        }
    }

    pub async fn register_user(
        &self,
        request: JsonRpcRequest,
    ) -> AppResult<register_user::MethodResult> {
        use register_user::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let result = self
            .user_db
            .register_user(&params.username, &params.email, &params.password)
            .await?;

        match result {
            InsertionResult::Inserted(uuid) => {
                info!("registered user '{}' as '{}'", params.username, uuid);
                Ok(MethodResult::success(uuid))
            }
            InsertionResult::AlreadyExists => Ok(MethodResult::failure()),
        }
    }

    pub async fn get_token(&self, request: JsonRpcRequest) -> AppResult<get_token::MethodResult> {
        use get_token::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let row = self
            .user_db
            .validate_user(&params.login, &params.password)
            .await?
            .ok_or_else(|| AppError::not_permitted().with_message("invalid login or password"))?;
        let user = UserClaims::from(row);
        info!("{} successfully logged in", user.uuid);

        let (token, expires_at) = self.access_token(user)?;
        let refresh = self
            .token_db
            .insert_refresh_token(user.uuid)
            .await?
            .ok_or_else(|| AppError::not_found().with_message("user does not exist"))?;

        Ok(MethodResult::new(
            token,
            expires_at.unix_timestamp(),
            refresh.token,
            refresh.expires_at.unix_timestamp(),
        ))
    }

    pub async fn refresh_token(
        &self,
        request: JsonRpcRequest,
    ) -> AppResult<refresh_token::MethodResult> {
        use refresh_token::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let row = self
            .token_db
            .validate_refresh_token(&params.refresh_token)
            .await?
            .ok_or_else(|| {
                AppError::not_permitted().with_message("refresh token is invalid or expired")
            })?;
        let user = UserClaims::from(row);
        debug!("renewing access token of {}", user.uuid);

        let (token, expires_at) = self.access_token(user)?;
        Ok(MethodResult::new(token, expires_at.unix_timestamp()))
    }

    pub async fn logout(
        &self,
        request: JsonRpcRequest,
        claims: &UserClaims,
    ) -> AppResult<logout::MethodResult> {
        use logout::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let logged_out = self
            .token_db
            .delete_refresh_token(&params.refresh_token, claims.uuid)
            .await?;
        if logged_out {
            info!("{} logged out", claims.uuid);
        } else {
            info!("{} is already logged out", claims.uuid);
        }

        Ok(MethodResult::new(logged_out))
    }

    pub async fn get_user(
        &self,
        request: JsonRpcRequest,
        claims: &UserClaims,
    ) -> AppResult<get_user::MethodResult> {
        use get_user::{MethodResult, Params};
        let params = Params::try_from(request)?;
        let uuid = user_to_look_up(params.id, claims)?;

        let user = self
            .user_db
            .get_user(uuid)
            .await?
            .ok_or_else(|| AppError::not_found().with_message("user does not exist"))?;

        Ok(MethodResult::new(
            user.uuid,
            user.username,
            user.email,
            user.superuser,
            user.created_date.unix_timestamp(),
        ))
    }

    fn access_token(&self, user: UserClaims) -> AppResult<(String, OffsetDateTime)> {
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(1.hours())
            .ok_or_else(|| {
                AppError::internal_error()
                    .with_context(&"failed to add 1 hour to current timestamp".to_string())
            })?;
        let token = self
            .token_handler
            .generate_token(user, expires_at)
            .map_err(|jwt_error| AppError::internal_error().with_context(&jwt_error))?;
        Ok((token, expires_at))
    }
}

/// Only superusers may look up someone other than themselves.
fn user_to_look_up(requested: Option<Uuid>, claims: &UserClaims) -> AppResult<Uuid> {
    match requested {
        None => Ok(claims.uuid),
        Some(uuid) if uuid == claims.uuid || claims.superuser => Ok(uuid),
        Some(uuid) => {
            warn!("{} is not permitted to look up {}", claims.uuid, uuid);
            Err(AppError::not_permitted())
        }
    }
}

impl ParamsError for register_user::InvalidParams {}
impl ParamsError for get_token::InvalidParams {}
impl ParamsError for refresh_token::InvalidParams {}
impl ParamsError for logout::InvalidParams {}
impl ParamsError for get_user::InvalidParams {}
