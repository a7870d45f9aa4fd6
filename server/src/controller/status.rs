use crate::{
    app::{AppError, AppResult, ParamsError},
    auth::UserClaims,
};
use database::StatusDatabase;
use model::{list_item::set_list_item_status, status::add_status, JsonRpcRequest};
use std::convert::TryFrom;

pub struct StatusController {
    status_db: StatusDatabase,
}

impl StatusController {
    pub fn new(status_db: StatusDatabase) -> Self {
        Self { status_db }
    }

    pub async fn add_status(
        &self,
        request: JsonRpcRequest,
        claims: &UserClaims,
    ) -> AppResult<add_status::MethodResult> {
        use add_status::{MethodResult, Params};
        let params = Params::try_from(request)?;

        match self.status_db.insert_status(&params.label, claims.uuid).await? {
            Some(status) => Ok(MethodResult::new(status.uuid, status.label)),
            None => Err(AppError::not_found()
                .with_message("user does not exist")
                .with_context(&claims.uuid)),
        }
    }

    pub async fn set_list_item_status(
        &self,
        request: JsonRpcRequest,
        claims: &UserClaims,
    ) -> AppResult<set_list_item_status::MethodResult> {
        use set_list_item_status::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let updated = self
            .status_db
            .set_list_item_status(params.id, params.status_id, claims.uuid)
            .await?;
        if !updated {
            info!(
                "no list item '{}' or status '{:?}' to update",
                params.id, params.status_id
            );
        }

        Ok(MethodResult::new(updated))
    }
}

impl ParamsError for add_status::InvalidParams {}
impl ParamsError for set_list_item_status::InvalidParams {}
