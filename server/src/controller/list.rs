use crate::{
    app::{AppError, AppResult, ParamsError},
    auth::UserClaims,
};
use database::ListDatabase;
use model::{
    list::{add_list, delete_list, get_lists},
    JsonRpcRequest,
};
use std::convert::TryFrom;

pub struct ListController {
    list_db: ListDatabase,
}

impl ListController {
    pub fn new(list_db: ListDatabase) -> Self {
        Self { list_db }
    }

    pub async fn add_list(
        &self,
        request: JsonRpcRequest,
        claims: &UserClaims,
    ) -> AppResult<add_list::MethodResult> {
        use add_list::{MethodResult, Params};
        let params = Params::try_from(request)?;

        match self.list_db.insert_list(&params.name, claims.uuid).await? {
            Some(list) => {
                info!("user '{}' added list '{}'", claims.uuid, list.uuid);
                Ok(MethodResult::new(list.uuid, list.name))
            }
            None => Err(AppError::not_found()
                .with_message("user does not exist")
                .with_context(&claims.uuid)),
        }
    }

    pub async fn get_lists(
        &self,
        request: JsonRpcRequest,
        claims: &UserClaims,
    ) -> AppResult<get_lists::MethodResult> {
        use get_lists::{List, MethodResult, Params};
        let _params = Params::try_from(request)?;

        let lists = self
            .list_db
            .get_lists_for_user(claims.uuid)
            .await?
            .into_iter()
            .map(|list| List::new(list.uuid, list.name))
            .collect();

        Ok(MethodResult::new(lists))
    }

    pub async fn delete_list(
        &self,
        request: JsonRpcRequest,
        claims: &UserClaims,
    ) -> AppResult<delete_list::MethodResult> {
        use delete_list::{MethodResult, Params};
        let params = Params::try_from(request)?;

        if self.list_db.delete_list(params.id, claims.uuid).await? {
            info!("user '{}' deleted list '{}'", claims.uuid, params.id);
            Ok(MethodResult::new(true))
        } else {
            Err(AppError::not_found()
                .with_message("list does not exist")
                .with_context(&params.id))
        }
    }
}

impl ParamsError for add_list::InvalidParams {}
impl ParamsError for get_lists::InvalidParams {}
impl ParamsError for delete_list::InvalidParams {}
