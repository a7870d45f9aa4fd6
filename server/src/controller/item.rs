use crate::app::{AppResult, ParamsError};
use database::ItemDatabase;
use model::{item::add_item, JsonRpcRequest};
use std::convert::TryFrom;

pub struct ItemController {
    item_db: ItemDatabase,
}

impl ItemController {
    pub fn new(item_db: ItemDatabase) -> Self {
        Self { item_db }
    }

    pub async fn add_item(&self, request: JsonRpcRequest) -> AppResult<add_item::MethodResult> {
        use add_item::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let item = self.item_db.insert_item(&params.title).await?;
        info!("added item '{}' with title '{}'", item.uuid, item.title);

        Ok(MethodResult::new(item.uuid, item.title))
    }
}

impl ParamsError for add_item::InvalidParams {}
