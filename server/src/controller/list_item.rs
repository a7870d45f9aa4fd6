use crate::app::{AppResult, ParamsError};
use database::ordering::{ListItemRecord, ListStore, OrderedList, OrderingError, OrderingResult};
use model::{list_item::*, JsonRpcRequest};
use std::{convert::TryFrom, future::Future};

/// Position based list item methods, retrying operations that lost a race.
pub struct ListItemController<S> {
    engine: OrderedList<S>,
    conflict_retries: u32,
}

impl<S> ListItemController<S>
where
    S: ListStore,
{
    pub fn new(store: S, conflict_retries: u32) -> Self {
        Self {
            engine: OrderedList::new(store),
            conflict_retries,
        }
    }

    pub async fn add_list_item(
        &self,
        request: JsonRpcRequest,
    ) -> AppResult<add_list_item::MethodResult> {
        use add_list_item::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let record = self
            .with_retries(|| {
                self.engine
                    .insert(params.list_id, params.item_id, params.position)
            })
            .await?;

        Ok(MethodResult::new(ListItemWrapper::from(record).0))
    }

    pub async fn remove_list_item(
        &self,
        request: JsonRpcRequest,
    ) -> AppResult<remove_list_item::MethodResult> {
        use remove_list_item::{MethodResult, Params};
        let params = Params::try_from(request)?;

        info!("removing list item with id '{}'", params.id);
        self.with_retries(|| self.engine.remove(params.id)).await?;

        Ok(MethodResult::new(true))
    }

    pub async fn move_list_item(
        &self,
        request: JsonRpcRequest,
    ) -> AppResult<move_list_item::MethodResult> {
        use move_list_item::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let record = self
            .with_retries(|| self.engine.move_within_list(params.id, params.position))
            .await?;

        Ok(MethodResult::new(ListItemWrapper::from(record).0))
    }

    pub async fn move_list_item_to_list(
        &self,
        request: JsonRpcRequest,
    ) -> AppResult<move_list_item_to_list::MethodResult> {
        use move_list_item_to_list::{MethodResult, Params};
        let params = Params::try_from(request)?;

        let record = self
            .with_retries(|| {
                self.engine
                    .move_to_list(params.id, params.list_id, params.position)
            })
            .await?;

        Ok(MethodResult::new(ListItemWrapper::from(record).0))
    }

    pub async fn get_list_items(
        &self,
        request: JsonRpcRequest,
    ) -> AppResult<get_list_items::MethodResult> {
        use get_list_items::{MethodResult, Params};
        let params = Params::try_from(request)?;
        let pagination = params.pagination;

        let page = self
            .engine
            .list_items(params.list_id, pagination.offset(), pagination.limit())
            .await?;
        let list_items = page
            .records
            .into_iter()
            .map(|record| ListItemWrapper::from(record).0)
            .collect();

        Ok(MethodResult::new(
            pagination.with_total(page.total),
            list_items,
        ))
    }

    async fn with_retries<T, F, Fut>(&self, mut operation: F) -> OrderingResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = OrderingResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Err(OrderingError::ConflictRetryable) if attempt < self.conflict_retries => {
                    attempt += 1;
                    warn!(
                        "conflicting modification, retrying ({}/{})",
                        attempt, self.conflict_retries
                    );
                }
                result => return result,
            }
        }
    }
}

/// Used in order to convert from `ListItemRecord` to `model::ListItem` (orphan rule).
struct ListItemWrapper(ListItem);

impl From<ListItemRecord> for ListItemWrapper {
    fn from(record: ListItemRecord) -> Self {
        ListItemWrapper(ListItem::new(
            record.uuid,
            record.list_uuid,
            record.item_uuid,
            record.position,
            record.prev_uuid,
            record.next_uuid,
            record.status_uuid,
        ))
    }
}

impl ParamsError for add_list_item::InvalidParams {}
impl ParamsError for remove_list_item::InvalidParams {}
impl ParamsError for move_list_item::InvalidParams {}
impl ParamsError for move_list_item_to_list::InvalidParams {}
impl ParamsError for get_list_items::InvalidParams {}

#[cfg(test)]
mod tests {
    use super::*;
    use database::ordering::MemoryStore;
    use model::error_codes::{application, standard};
    use serde_json::{json, Value};
    use uuid::Uuid;

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(method.to_string(), params, Some("1".to_string())).unwrap()
    }

    async fn controller_with_list(
        len: usize,
    ) -> (ListItemController<MemoryStore>, Uuid, Vec<ListItem>) {
        let store = MemoryStore::new();
        let list = store.add_list().await;
        let controller = ListItemController::new(store.clone(), 3);
        let mut placed = Vec::new();
        for position in 0..len {
            let item = store.add_item().await;
            let result = controller
                .add_list_item(request(
                    "add_list_item",
                    json!({ "list_id": list, "item_id": item, "position": position }),
                ))
                .await
                .unwrap();
            placed.push(result.list_item);
        }
        (controller, list, placed)
    }

    #[tokio::test]
    async fn add_and_page_through_list() {
        let (controller, list, placed) = controller_with_list(3).await;

        let result = controller
            .get_list_items(request(
                "get_list_items",
                json!({ "list_id": list, "page": 2, "page_size": 2 }),
            ))
            .await
            .unwrap();

        assert_eq!(result.pagination.total, 3);
        assert_eq!(result.list_items.len(), 1);
        assert_eq!(result.list_items[0].id, placed[2].id);
        assert_eq!(result.list_items[0].prev_id, Some(placed[1].id));
    }

    #[tokio::test]
    async fn move_to_front() {
        let (controller, list, placed) = controller_with_list(3).await;

        let moved = controller
            .move_list_item(request(
                "move_list_item",
                json!({ "id": placed[2].id, "position": 0 }),
            ))
            .await
            .unwrap()
            .list_item;

        assert_eq!(moved.position, 0);
        assert_eq!(moved.prev_id, None);
        assert_eq!(moved.next_id, Some(placed[0].id));
        let page = controller
            .get_list_items(request("get_list_items", json!({ "list_id": list })))
            .await
            .unwrap();
        let order: Vec<Uuid> = page.list_items.iter().map(|li| li.id).collect();
        assert_eq!(order, vec![placed[2].id, placed[0].id, placed[1].id]);
    }

    #[tokio::test]
    async fn out_of_range_is_invalid_params() {
        let (controller, _, placed) = controller_with_list(2).await;

        let error = controller
            .move_list_item(request(
                "move_list_item",
                json!({ "id": placed[0].id, "position": 2 }),
            ))
            .await
            .unwrap_err();

        assert_eq!(error.rpc_error.code, standard::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn removing_twice_is_not_found() {
        let (controller, _, placed) = controller_with_list(1).await;
        let remove = || request("remove_list_item", json!({ "id": placed[0].id }));

        assert!(controller.remove_list_item(remove()).await.unwrap().removed);
        let error = controller.remove_list_item(remove()).await.unwrap_err();

        assert_eq!(error.rpc_error.code, application::ITEM_DOES_NOT_EXIST);
    }

    #[tokio::test]
    async fn move_to_unknown_list() {
        let (controller, _, placed) = controller_with_list(1).await;

        let error = controller
            .move_list_item_to_list(request(
                "move_list_item_to_list",
                json!({ "id": placed[0].id, "list_id": Uuid::new_v4(), "position": 0 }),
            ))
            .await
            .unwrap_err();

        assert_eq!(error.rpc_error.code, application::ITEM_DOES_NOT_EXIST);
    }

    #[tokio::test]
    async fn conflicts_are_retried() {
        let (controller, _, _) = controller_with_list(0).await;
        let mut calls = 0;

        let result: OrderingResult<()> = controller
            .with_retries(|| {
                calls += 1;
                let outcome = if calls < 3 {
                    Err(OrderingError::ConflictRetryable)
                } else {
                    Ok(())
                };
                async move { outcome }
            })
            .await;

        assert_eq!(result, Ok(()));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn retries_run_out() {
        let (controller, _, _) = controller_with_list(0).await;
        let mut calls = 0;

        let result: OrderingResult<()> = controller
            .with_retries(|| {
                calls += 1;
                async { Err(OrderingError::ConflictRetryable) }
            })
            .await;

        assert_eq!(result, Err(OrderingError::ConflictRetryable));
        assert_eq!(calls, 4);
    }
}
