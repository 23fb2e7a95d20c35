use chrono::{DateTime, Utc};
use serde_json::{json, Map};
use tracing::{debug, info, instrument, warn};

use crate::checkout::is_order_id;
use crate::domain::{Order, OrderStatus};
use crate::error::OrderError;
use crate::store::{Direction, Document, Query, StoreClient, StoreError, Subscription};

/// Client for the `orders` collection.
///
/// Orders are only ever created by checkout, inside its own transaction, so
/// this client has no create method.
#[derive(Debug, Clone)]
pub struct OrderClient {
    store: StoreClient,
}

impl_basic_client!(OrderClient, Order, OrderError, order);

fn newest_first() -> Query {
    Query::collection(Order::COLLECTION).order_by("createdAt", Direction::Descending)
}

fn for_user(uid: &str) -> Query {
    newest_first().where_eq("userId", uid)
}

fn single(id: &str) -> Query {
    Query::document(&Order::path_for(id)).limit(1)
}

/// Customers may only see orders placed under their own uid.
fn owned_by(order: Option<Order>, id: &str, uid: &str) -> Result<Order, OrderError> {
    let order = order.ok_or_else(|| OrderError::NotFound(id.to_string()))?;
    if order.user_id.as_deref() != Some(uid) {
        return Err(OrderError::Forbidden(id.to_string()));
    }
    Ok(order)
}

impl OrderClient {
    /// Collision check used while allocating order ids.
    #[instrument(skip(self))]
    pub async fn order_exists(&self, id: &str) -> Result<bool, OrderError> {
        debug!("Sending request");
        Ok(self.store.get(Order::path_for(id)).await?.is_some())
    }

    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, OrderError> {
        debug!("Sending request");
        Ok(self.store.query_as(newest_first()).await?)
    }

    #[instrument(skip(self))]
    pub async fn orders_for_user(&self, uid: &str) -> Result<Vec<Order>, OrderError> {
        debug!("Sending request");
        Ok(self.store.query_as(for_user(uid)).await?)
    }

    pub async fn subscribe_user_orders<F>(&self, uid: &str, callback: F) -> Result<Subscription, OrderError>
    where
        F: FnMut(Vec<Order>) + Send + 'static,
    {
        Ok(self.store.subscribe(for_user(uid), callback).await?)
    }

    /// Order detail for the signed-in customer `uid`.
    #[instrument(skip(self))]
    pub async fn order_for_user(&self, id: &str, uid: &str) -> Result<Order, OrderError> {
        if !is_order_id(id) {
            return Err(OrderError::NotFound(id.to_string()));
        }
        debug!("Sending request");
        let order = self.get_order(id).await?;
        owned_by(order, id, uid).inspect_err(|e| warn!(error = %e, "Order detail refused"))
    }

    /// Live view of one order. The callback gets `None` while the order does not exist.
    pub async fn subscribe_order<F>(&self, id: &str, mut callback: F) -> Result<Subscription, OrderError>
    where
        F: FnMut(Option<Order>) + Send + 'static,
    {
        Ok(self
            .store
            .subscribe(single(id), move |orders: Vec<Order>| callback(orders.into_iter().next()))
            .await?)
    }

    /// Live order detail for customer `uid`, with the same checks as [`Self::order_for_user`]
    /// applied to every delivery.
    pub async fn subscribe_user_order<F>(
        &self,
        id: &str,
        uid: &str,
        mut callback: F,
    ) -> Result<Subscription, OrderError>
    where
        F: FnMut(Result<Order, OrderError>) + Send + 'static,
    {
        let (id_owned, uid) = (id.to_string(), uid.to_string());
        self.subscribe_order(id, move |order| callback(owned_by(order, &id_owned, &uid)))
            .await
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn set_status(
        &self,
        id: &str,
        status: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        debug!("Sending request");
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!(status));
        fields.insert("updatedAt".to_string(), json!(now.timestamp_millis()));

        match self.store.update(Order::path_for(id), fields).await {
            Ok(()) => {
                info!("Order status updated");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(OrderError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
