use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::domain::Product;
use crate::error::ProductError;
use crate::store::{encode, Direction, Document, Query, StoreClient, Subscription};

/// Client for the `products` collection.
#[derive(Debug, Clone)]
pub struct ProductClient {
    store: StoreClient,
}

impl_basic_client!(ProductClient, Product, ProductError, product);
impl_client_delete!(ProductClient, Product, ProductError, product);

const UPDATE_ATTEMPTS: u32 = 3;

fn newest_first() -> Query {
    Query::collection(Product::COLLECTION).order_by("createdAt", Direction::Descending)
}

fn featured_newest_first() -> Query {
    newest_first().where_eq("featured", true)
}

impl ProductClient {
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ProductError> {
        debug!("Sending request");
        Ok(self.store.query_as(newest_first()).await?)
    }

    #[instrument(skip(self))]
    pub async fn featured_products(&self) -> Result<Vec<Product>, ProductError> {
        debug!("Sending request");
        Ok(self.store.query_as(featured_newest_first()).await?)
    }

    pub async fn subscribe_products<F>(&self, callback: F) -> Result<Subscription, ProductError>
    where
        F: FnMut(Vec<Product>) + Send + 'static,
    {
        Ok(self.store.subscribe(newest_first(), callback).await?)
    }

    pub async fn subscribe_featured<F>(&self, callback: F) -> Result<Subscription, ProductError>
    where
        F: FnMut(Vec<Product>) + Send + 'static,
    {
        Ok(self.store.subscribe(featured_newest_first(), callback).await?)
    }

    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn create_product(&self, product: &Product) -> Result<(), ProductError> {
        debug!("Sending request");
        self.store.create(product).await?;
        info!(name = %product.name, "Product created");
        Ok(())
    }

    /// Replace an existing product with `product`. Only `createdAt` is carried
    /// over from the stored document; cleared optional fields are removed.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn update_product(&self, product: &Product) -> Result<(), ProductError> {
        debug!("Sending request");
        let path = product.path();
        let Value::Object(data) = encode(product)? else {
            return Err(ProductError::ValidationError("product must encode to an object".to_string()));
        };

        self.store
            .run_transaction(UPDATE_ATTEMPTS, |mut tx| {
                let path = path.clone();
                let mut data = data.clone();
                async move {
                    let existing = tx
                        .get(&path)
                        .await?
                        .ok_or_else(|| ProductError::NotFound(path.id.clone()))?;
                    if let Some(created_at) = existing.data.get("createdAt") {
                        data.insert("createdAt".to_string(), created_at.clone());
                    }
                    tx.set(path, Value::Object(data));
                    Ok::<_, ProductError>((tx, ()))
                }
            })
            .await?;

        info!("Product updated");
        Ok(())
    }
}
