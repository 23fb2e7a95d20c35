use chrono::{DateTime, Utc};
use serde_json::{json, Map};
use tracing::{debug, info, instrument};

use crate::domain::Category;
use crate::error::CategoryError;
use crate::store::{Direction, Document, Query, StoreClient, StoreError, Subscription};

/// Client for the `categories` collection.
#[derive(Debug, Clone)]
pub struct CategoryClient {
    store: StoreClient,
}

impl_basic_client!(CategoryClient, Category, CategoryError, category);
impl_client_delete!(CategoryClient, Category, CategoryError, category);

fn newest_first() -> Query {
    Query::collection(Category::COLLECTION).order_by("createdAt", Direction::Descending)
}

impl CategoryClient {
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, CategoryError> {
        debug!("Sending request");
        Ok(self.store.query_as(newest_first()).await?)
    }

    pub async fn subscribe_categories<F>(&self, callback: F) -> Result<Subscription, CategoryError>
    where
        F: FnMut(Vec<Category>) + Send + 'static,
    {
        Ok(self.store.subscribe(newest_first(), callback).await?)
    }

    #[instrument(skip(self, category), fields(category_id = %category.id))]
    pub async fn create_category(&self, category: &Category) -> Result<(), CategoryError> {
        debug!("Sending request");
        self.store.create(category).await?;
        info!(name = %category.name, "Category created");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn rename_category(
        &self,
        id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CategoryError> {
        debug!("Sending request");
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        fields.insert("updatedAt".to_string(), json!(now.timestamp_millis()));

        match self.store.update(Category::path_for(id), fields).await {
            Ok(()) => {
                info!("Category renamed");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => Err(CategoryError::NotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreActor;
    use tokio::sync::mpsc;

    fn spawn_client() -> CategoryClient {
        let (actor, store) = StoreActor::new(16);
        tokio::spawn(actor.run());
        CategoryClient::new(store)
    }

    fn names(categories: Vec<Category>) -> Vec<String> {
        categories.into_iter().map(|category| category.name).collect()
    }

    #[tokio::test]
    async fn subscription_tracks_create_rename_and_delete() {
        let client = spawn_client();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = client
            .subscribe_categories(move |categories| {
                let _ = tx.send(categories);
            })
            .await
            .unwrap();
        assert!(rx.recv().await.unwrap().is_empty());

        let now = crate::domain::now();
        client.create_category(&Category::new("c1", "Taps", now)).await.unwrap();
        assert_eq!(names(rx.recv().await.unwrap()), vec!["Taps".to_string()]);

        let later = now + chrono::Duration::seconds(1);
        client.create_category(&Category::new("c2", "Showers", later)).await.unwrap();
        assert_eq!(
            names(rx.recv().await.unwrap()),
            vec!["Showers".to_string(), "Taps".to_string()]
        );

        client.rename_category("c1", "Basin Taps", later).await.unwrap();
        assert_eq!(
            names(rx.recv().await.unwrap()),
            vec!["Showers".to_string(), "Basin Taps".to_string()]
        );

        client.delete_category("c2").await.unwrap();
        assert_eq!(names(rx.recv().await.unwrap()), vec!["Basin Taps".to_string()]);
    }

    #[tokio::test]
    async fn renaming_missing_category_is_not_found() {
        let client = spawn_client();

        assert_eq!(
            client.rename_category("ghost", "Taps", crate::domain::now()).await,
            Err(CategoryError::NotFound("ghost".to_string()))
        );
    }
}
