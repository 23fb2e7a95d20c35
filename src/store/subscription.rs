use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::actor::ListenerId;
use super::client::StoreClient;
use super::document::Document;
use super::query::Query;
use super::StoreError;

/// Live query handle. Dropping it (or calling [`Subscription::unsubscribe`])
/// stops the callback and deregisters the listener from the store.
#[derive(Debug)]
pub struct Subscription {
    id: ListenerId,
    store: StoreClient,
    task: JoinHandle<()>,
    registered: bool,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Stop the callback and wait until the store has accepted the deregistration.
    pub async fn unsubscribe(mut self) -> Result<(), StoreError> {
        debug!(listener_id = self.id, "Unsubscribing");
        self.task.abort();
        self.registered = false;
        self.store.unlisten(self.id).await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
        if self.registered {
            self.store.unlisten_now(self.id);
        }
    }
}

impl StoreClient {
    /// Invoke `callback` with the decoded result set of `query` now and after
    /// every change to the queried collection.
    pub async fn subscribe<T, F>(&self, query: Query, mut callback: F) -> Result<Subscription, StoreError>
    where
        T: Document,
        F: FnMut(Vec<T>) + Send + 'static,
    {
        let (id, mut receiver) = self.listen(query).await?;

        let task = tokio::spawn(async move {
            while let Some(snapshots) = receiver.recv().await {
                let documents = snapshots
                    .iter()
                    .filter_map(|snapshot| match snapshot.decode::<T>() {
                        Ok(document) => Some(document),
                        Err(e) => {
                            warn!(error = %e, "Skipping undecodable document");
                            None
                        }
                    })
                    .collect();
                callback(documents);
            }
        });

        Ok(Subscription {
            id,
            store: self.clone(),
            task,
            registered: true,
        })
    }
}
