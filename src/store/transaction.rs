use std::collections::BTreeMap;
use std::future::Future;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::client::StoreClient;
use super::document::{encode, DocPath, Document, DocumentSnapshot, Expected, Precondition, Write};
use super::StoreError;

/// An optimistic transaction: reads record the version they saw, writes are
/// buffered, and `commit` applies the writes only if none of the read
/// documents changed in the meantime.
///
/// All reads must happen before the first write is staged.
#[derive(Debug)]
pub struct Transaction {
    store: StoreClient,
    reads: BTreeMap<DocPath, Expected>,
    creates: Vec<DocPath>,
    writes: Vec<Write>,
}

impl Transaction {
    pub fn new(store: StoreClient) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            creates: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub async fn get(&mut self, path: &DocPath) -> Result<Option<DocumentSnapshot>, StoreError> {
        if !self.writes.is_empty() {
            return Err(StoreError::InvalidTransaction(
                "all reads must be executed before writes".to_string(),
            ));
        }

        let snapshot = self.store.get(path.clone()).await?;
        let seen = match &snapshot {
            Some(snapshot) => Expected::Version(snapshot.version),
            None => Expected::Missing,
        };
        self.reads.entry(path.clone()).or_insert(seen);

        Ok(snapshot)
    }

    pub async fn get_as<T: Document>(&mut self, id: &str) -> Result<Option<T>, StoreError> {
        self.get(&T::path_for(id))
            .await?
            .map(|snapshot| snapshot.decode())
            .transpose()
    }

    pub fn set(&mut self, path: DocPath, data: Value) {
        self.writes.push(Write::Set { path, data });
    }

    /// Stage `document`; the commit fails if anything already exists at its path.
    pub fn create<T: Document>(&mut self, document: &T) -> Result<(), StoreError> {
        let path = document.path();
        self.creates.push(path.clone());
        self.set(path, encode(document)?);
        Ok(())
    }

    pub fn update(&mut self, path: DocPath, fields: Map<String, Value>) {
        self.writes.push(Write::Update { path, fields });
    }

    pub fn delete(&mut self, path: DocPath) {
        self.writes.push(Write::Delete { path });
    }

    #[instrument(skip(self), fields(reads = self.reads.len(), writes = self.writes.len()))]
    pub async fn commit(self) -> Result<u64, StoreError> {
        let mut preconditions: Vec<Precondition> = self
            .reads
            .into_iter()
            .map(|(path, expected)| Precondition { path, expected })
            .collect();
        preconditions.extend(self.creates.into_iter().map(Precondition::missing));

        self.store.commit(preconditions, self.writes).await
    }
}

impl StoreClient {
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    /// Run `body` inside a transaction, re-running it from scratch on a version
    /// conflict. At most `max_attempts` runs are made; the last conflict is
    /// returned once they are used up. Errors from `body` itself abort at once
    /// without writing anything.
    pub async fn run_transaction<F, Fut, T, E>(&self, max_attempts: u32, mut body: F) -> Result<T, E>
    where
        F: FnMut(Transaction) -> Fut,
        Fut: Future<Output = Result<(Transaction, T), E>>,
        E: From<StoreError>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let (transaction, value) = body(self.transaction()).await?;

            match transaction.commit().await {
                Ok(version) => {
                    debug!(attempt, version, "Transaction committed");
                    return Ok(value);
                }
                Err(StoreError::Conflict(path)) if attempt < max_attempts => {
                    warn!(attempt, path = %path, "Transaction conflict, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreActor;
    use serde_json::json;

    fn spawn_store() -> StoreClient {
        let (actor, client) = StoreActor::new(16);
        tokio::spawn(actor.run());
        client
    }

    fn stock_of(snapshot: &Option<DocumentSnapshot>) -> i64 {
        snapshot
            .as_ref()
            .and_then(|s| s.data["stock"].as_i64())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn reads_after_writes_are_rejected() {
        let store = spawn_store();
        let mut tx = store.transaction();
        tx.set(DocPath::new("products", "p1"), json!({}));

        let result = tx.get(&DocPath::new("products", "p1")).await;

        assert!(matches!(result, Err(StoreError::InvalidTransaction(_))));
    }

    #[tokio::test]
    async fn concurrent_write_between_read_and_commit_conflicts() {
        let store = spawn_store();
        let path = DocPath::new("products", "p1");
        store.set(path.clone(), json!({ "stock": 3 })).await.unwrap();

        let mut tx = store.transaction();
        let seen = tx.get(&path).await.unwrap();
        store.set(path.clone(), json!({ "stock": 1 })).await.unwrap();

        let mut fields = Map::new();
        fields.insert("stock".to_string(), json!(stock_of(&seen) - 1));
        tx.update(path.clone(), fields);

        assert_eq!(tx.commit().await, Err(StoreError::Conflict("products/p1".to_string())));
        assert_eq!(stock_of(&store.get(path).await.unwrap()), 1);
    }

    #[tokio::test]
    async fn run_transaction_retries_after_conflict() {
        let store = spawn_store();
        let path = DocPath::new("products", "p1");
        store.set(path.clone(), json!({ "stock": 3 })).await.unwrap();

        let mut runs = 0;
        let interfering = store.clone();
        let result: Result<i64, StoreError> = store
            .run_transaction(3, |mut tx| {
                runs += 1;
                let first_run = runs == 1;
                let path = path.clone();
                let interfering = interfering.clone();
                async move {
                    let stock = stock_of(&tx.get(&path).await?);
                    if first_run {
                        interfering.set(path.clone(), json!({ "stock": 10 })).await?;
                    }
                    let mut fields = Map::new();
                    fields.insert("stock".to_string(), json!(stock - 1));
                    tx.update(path, fields);
                    Ok::<_, StoreError>((tx, stock - 1))
                }
            })
            .await;

        assert_eq!(result, Ok(9));
        assert_eq!(runs, 2);
    }

    #[tokio::test]
    async fn run_transaction_gives_up_after_budget() {
        let store = spawn_store();
        let path = DocPath::new("products", "p1");
        store.set(path.clone(), json!({ "stock": 3 })).await.unwrap();

        let interfering = store.clone();
        let result: Result<(), StoreError> = store
            .run_transaction(2, |mut tx| {
                let path = path.clone();
                let interfering = interfering.clone();
                async move {
                    tx.get(&path).await?;
                    interfering.set(path.clone(), json!({ "stock": 3 })).await?;
                    tx.delete(path);
                    Ok::<_, StoreError>((tx, ()))
                }
            })
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(store.get(path).await.unwrap().is_some());
    }
}
