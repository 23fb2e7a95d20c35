use std::collections::{BTreeSet, HashMap};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use super::client::StoreClient;
use super::document::{DocPath, DocumentSnapshot, Precondition, Write};
use super::query::Query;
use super::StoreError;

// =============================================================================
// MESSAGES
// =============================================================================

pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;
pub type ListenerId = u64;
pub type SnapshotSender = mpsc::UnboundedSender<Vec<DocumentSnapshot>>;
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Vec<DocumentSnapshot>>;

#[derive(Debug)]
pub enum StoreRequest {
    Get {
        path: DocPath,
        respond_to: Response<Option<DocumentSnapshot>>,
    },
    Query {
        query: Query,
        respond_to: Response<Vec<DocumentSnapshot>>,
    },
    /// Apply `writes` atomically if every precondition holds. Replies with the commit version.
    Commit {
        preconditions: Vec<Precondition>,
        writes: Vec<Write>,
        respond_to: Response<u64>,
    },
    Listen {
        query: Query,
        sender: SnapshotSender,
        respond_to: Response<ListenerId>,
    },
    Unlisten {
        id: ListenerId,
    },
    Shutdown,
    #[cfg(test)]
    GetListenerCount {
        respond_to: Response<usize>,
    },
}

// =============================================================================
// THE ACTOR
// =============================================================================

#[derive(Debug)]
struct StoredDocument {
    version: u64,
    data: Value,
}

#[derive(Debug)]
struct Listener {
    query: Query,
    sender: SnapshotSender,
}

/// Owns every collection. Requests are handled one at a time, so a commit is
/// applied without any other request observing a partial state.
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    collections: HashMap<String, HashMap<String, StoredDocument>>,
    listeners: HashMap<ListenerId, Listener>,
    next_version: u64,
    next_listener_id: ListenerId,
}

impl StoreActor {
    pub fn new(buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            collections: HashMap::new(),
            listeners: HashMap::new(),
            next_version: 0,
            next_listener_id: 1,
        };
        (actor, StoreClient::new(sender))
    }

    #[instrument(name = "document_store", skip(self))]
    pub async fn run(mut self) {
        info!("DocumentStore starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Get { path, respond_to } => self.handle_get(path, respond_to),
                StoreRequest::Query { query, respond_to } => self.handle_query(query, respond_to),
                StoreRequest::Commit {
                    preconditions,
                    writes,
                    respond_to,
                } => self.handle_commit(preconditions, writes, respond_to),
                StoreRequest::Listen {
                    query,
                    sender,
                    respond_to,
                } => self.handle_listen(query, sender, respond_to),
                StoreRequest::Unlisten { id } => {
                    if self.listeners.remove(&id).is_some() {
                        debug!(listener_id = id, "Listener removed");
                    }
                }
                StoreRequest::Shutdown => {
                    info!("DocumentStore shutting down");
                    break;
                }
                #[cfg(test)]
                StoreRequest::GetListenerCount { respond_to } => {
                    let _ = respond_to.send(Ok(self.listeners.len()));
                }
            }
        }

        info!("DocumentStore stopped");
    }

    #[instrument(fields(path = %path), skip(self, respond_to))]
    fn handle_get(&self, path: DocPath, respond_to: Response<Option<DocumentSnapshot>>) {
        debug!("Processing get request");

        let snapshot = self
            .collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .map(|doc| DocumentSnapshot {
                path: path.clone(),
                version: doc.version,
                data: doc.data.clone(),
            });

        let _ = respond_to.send(Ok(snapshot));
    }

    #[instrument(fields(collection = %query.collection), skip(self, query, respond_to))]
    fn handle_query(&self, query: Query, respond_to: Response<Vec<DocumentSnapshot>>) {
        debug!("Processing query request");

        let snapshots = self.run_query(&query);
        debug!(result_count = snapshots.len(), "Query completed");

        let _ = respond_to.send(Ok(snapshots));
    }

    #[instrument(
        fields(preconditions = preconditions.len(), writes = writes.len()),
        skip(self, preconditions, writes, respond_to)
    )]
    fn handle_commit(
        &mut self,
        preconditions: Vec<Precondition>,
        writes: Vec<Write>,
        respond_to: Response<u64>,
    ) {
        debug!("Processing commit request");

        let result = self.apply_commit(preconditions, writes);
        match &result {
            Ok(version) => debug!(version, "Commit applied"),
            Err(e) => warn!(error = %e, "Commit rejected"),
        }

        let _ = respond_to.send(result);
    }

    #[instrument(fields(collection = %query.collection), skip(self, query, sender, respond_to))]
    fn handle_listen(
        &mut self,
        query: Query,
        sender: SnapshotSender,
        respond_to: Response<ListenerId>,
    ) {
        debug!("Processing listen request");

        if sender.send(self.run_query(&query)).is_err() {
            let _ = respond_to.send(Err(StoreError::ActorCommunication(
                "Listener closed before first snapshot".to_string(),
            )));
            return;
        }

        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.insert(id, Listener { query, sender });
        info!(listener_id = id, "Listener registered");

        let _ = respond_to.send(Ok(id));
    }

    fn version_of(&self, path: &DocPath) -> Option<u64> {
        self.document(path).map(|doc| doc.version)
    }

    fn document(&self, path: &DocPath) -> Option<&StoredDocument> {
        self.collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
    }

    fn apply_commit(
        &mut self,
        preconditions: Vec<Precondition>,
        writes: Vec<Write>,
    ) -> Result<u64, StoreError> {
        for precondition in &preconditions {
            if !precondition.holds(self.version_of(&precondition.path)) {
                return Err(StoreError::Conflict(precondition.path.to_string()));
            }
        }

        if writes.is_empty() {
            return Ok(self.next_version);
        }

        // Stage against an overlay; nothing touches the collections until every write resolved.
        let mut staged: HashMap<DocPath, Option<Value>> = HashMap::new();
        for write in writes {
            match write {
                Write::Set { path, data } => {
                    let data = with_id(&path, data)?;
                    staged.insert(path, Some(data));
                }
                Write::Update { path, fields } => {
                    let current = match staged.get(&path) {
                        Some(staged) => staged.clone(),
                        None => self.document(&path).map(|doc| doc.data.clone()),
                    };
                    let Some(Value::Object(mut data)) = current else {
                        return Err(StoreError::NotFound(path.to_string()));
                    };
                    for (field, value) in fields {
                        if field != "id" {
                            data.insert(field, value);
                        }
                    }
                    staged.insert(path, Some(Value::Object(data)));
                }
                Write::Delete { path } => {
                    staged.insert(path, None);
                }
            }
        }

        self.next_version += 1;
        let version = self.next_version;
        let mut touched = BTreeSet::new();

        for (path, data) in staged {
            touched.insert(path.collection.clone());
            let docs = self.collections.entry(path.collection).or_default();
            match data {
                Some(data) => {
                    docs.insert(path.id, StoredDocument { version, data });
                }
                None => {
                    docs.remove(&path.id);
                }
            }
        }

        self.notify_listeners(&touched);
        Ok(version)
    }

    fn run_query(&self, query: &Query) -> Vec<DocumentSnapshot> {
        let Some(docs) = self.collections.get(&query.collection) else {
            return Vec::new();
        };

        let mut matches: Vec<(&String, &StoredDocument)> = docs
            .iter()
            .filter(|(_, doc)| query.matches(&doc.data))
            .collect();
        matches.sort_by(|(a_id, a), (b_id, b)| {
            query.compare((a_id.as_str(), &a.data), (b_id.as_str(), &b.data))
        });

        matches
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(id, doc)| DocumentSnapshot {
                path: DocPath::new(query.collection.clone(), id.clone()),
                version: doc.version,
                data: doc.data.clone(),
            })
            .collect()
    }

    fn notify_listeners(&mut self, touched: &BTreeSet<String>) {
        let mut closed = Vec::new();

        for (id, listener) in &self.listeners {
            if !touched.contains(&listener.query.collection) {
                continue;
            }
            if listener.sender.send(self.run_query(&listener.query)).is_err() {
                closed.push(*id);
            }
        }

        for id in closed {
            self.listeners.remove(&id);
            debug!(listener_id = id, "Pruned closed listener");
        }
    }
}

fn with_id(path: &DocPath, data: Value) -> Result<Value, StoreError> {
    match data {
        Value::Object(mut map) => {
            map.insert("id".to_string(), Value::String(path.id.clone()));
            Ok(Value::Object(map))
        }
        _ => Err(StoreError::Codec(format!("{path}: documents must be JSON objects"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Precondition;
    use serde_json::json;

    fn spawn_store() -> StoreClient {
        let (actor, client) = StoreActor::new(16);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn set_then_get_returns_versioned_snapshot() {
        let store = spawn_store();
        let path = DocPath::new("categories", "c1");

        store.set(path.clone(), json!({ "name": "Taps" })).await.unwrap();
        let snapshot = store.get(path.clone()).await.unwrap().expect("document exists");

        assert_eq!(snapshot.data["name"], "Taps");
        assert_eq!(snapshot.data["id"], "c1");
        assert!(snapshot.version > 0);
    }

    #[tokio::test]
    async fn failed_write_leaves_batch_unapplied() {
        let store = spawn_store();
        let created = DocPath::new("products", "p1");
        let missing = DocPath::new("products", "ghost");

        let result = store
            .commit(
                Vec::new(),
                vec![
                    Write::Set {
                        path: created.clone(),
                        data: json!({ "stock": 1 }),
                    },
                    Write::Update {
                        path: missing,
                        fields: serde_json::Map::new(),
                    },
                ],
            )
            .await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.get(created).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_version_is_rejected_as_conflict() {
        let store = spawn_store();
        let path = DocPath::new("products", "p1");

        store.set(path.clone(), json!({ "stock": 5 })).await.unwrap();
        let first = store.get(path.clone()).await.unwrap().unwrap();
        store.set(path.clone(), json!({ "stock": 4 })).await.unwrap();

        let result = store
            .commit(
                vec![Precondition::version(path.clone(), first.version)],
                vec![Write::Delete { path: path.clone() }],
            )
            .await;

        assert_eq!(result, Err(StoreError::Conflict("products/p1".to_string())));
        assert!(store.get(path).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dropped_listener_is_pruned_on_next_commit() {
        let store = spawn_store();
        let (_id, receiver) = store.listen(Query::collection("orders")).await.unwrap();
        drop(receiver);

        store
            .set(DocPath::new("orders", "AB12345"), json!({ "status": "Processing" }))
            .await
            .unwrap();

        let (respond_to, response) = oneshot::channel();
        store
            .send_raw(StoreRequest::GetListenerCount { respond_to })
            .await
            .unwrap();
        assert_eq!(response.await.unwrap(), Ok(0));
    }
}
