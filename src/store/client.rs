use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument};

use super::actor::{ListenerId, Response, SnapshotReceiver, StoreRequest};
use super::document::{encode, DocPath, Document, DocumentSnapshot, Precondition, Write};
use super::query::Query;
use super::StoreError;

/// Handle to the document store actor. Cheap to clone; every clone talks to
/// the same actor.
#[derive(Debug, Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub(crate) fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::ActorCommunication("Store closed".to_string()))?;

        response
            .await
            .map_err(|_| StoreError::ActorCommunication("Store dropped".to_string()))?
    }

    #[instrument(skip(self), fields(path = %path))]
    pub async fn get(&self, path: DocPath) -> Result<Option<DocumentSnapshot>, StoreError> {
        debug!("Sending request");
        self.request(|respond_to| StoreRequest::Get { path, respond_to })
            .await
    }

    /// Read and decode a single document of type `T`.
    pub async fn get_as<T: Document>(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.get(T::path_for(id))
            .await?
            .map(|snapshot| snapshot.decode())
            .transpose()
    }

    #[instrument(skip(self, query), fields(collection = %query.collection))]
    pub async fn query(&self, query: Query) -> Result<Vec<DocumentSnapshot>, StoreError> {
        debug!("Sending request");
        self.request(|respond_to| StoreRequest::Query { query, respond_to })
            .await
    }

    pub async fn query_as<T: Document>(&self, query: Query) -> Result<Vec<T>, StoreError> {
        self.query(query)
            .await?
            .iter()
            .map(DocumentSnapshot::decode)
            .collect()
    }

    #[instrument(skip(self, preconditions, writes), fields(writes = writes.len()))]
    pub async fn commit(
        &self,
        preconditions: Vec<Precondition>,
        writes: Vec<Write>,
    ) -> Result<u64, StoreError> {
        debug!("Sending request");
        self.request(|respond_to| StoreRequest::Commit {
            preconditions,
            writes,
            respond_to,
        })
        .await
    }

    pub async fn set(&self, path: DocPath, data: Value) -> Result<(), StoreError> {
        self.commit(Vec::new(), vec![Write::Set { path, data }])
            .await
            .map(|_| ())
    }

    /// Write `document` in full, replacing whatever is stored at its path.
    pub async fn put<T: Document>(&self, document: &T) -> Result<(), StoreError> {
        self.set(document.path(), encode(document)?).await
    }

    /// Write `document` only if nothing is stored at its path yet.
    pub async fn create<T: Document>(&self, document: &T) -> Result<(), StoreError> {
        let path = document.path();
        let write = Write::Set {
            path: path.clone(),
            data: encode(document)?,
        };

        match self
            .commit(vec![Precondition::missing(path)], vec![write])
            .await
        {
            Ok(_) => Ok(()),
            Err(StoreError::Conflict(path)) => Err(StoreError::AlreadyExists(path)),
            Err(e) => Err(e),
        }
    }

    pub async fn update(&self, path: DocPath, fields: Map<String, Value>) -> Result<(), StoreError> {
        self.commit(Vec::new(), vec![Write::Update { path, fields }])
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, path: DocPath) -> Result<(), StoreError> {
        self.commit(Vec::new(), vec![Write::Delete { path }])
            .await
            .map(|_| ())
    }

    /// Register a live query. The receiver gets the current result set right
    /// away and the full result set again after every commit to the collection.
    #[instrument(skip(self, query), fields(collection = %query.collection))]
    pub async fn listen(&self, query: Query) -> Result<(ListenerId, SnapshotReceiver), StoreError> {
        debug!("Sending request");
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self
            .request(|respond_to| StoreRequest::Listen {
                query,
                sender,
                respond_to,
            })
            .await?;
        Ok((id, receiver))
    }

    pub async fn unlisten(&self, id: ListenerId) -> Result<(), StoreError> {
        self.sender
            .send(StoreRequest::Unlisten { id })
            .await
            .map_err(|_| StoreError::ActorCommunication("Store closed".to_string()))
    }

    /// Non-blocking variant for use from `Drop`. A full or closed channel is
    /// ignored: the listener is pruned once its receiver is gone anyway.
    pub(crate) fn unlisten_now(&self, id: ListenerId) {
        let _ = self.sender.try_send(StoreRequest::Unlisten { id });
    }

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Sending shutdown request");
        self.sender
            .send(StoreRequest::Shutdown)
            .await
            .map_err(|_| StoreError::ActorCommunication("Store closed".to_string()))
    }

    #[cfg(test)]
    pub(crate) async fn send_raw(&self, request: StoreRequest) -> Result<(), StoreError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| StoreError::ActorCommunication("Store closed".to_string()))
    }
}
