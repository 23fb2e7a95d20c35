//! # Mock Framework
//!
//! Utilities for testing clients in isolation.
//!
//! Use [`create_mock_store_client`] to get a store client and a receiver.
//! Then use helpers like [`expect_get`] or [`expect_commit`] to assert the
//! request and answer it with whatever the test needs.

use tokio::sync::mpsc;

use crate::store::{
    DocPath, DocumentSnapshot, Precondition, Query, Response, StoreClient, StoreRequest, Write,
};

/// Creates a store client whose requests land on a receiver the test owns,
/// so store behavior (success, failure, conflicts) can be scripted.
pub fn create_mock_store_client(buffer_size: usize) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(DocPath, Response<Option<DocumentSnapshot>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Get { path, respond_to }) => Some((path, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Query request
pub async fn expect_query(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Query, Response<Vec<DocumentSnapshot>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Query { query, respond_to }) => Some((query, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Commit request
pub async fn expect_commit(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Vec<Precondition>, Vec<Write>, Response<u64>)> {
    match receiver.recv().await {
        Some(StoreRequest::Commit {
            preconditions,
            writes,
            respond_to,
        }) => Some((preconditions, writes, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_store_client() {
        let (client, mut receiver) = create_mock_store_client(10);

        let set_task = tokio::spawn(async move {
            client
                .set(DocPath::new("categories", "c1"), json!({ "name": "Taps" }))
                .await
        });

        let (preconditions, writes, responder) =
            expect_commit(&mut receiver).await.expect("Expected Commit request");
        assert!(preconditions.is_empty());
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path(), &DocPath::new("categories", "c1"));
        responder.send(Ok(1)).unwrap();

        assert_eq!(set_task.await.unwrap(), Ok(()));
    }
}
