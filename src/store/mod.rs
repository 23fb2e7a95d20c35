//! In-process document store.
//!
//! A single actor owns every collection and serves requests from a bounded
//! channel, the same way the storefront's other services are built:
//!
//! - [`StoreActor`] - the server loop; commits are applied inside one handler
//! - [`StoreClient`] - cloneable handle with typed helpers
//! - [`Transaction`] - optimistic read/compare/write with bounded retries
//! - [`Subscription`] - live query handle, torn down on drop

mod actor;
mod client;
mod document;
mod error;
mod query;
mod subscription;
mod transaction;

pub use actor::*;
pub use client::*;
pub use document::*;
pub use error::*;
pub use query::*;
pub use subscription::*;
pub use transaction::*;
