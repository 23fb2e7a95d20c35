//! Typed clients over the document store, one per collection.

#[macro_use]
mod macros;

mod category_client;
mod order_client;
mod product_client;
mod user_client;

pub use category_client::*;
pub use order_client::*;
pub use product_client::*;
pub use user_client::*;
