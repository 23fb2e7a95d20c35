//! Accounts, sessions and role-gated access.

mod guard;
mod identity;

pub use guard::*;
pub use identity::*;
