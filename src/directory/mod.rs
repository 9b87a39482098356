//! User directory module
//!
//! Durable user account records behind the HTTP API, separate from the
//! live presence registry.

mod store;

pub use store::{DirectoryError, PublicUser, UserDirectory, UserRecord};
