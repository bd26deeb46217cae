//! Link and click stores.
//!
//! [`InMemoryStore`] keeps everything behind one lock and is meant for tests
//! and single-process setups; [`MySqlStore`] is the durable backend.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use snaplink_core::repository::{ClickRepository, LinkReadRepository, LinkRepository, Result};
pub use snaplink_core::StorageError;
