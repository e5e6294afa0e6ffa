//! Table abstraction
//!
//! The operations the gateway needs from a backing table. Every call may fail
//! the way a network call to a managed store fails.

use crate::error::Result;
use crate::model::Item;

/// A key-value table of items addressed by their `id` field
pub trait Table: Send + Sync {
    /// Table name, used in logs and errors
    fn name(&self) -> &str;

    /// Check that the table exists and is reachable
    fn load(&self) -> Result<()>;

    /// Look up an item by identifier
    fn get_item(&self, key: &str) -> Result<Option<Item>>;

    /// Insert or overwrite the item stored under its identifier
    fn put_item(&self, item: Item) -> Result<()>;

    /// Read every item in the table
    fn scan(&self) -> Result<Vec<Item>>;
}
