//! Store backends.
//!
//! [`MemoryStore`] keeps everything in process memory and is what the tests use. [`SqliteStore`] persists to SQLite
//! and runs the embedded migrations on connect.
mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
