//! Status ledger storage
//!
//! The ledger is the only state that survives between runs: the last
//! opt-out value the engine believes both sources agree on, per email.
//! The trait-based design allows swapping between in-memory and SQLite
//! implementations.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{Ledger, LedgerStore};
