//! Branch ledger storage layer.
//!
//! This module provides the append-only branch ledger backed by `SQLite`
//! with WAL mode. Each owner's history is a forest of branches: one genesis
//! branch per owner, plus any number of fork branches rooted at blocks of
//! branches the owner already holds. Blocks within a branch are chained by
//! content hash; branch roots carry the zero sentinel (genesis) or the
//! parent block's content hash (fork).
//!
//! # Features
//!
//! - **Append-only semantics**: branches and blocks can only be added,
//!   never modified or deleted
//! - **Ownership enforcement**: only a branch's owner may append to it or
//!   fork from its blocks
//! - **Atomic writes**: every operation is a single transaction; a
//!   precondition failure leaves no partial state and emits nothing
//! - **Observer notifications**: registered sinks receive events after each
//!   successful write
//!
//! # Example
//!
//! ```rust,no_run
//! use emrtree_core::hash::RecordHasher;
//! use emrtree_core::ledger::Ledger;
//!
//! # fn example() -> Result<(), emrtree_core::ledger::LedgerError> {
//! let ledger = Ledger::open("/path/to/ledger.db")?;
//!
//! // Register a patient with a genesis branch
//! let root = ledger.create_genesis(
//!     "patient-1",
//!     "Initial visit",
//!     RecordHasher::hash_record("Initial visit", 1),
//! )?;
//!
//! // Append a follow-up record to the same branch
//! ledger.append_block(
//!     "patient-1",
//!     root,
//!     "Follow-up",
//!     RecordHasher::hash_record("Follow-up", 2),
//! )?;
//!
//! // Fork an alternate history from the root block
//! let fork = ledger.create_fork(
//!     "patient-1",
//!     root,
//!     0,
//!     "Emergency dept",
//!     RecordHasher::hash_record("Emergency dept", 3),
//! )?;
//! # let _ = fork;
//! # Ok(())
//! # }
//! ```

mod storage;


pub use storage::{BlockRecord, Ledger, LedgerError, LedgerStats};
