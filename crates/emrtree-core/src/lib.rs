//! Core data model and state-transition rules for the EMR tree ledger.
//!
//! Per-patient visit history is recorded as a directed, hash-linked tree of
//! immutable blocks. Any block may serve as the parent of a new branch (a
//! "collision" fork), yielding a branching append-only ledger per owner.
//! The crate owns the ledger's persistent state and exposes the write
//! operations (genesis, fork, append) and the read paths that reconstruct
//! the tree; it stores only opaque metadata and caller-supplied content
//! hashes, and performs no hashing of record content itself.
//!
//! The caller layer (wallet/session handling, transaction submission, UI)
//! lives outside this crate and consumes it through [`ledger::Ledger`],
//! supplying an authenticated caller identity and, for writes, a non-zero
//! 32-byte content hash.

pub mod events;
pub mod hash;
pub mod ledger;

pub use events::{EventBuffer, EventSink, LedgerEvent};
pub use hash::{HASH_SIZE, Hash, RecordHasher, ZERO_HASH};
pub use ledger::{BlockRecord, Ledger, LedgerError, LedgerStats};
