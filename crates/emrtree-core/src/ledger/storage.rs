//! `SQLite`-backed branch ledger implementation.
//!
//! This module uses `SQLite` with WAL mode for the underlying storage. The
//! [`Ledger`] struct owns a single guarded connection; each write operation
//! runs inside one transaction so a precondition failure rolls back with no
//! partial state change and no notification emitted.

// SQLite returns i64 for row IDs and counts, but they're always non-negative.
// Timestamps won't overflow u64 until the year 2554.
// Mutex poisoning indicates a panic in another thread, which is unrecoverable.
#![allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::missing_panics_doc
)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OpenFlags, OptionalExtension, Transaction, params};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::events::{EventSink, LedgerEvent};
use crate::hash::{self, HASH_SIZE, Hash, ZERO_HASH};

/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The caller already has a genesis branch.
    #[error("genesis branch already exists for owner {owner}")]
    DuplicateGenesis {
        /// The owner that attempted a second genesis.
        owner: String,
    },

    /// The supplied content hash is the zero sentinel.
    #[error("content hash cannot be the zero sentinel")]
    EmptyHash,

    /// The caller does not own the branch it tried to write to.
    #[error("caller {caller} does not own branch {branch_id}")]
    AccessDenied {
        /// The branch the caller tried to write to.
        branch_id: u64,
        /// The rejected caller identity.
        caller: String,
    },

    /// No active branch exists with the given id.
    #[error("branch does not exist or is inactive: branch_id={branch_id}")]
    BranchNotFound {
        /// The unknown or inactive branch id.
        branch_id: u64,
    },

    /// Fork parent index is past the end of the parent branch.
    #[error("invalid parent block index {index} for branch {branch_id} (length {len})")]
    InvalidParentIndex {
        /// The parent branch.
        branch_id: u64,
        /// The out-of-range index.
        index: u64,
        /// The parent branch's block count.
        len: u64,
    },

    /// Block lookup index is past the end of the branch.
    #[error("block index out of bounds: index={index} in branch {branch_id} (length {len})")]
    IndexOutOfBounds {
        /// The branch that was read.
        branch_id: u64,
        /// The out-of-range index.
        index: u64,
        /// The branch's block count.
        len: u64,
    },

    /// Chain audit found a block that does not link to its predecessor.
    #[error("hash chain broken at branch_id={branch_id}, index={index}: {details}")]
    ChainBroken {
        /// The branch where the chain broke.
        branch_id: u64,
        /// The block index where the chain broke.
        index: u64,
        /// Details about the failure.
        details: String,
    },

    /// A stored record could not be decoded.
    #[error("corrupt record at branch_id={branch_id}, index={index}: {details}")]
    CorruptRecord {
        /// The branch containing the record.
        branch_id: u64,
        /// The block index of the record.
        index: u64,
        /// Details about the failure.
        details: String,
    },
}

/// One immutable block as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRecord {
    /// The branch this block belongs to.
    pub branch_id: u64,

    /// Position within the branch; 0 is the branch root.
    pub index: u64,

    /// Caller-supplied content hash (non-zero).
    #[serde(serialize_with = "hash::serialize_hex")]
    pub content_hash: Hash,

    /// Content hash of the preceding block, or zero for a branch root.
    #[serde(serialize_with = "hash::serialize_hex")]
    pub prev_hash: Hash,

    /// Opaque caller-supplied record text.
    pub metadata: String,

    /// Write timestamp in nanoseconds since the Unix epoch.
    pub created_at_ns: u64,
}

/// Statistics about the ledger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerStats {
    /// Number of registered owners.
    pub owner_count: u64,

    /// Number of branches ever created.
    pub branch_count: u64,

    /// Total number of blocks across all branches.
    pub block_count: u64,

    /// Database file size in bytes.
    pub db_size_bytes: u64,
}

/// The append-only branch ledger backed by `SQLite`.
///
/// The ledger records per-owner history as a forest of branches: each owner
/// starts with exactly one genesis branch and may fork a new branch from any
/// block of a branch it owns. Branch ids are assigned from a single global
/// counter in creation order, starting at 0, and are never reused. Blocks
/// and branches are never modified or deleted; the only mutation of
/// existing state is a branch growing by one block at its tail.
///
/// Writes are serialized through the guarded connection and each runs in
/// its own transaction. Registered [`EventSink`]s receive notifications
/// strictly after a write commits.
pub struct Ledger {
    conn: Mutex<Connection>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Ledger {
    /// Opens or creates a ledger at the specified path.
    ///
    /// If the database doesn't exist, it will be created with the
    /// appropriate schema. WAL mode is enabled for concurrent reads.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            sinks: Vec::new(),
        })
    }

    /// Creates an in-memory ledger for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_connection(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            sinks: Vec::new(),
        })
    }

    /// Initialize the connection with schema and pragmas.
    fn initialize_connection(conn: &Connection) -> Result<(), LedgerError> {
        // Execute schema (includes PRAGMA statements)
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Registers an observer for write notifications.
    ///
    /// Sinks receive events in emission order, after the write's
    /// transaction has committed.
    pub fn subscribe(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Creates the caller's genesis branch with a single root block.
    ///
    /// The root block's `prev_hash` is the zero sentinel. Each owner may
    /// create exactly one genesis branch, ever.
    ///
    /// Returns the id assigned to the new branch. Emits `OwnerRegistered`,
    /// `BranchCreated` (genesis), and `BlockCreated`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyHash` if `content_hash` is the zero sentinel, or
    /// `DuplicateGenesis` if the caller already has a genesis branch.
    pub fn create_genesis(
        &self,
        caller: &str,
        metadata: &str,
        content_hash: Hash,
    ) -> Result<u64, LedgerError> {
        if hash::is_zero(&content_hash) {
            return Err(LedgerError::EmptyHash);
        }

        let created_at_ns = now_ns();
        let branch_id;
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let has_genesis: Option<i64> = tx
                .query_row(
                    "SELECT has_genesis FROM owners WHERE owner = ?1",
                    params![caller],
                    |row| row.get(0),
                )
                .optional()?;
            if has_genesis.unwrap_or(0) != 0 {
                return Err(LedgerError::DuplicateGenesis {
                    owner: caller.to_string(),
                });
            }

            branch_id = next_branch_id(&tx)?;
            tx.execute(
                "INSERT INTO owners (owner, has_genesis, registered_at_ns)
                 VALUES (?1, 1, ?2)",
                params![caller, created_at_ns],
            )?;
            tx.execute(
                "INSERT INTO branches (branch_id, owner, active, created_at_ns)
                 VALUES (?1, ?2, 1, ?3)",
                params![branch_id, caller, created_at_ns],
            )?;
            tx.execute(
                "INSERT INTO blocks (branch_id, block_index, content_hash, prev_hash, metadata, created_at_ns)
                 VALUES (?1, 0, ?2, ?3, ?4, ?5)",
                params![
                    branch_id,
                    &content_hash[..],
                    &ZERO_HASH[..],
                    metadata,
                    created_at_ns
                ],
            )?;
            tx.commit()?;
        }

        debug!(branch_id, owner = caller, "genesis branch created");
        self.emit(&[
            LedgerEvent::OwnerRegistered {
                owner: caller.to_string(),
            },
            LedgerEvent::BranchCreated {
                branch_id,
                owner: caller.to_string(),
                is_genesis: true,
            },
            LedgerEvent::BlockCreated {
                branch_id,
                owner: caller.to_string(),
                content_hash,
                prev_hash: ZERO_HASH,
            },
        ]);
        Ok(branch_id)
    }

    /// Creates a fork branch rooted at an existing block of a branch the
    /// caller owns.
    ///
    /// The new branch's root block carries `prev_hash` equal to the parent
    /// block's `content_hash`; this copied hash is the only record of
    /// lineage. The parent branch is not modified.
    ///
    /// Returns the id assigned to the new branch. Emits `BranchCreated`
    /// (non-genesis) and `BlockCreated`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyHash` for a zero `content_hash`, `BranchNotFound` if
    /// the parent branch id is unknown or inactive, `AccessDenied` if the
    /// caller does not own the parent branch, or `InvalidParentIndex` if
    /// `parent_block_index` is past the end of the parent branch.
    pub fn create_fork(
        &self,
        caller: &str,
        parent_branch_id: u64,
        parent_block_index: u64,
        metadata: &str,
        content_hash: Hash,
    ) -> Result<u64, LedgerError> {
        if hash::is_zero(&content_hash) {
            return Err(LedgerError::EmptyHash);
        }

        let created_at_ns = now_ns();
        let branch_id;
        let prev_hash;
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let owner = branch_owner_on(&tx, parent_branch_id)?;
            if owner != caller {
                return Err(LedgerError::AccessDenied {
                    branch_id: parent_branch_id,
                    caller: caller.to_string(),
                });
            }

            let len = block_count_on(&tx, parent_branch_id)?;
            if parent_block_index >= len {
                return Err(LedgerError::InvalidParentIndex {
                    branch_id: parent_branch_id,
                    index: parent_block_index,
                    len,
                });
            }

            let parent_blob: Vec<u8> = tx.query_row(
                "SELECT content_hash FROM blocks WHERE branch_id = ?1 AND block_index = ?2",
                params![parent_branch_id, parent_block_index],
                |row| row.get(0),
            )?;
            prev_hash = hash_from_blob(parent_branch_id, parent_block_index, &parent_blob)?;

            branch_id = next_branch_id(&tx)?;
            tx.execute(
                "INSERT INTO branches (branch_id, owner, active, created_at_ns)
                 VALUES (?1, ?2, 1, ?3)",
                params![branch_id, caller, created_at_ns],
            )?;
            tx.execute(
                "INSERT INTO blocks (branch_id, block_index, content_hash, prev_hash, metadata, created_at_ns)
                 VALUES (?1, 0, ?2, ?3, ?4, ?5)",
                params![
                    branch_id,
                    &content_hash[..],
                    &prev_hash[..],
                    metadata,
                    created_at_ns
                ],
            )?;
            tx.commit()?;
        }

        debug!(
            branch_id,
            parent_branch_id,
            parent_block_index,
            owner = caller,
            "fork branch created"
        );
        self.emit(&[
            LedgerEvent::BranchCreated {
                branch_id,
                owner: caller.to_string(),
                is_genesis: false,
            },
            LedgerEvent::BlockCreated {
                branch_id,
                owner: caller.to_string(),
                content_hash,
                prev_hash,
            },
        ]);
        Ok(branch_id)
    }

    /// Appends a block to the tail of a branch the caller owns.
    ///
    /// The new block's `prev_hash` is the current tail block's
    /// `content_hash`. This is the only mutation of an existing branch's
    /// contents (growth only, never edits).
    ///
    /// Emits `BlockCreated`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyHash` for a zero `content_hash`, `BranchNotFound` if
    /// the branch id is unknown or inactive, or `AccessDenied` if the
    /// caller does not own the branch.
    pub fn append_block(
        &self,
        caller: &str,
        branch_id: u64,
        metadata: &str,
        content_hash: Hash,
    ) -> Result<(), LedgerError> {
        if hash::is_zero(&content_hash) {
            return Err(LedgerError::EmptyHash);
        }

        let created_at_ns = now_ns();
        let prev_hash;
        let index;
        {
            let mut conn = self.conn.lock().unwrap();
            let tx = conn.transaction()?;

            let owner = branch_owner_on(&tx, branch_id)?;
            if owner != caller {
                return Err(LedgerError::AccessDenied {
                    branch_id,
                    caller: caller.to_string(),
                });
            }

            // Every branch is created with its root block, so the tail
            // always exists.
            index = block_count_on(&tx, branch_id)?;
            let tail_blob: Vec<u8> = tx.query_row(
                "SELECT content_hash FROM blocks WHERE branch_id = ?1
                 ORDER BY block_index DESC LIMIT 1",
                params![branch_id],
                |row| row.get(0),
            )?;
            prev_hash = hash_from_blob(branch_id, index - 1, &tail_blob)?;

            tx.execute(
                "INSERT INTO blocks (branch_id, block_index, content_hash, prev_hash, metadata, created_at_ns)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    branch_id,
                    index,
                    &content_hash[..],
                    &prev_hash[..],
                    metadata,
                    created_at_ns
                ],
            )?;
            tx.commit()?;
        }

        debug!(branch_id, index, owner = caller, "block appended");
        self.emit(&[LedgerEvent::BlockCreated {
            branch_id,
            owner: caller.to_string(),
            content_hash,
            prev_hash,
        }]);
        Ok(())
    }

    /// Whether the identity has ever created a genesis branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn is_registered(&self, owner: &str) -> Result<bool, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let has_genesis: Option<i64> = conn
            .query_row(
                "SELECT has_genesis FROM owners WHERE owner = ?1",
                params![owner],
                |row| row.get(0),
            )
            .optional()?;

        Ok(has_genesis.unwrap_or(0) != 0)
    }

    /// Branch ids created by the identity, in creation order.
    ///
    /// Returns an empty list for an unknown identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn branches_of(&self, owner: &str) -> Result<Vec<u64>, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT branch_id FROM branches WHERE owner = ?1 AND active = 1
             ORDER BY branch_id ASC",
        )?;
        let ids = stmt
            .query_map(params![owner], |row| Ok(row.get::<_, i64>(0)? as u64))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    /// Number of blocks in a branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch id is unknown or inactive.
    pub fn branch_length(&self, branch_id: u64) -> Result<u64, LedgerError> {
        let conn = self.conn.lock().unwrap();
        branch_owner_on(&conn, branch_id)?;
        block_count_on(&conn, branch_id)
    }

    /// Owner identity of a branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch id is unknown or inactive.
    pub fn branch_owner(&self, branch_id: u64) -> Result<String, LedgerError> {
        let conn = self.conn.lock().unwrap();
        branch_owner_on(&conn, branch_id)
    }

    /// Reads a single block by branch id and position.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch id is unknown or inactive,
    /// or `IndexOutOfBounds` if the branch has no block at `index`.
    pub fn block_at(&self, branch_id: u64, index: u64) -> Result<BlockRecord, LedgerError> {
        let conn = self.conn.lock().unwrap();
        branch_owner_on(&conn, branch_id)?;

        let row: Option<(Vec<u8>, Vec<u8>, String, i64)> = conn
            .query_row(
                "SELECT content_hash, prev_hash, metadata, created_at_ns
                 FROM blocks WHERE branch_id = ?1 AND block_index = ?2",
                params![branch_id, index],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((content_blob, prev_blob, metadata, created_at_ns)) = row else {
            let len = block_count_on(&conn, branch_id)?;
            return Err(LedgerError::IndexOutOfBounds {
                branch_id,
                index,
                len,
            });
        };

        Ok(BlockRecord {
            branch_id,
            index,
            content_hash: hash_from_blob(branch_id, index, &content_blob)?,
            prev_hash: hash_from_blob(branch_id, index, &prev_blob)?,
            metadata,
            created_at_ns: created_at_ns as u64,
        })
    }

    /// Reads the full ordered block list of a branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch id is unknown or inactive.
    pub fn branch_blocks(&self, branch_id: u64) -> Result<Vec<BlockRecord>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        branch_owner_on(&conn, branch_id)?;
        load_blocks_on(&conn, branch_id)
    }

    /// Number of branches ever created (the next id to be assigned).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn branch_counter(&self) -> Result<u64, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let value: i64 = conn.query_row(
            "SELECT value FROM ledger_meta WHERE key = 'branch_counter'",
            [],
            |row| row.get(0),
        )?;

        Ok(value as u64)
    }

    /// Audits one branch: every block must link to its predecessor and no
    /// stored content hash may be zero.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` for an unknown branch, or `ChainBroken` at
    /// the first block that fails the audit.
    pub fn verify_branch(&self, branch_id: u64) -> Result<(), LedgerError> {
        let conn = self.conn.lock().unwrap();
        branch_owner_on(&conn, branch_id)?;
        let blocks = load_blocks_on(&conn, branch_id)?;
        verify_block_sequence(branch_id, &blocks)
    }

    /// Audits every branch, additionally checking that each fork root's
    /// `prev_hash` resolves to some block owned by the same identity.
    ///
    /// Lineage is resolved purely by hash equality; a reused content hash
    /// satisfies the check as long as at least one owned block carries it.
    ///
    /// # Errors
    ///
    /// Returns `ChainBroken` at the first failing block.
    pub fn verify_all(&self) -> Result<(), LedgerError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT branch_id, owner FROM branches WHERE active = 1
             ORDER BY branch_id ASC",
        )?;
        let branches = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (branch_id, owner) in branches {
            let blocks = load_blocks_on(&conn, branch_id)?;
            verify_block_sequence(branch_id, &blocks)?;

            let Some(root) = blocks.first() else {
                return Err(LedgerError::ChainBroken {
                    branch_id,
                    index: 0,
                    details: "branch has no root block".to_string(),
                });
            };
            if hash::is_zero(&root.prev_hash) {
                continue;
            }
            let resolves: i64 = conn.query_row(
                "SELECT EXISTS (
                     SELECT 1 FROM blocks b
                     JOIN branches br ON br.branch_id = b.branch_id
                     WHERE br.owner = ?1 AND b.content_hash = ?2
                       AND b.branch_id != ?3
                 )",
                params![owner, &root.prev_hash[..], branch_id],
                |row| row.get(0),
            )?;
            if resolves == 0 {
                return Err(LedgerError::ChainBroken {
                    branch_id,
                    index: 0,
                    details: "fork root does not resolve to a block owned by the same identity"
                        .to_string(),
                });
            }
        }

        Ok(())
    }

    /// Gets statistics about the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be gathered.
    pub fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let conn = self.conn.lock().unwrap();

        let owner_count: i64 = conn.query_row("SELECT COUNT(*) FROM owners", [], |row| row.get(0))?;

        let branch_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM branches", [], |row| row.get(0))?;

        let block_count: i64 = conn.query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))?;

        // Get page count and page size to compute database size
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        let db_size_bytes = (page_count * page_size) as u64;

        Ok(LedgerStats {
            owner_count: owner_count as u64,
            branch_count: branch_count as u64,
            block_count: block_count as u64,
            db_size_bytes,
        })
    }

    fn emit(&self, events: &[LedgerEvent]) {
        for event in events {
            for sink in &self.sinks {
                sink.emit(event);
            }
        }
    }
}

/// Current time in nanoseconds since the Unix epoch.
fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Allocates the next branch id from the global counter.
fn next_branch_id(tx: &Transaction<'_>) -> Result<u64, LedgerError> {
    let next: i64 = tx.query_row(
        "SELECT value FROM ledger_meta WHERE key = 'branch_counter'",
        [],
        |row| row.get(0),
    )?;
    tx.execute(
        "UPDATE ledger_meta SET value = value + 1 WHERE key = 'branch_counter'",
        [],
    )?;
    Ok(next as u64)
}

/// Owner of an active branch, or `BranchNotFound`.
fn branch_owner_on(conn: &Connection, branch_id: u64) -> Result<String, LedgerError> {
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT owner, active FROM branches WHERE branch_id = ?1",
            params![branch_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((owner, active)) if active != 0 => Ok(owner),
        _ => Err(LedgerError::BranchNotFound { branch_id }),
    }
}

/// Block count of a branch (0 only for a branch id that was never written,
/// which callers rule out first).
fn block_count_on(conn: &Connection, branch_id: u64) -> Result<u64, LedgerError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM blocks WHERE branch_id = ?1",
        params![branch_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Loads the ordered block list of a branch.
fn load_blocks_on(conn: &Connection, branch_id: u64) -> Result<Vec<BlockRecord>, LedgerError> {
    let mut stmt = conn.prepare(
        "SELECT block_index, content_hash, prev_hash, metadata, created_at_ns
         FROM blocks WHERE branch_id = ?1
         ORDER BY block_index ASC",
    )?;
    let rows = stmt
        .query_map(params![branch_id], |row| {
            Ok((
                row.get::<_, i64>(0)? as u64,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Vec<u8>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)? as u64,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(index, content_blob, prev_blob, metadata, created_at_ns)| {
            Ok(BlockRecord {
                branch_id,
                index,
                content_hash: hash_from_blob(branch_id, index, &content_blob)?,
                prev_hash: hash_from_blob(branch_id, index, &prev_blob)?,
                metadata,
                created_at_ns,
            })
        })
        .collect()
}

/// Decodes a stored hash blob, rejecting wrong widths.
fn hash_from_blob(branch_id: u64, index: u64, blob: &[u8]) -> Result<Hash, LedgerError> {
    Hash::try_from(blob).map_err(|_| LedgerError::CorruptRecord {
        branch_id,
        index,
        details: format!("stored hash has {} bytes, expected {HASH_SIZE}", blob.len()),
    })
}

/// Checks intra-branch chain linkage over an ordered block list.
fn verify_block_sequence(branch_id: u64, blocks: &[BlockRecord]) -> Result<(), LedgerError> {
    for (i, block) in blocks.iter().enumerate() {
        if hash::is_zero(&block.content_hash) {
            return Err(LedgerError::ChainBroken {
                branch_id,
                index: block.index,
                details: "stored content hash is zero".to_string(),
            });
        }
        if i > 0 && block.prev_hash != blocks[i - 1].content_hash {
            return Err(LedgerError::ChainBroken {
                branch_id,
                index: block.index,
                details: "prev_hash does not match predecessor content hash".to_string(),
            });
        }
    }
    Ok(())
}
