//! Command implementations for the emrtree CLI.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use emrtree_core::{EventBuffer, HASH_SIZE, Hash, Ledger, RecordHasher};

/// Resolves the content hash for a write: parses `--hash` when given,
/// otherwise derives one from the metadata plus the current time as nonce
/// so identical metadata submitted twice still yields distinct hashes.
fn resolve_hash(metadata: &str, hash_arg: Option<&str>) -> Result<Hash> {
    match hash_arg {
        Some(hex_str) => parse_hash(hex_str),
        None => {
            let nonce = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            Ok(RecordHasher::hash_record(metadata, nonce))
        }
    }
}

/// Parses a 64-char hex string into a hash.
fn parse_hash(hex_str: &str) -> Result<Hash> {
    let bytes = hex::decode(hex_str).context("content hash is not valid hex")?;
    let Ok(hash) = Hash::try_from(bytes.as_slice()) else {
        bail!(
            "content hash must be {} bytes ({} hex chars), got {}",
            HASH_SIZE,
            HASH_SIZE * 2,
            bytes.len()
        );
    };
    Ok(hash)
}

/// Prints the notifications a write emitted.
fn echo_events(events: &EventBuffer) -> Result<()> {
    for event in events.drain() {
        println!("event: {}", serde_json::to_string(&event)?);
    }
    Ok(())
}

pub fn genesis(
    ledger: &Ledger,
    events: &EventBuffer,
    owner: &str,
    metadata: &str,
    hash_arg: Option<&str>,
) -> Result<()> {
    let content_hash = resolve_hash(metadata, hash_arg)?;
    let branch_id = ledger.create_genesis(owner, metadata, content_hash)?;
    println!("created genesis branch {branch_id} for {owner}");
    echo_events(events)
}

pub fn append(
    ledger: &Ledger,
    events: &EventBuffer,
    owner: &str,
    branch_id: u64,
    metadata: &str,
    hash_arg: Option<&str>,
) -> Result<()> {
    let content_hash = resolve_hash(metadata, hash_arg)?;
    ledger.append_block(owner, branch_id, metadata, content_hash)?;
    let len = ledger.branch_length(branch_id)?;
    println!("appended block {} to branch {branch_id}", len - 1);
    echo_events(events)
}

pub fn fork(
    ledger: &Ledger,
    events: &EventBuffer,
    owner: &str,
    parent_branch_id: u64,
    parent_block_index: u64,
    metadata: &str,
    hash_arg: Option<&str>,
) -> Result<()> {
    let content_hash = resolve_hash(metadata, hash_arg)?;
    let branch_id = ledger.create_fork(
        owner,
        parent_branch_id,
        parent_block_index,
        metadata,
        content_hash,
    )?;
    println!(
        "created fork branch {branch_id} from branch {parent_branch_id} block {parent_block_index}"
    );
    echo_events(events)
}

pub fn branches(ledger: &Ledger, owner: &str) -> Result<()> {
    if !ledger.is_registered(owner)? {
        println!("{owner} is not registered");
        return Ok(());
    }
    for branch_id in ledger.branches_of(owner)? {
        let len = ledger.branch_length(branch_id)?;
        println!("branch {branch_id}: {len} block(s)");
    }
    Ok(())
}

pub fn show(ledger: &Ledger, branch_id: u64) -> Result<()> {
    let blocks = ledger.branch_blocks(branch_id)?;
    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}

pub fn block(ledger: &Ledger, branch_id: u64, index: u64) -> Result<()> {
    let record = ledger.block_at(branch_id, index)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub fn verify(ledger: &Ledger) -> Result<()> {
    ledger.verify_all()?;
    println!("ok: all branch chains verified");
    Ok(())
}

pub fn stats(ledger: &Ledger) -> Result<()> {
    let stats = ledger.stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
