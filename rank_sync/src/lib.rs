//! Publish step between a shard engine and the coordinator: assigns
//! absolute ranks from the shard's registered range and pushes the
//! resulting entry list. Scheduling is the caller's business.
#![deny(missing_docs)]

use rank_center::{RankCenter, RankedEntry, ShardId};
use rank_shard::ShardEngine;
use thiserror::Error;

/// Why a publish was refused. Nothing is pushed on error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The coordinator has no range registered for the shard, so absolute
    /// ranks cannot be assigned.
    #[error("shard {0} has no registered rank range")]
    UnknownRange(ShardId),
    /// The engine's cached order is stale; recompute before publishing.
    #[error("shard {0} engine is dirty, recompute first")]
    DirtyEngine(ShardId),
}

/// Snapshot the engine's current order as ranked entries and replace the
/// shard's data in the coordinator.
///
/// Absolute rank is the shard's `min_rank` plus the entry's 0-based
/// position. Entries past the range's stated capacity still publish with
/// their computed ranks; the coordinator trusts the rank field, and keeping
/// shard populations within range is up to whoever assigns ranges.
///
/// Returns the number of entries published.
pub fn publish(
    engine: &ShardEngine,
    shard_id: ShardId,
    center: &mut RankCenter,
) -> Result<usize, PublishError> {
    let range = center
        .get_range(shard_id)
        .ok_or(PublishError::UnknownRange(shard_id))?;
    if engine.is_dirty() {
        return Err(PublishError::DirtyEngine(shard_id));
    }

    let entries: Vec<RankedEntry> = engine
        .ranked()
        .iter()
        .enumerate()
        .map(|(pos, (player_id, ps))| RankedEntry {
            player_id: player_id.clone(),
            score: ps.score,
            rank: range.min_rank + pos as u64,
            timestamp: ps.timestamp,
        })
        .collect();
    let published = entries.len();
    tracing::debug!(shard_id, published, "publishing shard order");
    center.update_rank_data(shard_id, entries);
    Ok(published)
}
