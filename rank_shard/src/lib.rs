//! Per-shard ranking engine: player scores with a lazily re-sorted order.
#![deny(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mutable per-player state within one shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    /// Current score.
    pub score: i64,
    /// Time the score was last set (epoch seconds). Used only as a
    /// tie-break: at equal score, the earlier timestamp ranks higher.
    pub timestamp: i64,
}

/// One shard's player set plus a cached ranked order.
///
/// Mutations only mark the cache dirty. [`ShardEngine::recompute`] is the
/// single sorting operation and is never triggered implicitly; callers batch
/// updates and recompute once before reading. A read before the first
/// recompute sees the stale (initially empty) list.
#[derive(Debug)]
pub struct ShardEngine {
    players: HashMap<String, PlayerScore>,
    ranked: Vec<(String, PlayerScore)>,
    dirty: bool,
}

impl Default for ShardEngine {
    fn default() -> Self {
        Self {
            players: HashMap::new(),
            ranked: Vec::new(),
            dirty: true,
        }
    }
}

impl ShardEngine {
    /// Create an empty engine. The cache starts dirty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a player's score and timestamp. Always succeeds.
    pub fn upsert(&mut self, player_id: impl Into<String>, score: i64, timestamp: i64) {
        self.players
            .insert(player_id.into(), PlayerScore { score, timestamp });
        self.dirty = true;
    }

    /// Delete a player. Returns whether the player existed; the cache is
    /// marked dirty only when a deletion actually occurred.
    pub fn remove(&mut self, player_id: &str) -> bool {
        let existed = self.players.remove(player_id).is_some();
        if existed {
            self.dirty = true;
        }
        existed
    }

    /// Rebuild the cached order from the player map and clear the dirty
    /// flag: score descending, ties broken by ascending timestamp. Equal
    /// score and timestamp fall back to ascending player id so the order is
    /// stable across map iteration.
    pub fn recompute(&mut self) {
        self.ranked.clear();
        self.ranked
            .extend(self.players.iter().map(|(id, ps)| (id.clone(), *ps)));
        self.ranked.sort_by(|a, b| {
            b.1.score
                .cmp(&a.1.score)
                .then(a.1.timestamp.cmp(&b.1.timestamp))
                .then(a.0.cmp(&b.0))
        });
        self.dirty = false;
        tracing::debug!(players = self.ranked.len(), "shard order recomputed");
    }

    /// Shard-local order from the last [`ShardEngine::recompute`], best
    /// first. Positions are 0-based and carry no absolute rank numbers.
    pub fn ranked(&self) -> &[(String, PlayerScore)] {
        &self.ranked
    }

    /// Whether the cached order is stale relative to the player map.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of players currently in the map.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Drop all players and the cached order, marking the cache dirty.
    pub fn clear(&mut self) {
        self.players.clear();
        self.ranked.clear();
        self.dirty = true;
    }
}
