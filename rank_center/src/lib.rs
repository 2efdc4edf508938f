//! Leaderboard coordinator: rank-range registry, per-shard snapshots and
//! player indices, and the cross-shard queries built on top of them.
#![deny(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Shard identifier.
pub type ShardId = u64;

/// Immutable snapshot of one player's standing at publish time. Lives only
/// inside a shard's published list and the derived indices; any change
/// replaces the whole containing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Player identifier.
    pub player_id: String,
    /// Score at publish time.
    pub score: i64,
    /// Absolute rank, 1-based and global across all shards.
    pub rank: u64,
    /// Time the score was reached (epoch seconds).
    pub timestamp: i64,
}

/// A shard's slice of the global rank space, both bounds inclusive.
///
/// Ranges are registered independently per shard; nothing here enforces
/// disjointness, so overlapping or gapped ranges are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardRange {
    /// Owning shard.
    pub shard_id: ShardId,
    /// Lowest absolute rank held by the shard (>= 1).
    pub min_rank: u64,
    /// Highest absolute rank held by the shard (>= `min_rank`).
    pub max_rank: u64,
}

/// Rejected rank range on [`RankCenter::set_range`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    /// Absolute ranks are 1-based.
    #[error("min rank must be at least 1")]
    MinBelowOne,
    /// The upper bound sits below the lower bound.
    #[error("max rank {max} is below min rank {min}")]
    MaxBelowMin {
        /// Requested lower bound.
        min: u64,
        /// Requested upper bound.
        max: u64,
    },
}

/// Coordinator over all shards.
///
/// Owns the range registry, the last list each shard published, and two
/// derived player indices. The indices are rebuilt together, one shard at a
/// time: a shard's old entries are removed in full before its new entries
/// are inserted in full, so for every indexed player the shard index and the
/// entry index agree with that shard's latest push. A player missing from a
/// newer push simply disappears from the indices.
#[derive(Debug, Default)]
pub struct RankCenter {
    ranges: HashMap<ShardId, ShardRange>,
    /// `ranges` sorted ascending by `min_rank`; defines the merge order for
    /// range-spanning queries. Rebuilt on every range mutation.
    ordered_ranges: Vec<ShardRange>,
    shard_data: HashMap<ShardId, Vec<RankedEntry>>,
    player_shard: HashMap<String, ShardId>,
    player_entry: HashMap<String, RankedEntry>,
}

impl RankCenter {
    /// Create an empty coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a shard's rank range. Invalid bounds leave all
    /// state untouched. Idempotent for identical input.
    pub fn set_range(
        &mut self,
        shard_id: ShardId,
        min_rank: u64,
        max_rank: u64,
    ) -> Result<(), RangeError> {
        if min_rank < 1 {
            return Err(RangeError::MinBelowOne);
        }
        if max_rank < min_rank {
            return Err(RangeError::MaxBelowMin {
                min: min_rank,
                max: max_rank,
            });
        }
        self.ranges.insert(
            shard_id,
            ShardRange {
                shard_id,
                min_rank,
                max_rank,
            },
        );
        self.rebuild_ordered_ranges();
        Ok(())
    }

    /// The shard's registered range, if any.
    pub fn get_range(&self, shard_id: ShardId) -> Option<ShardRange> {
        self.ranges.get(&shard_id).copied()
    }

    /// Drop a shard's range, its published data, and every index entry
    /// pointing at it. Returns whether the shard was known to either the
    /// range or the data registry.
    pub fn remove_shard(&mut self, shard_id: ShardId) -> bool {
        let had_range = self.ranges.remove(&shard_id).is_some();
        let had_data = self.shard_data.remove(&shard_id).is_some();
        self.purge_index(shard_id);
        if had_range {
            self.rebuild_ordered_ranges();
        }
        if had_range || had_data {
            tracing::debug!(shard_id, "shard removed");
            true
        } else {
            false
        }
    }

    /// Number of shards with a registered range.
    pub fn shard_count(&self) -> usize {
        self.ranges.len()
    }

    /// Drop all ranges, data and indices.
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.ordered_ranges.clear();
        self.shard_data.clear();
        self.player_shard.clear();
        self.player_entry.clear();
    }

    /// Replace a shard's published list wholesale and reindex its players.
    ///
    /// `entries` must already be sorted ascending by absolute rank; the
    /// coordinator trusts both the order and the rank values. If a player id
    /// appears more than once in `entries`, the last occurrence wins in the
    /// indices (caller contract: avoid duplicates).
    pub fn update_rank_data(&mut self, shard_id: ShardId, entries: Vec<RankedEntry>) {
        tracing::debug!(shard_id, entries = entries.len(), "rank data replaced");
        self.purge_index(shard_id);
        for entry in &entries {
            self.player_shard.insert(entry.player_id.clone(), shard_id);
            self.player_entry
                .insert(entry.player_id.clone(), entry.clone());
        }
        self.shard_data.insert(shard_id, entries);
    }

    /// The player's entry from the latest push of its shard, if indexed.
    pub fn get_player_entry(&self, player_id: &str) -> Option<&RankedEntry> {
        self.player_entry.get(player_id)
    }

    /// The shard currently holding the player, if indexed.
    pub fn get_shard_id_for_player(&self, player_id: &str) -> Option<ShardId> {
        self.player_shard.get(player_id).copied()
    }

    /// First shard, in ascending range order, whose published data contains
    /// an entry with exactly this score.
    ///
    /// Linear over all published entries: shard data is sorted by rank, not
    /// score, so without a separate score index there is nothing to binary
    /// search.
    pub fn get_shard_id_for_score(&self, score: i64) -> Option<ShardId> {
        for range in &self.ordered_ranges {
            let Some(entries) = self.shard_data.get(&range.shard_id) else {
                continue;
            };
            if entries.iter().any(|e| e.score == score) {
                return Some(range.shard_id);
            }
        }
        None
    }

    /// The first `n` entries of the global order, walking shards ascending
    /// by range and taking each shard's data as published.
    ///
    /// Stops as soon as `n` entries are collected. A shard holding fewer
    /// entries than its stated range is not compensated for: later shards
    /// are appended in range order regardless, so rank gaps stay gaps.
    pub fn get_top_n(&self, n: i64) -> Vec<RankedEntry> {
        let mut result = Vec::new();
        if n <= 0 {
            return result;
        }
        let n = n as usize;
        for range in &self.ordered_ranges {
            let Some(entries) = self.shard_data.get(&range.shard_id) else {
                continue;
            };
            for entry in entries {
                if result.len() >= n {
                    return result;
                }
                result.push(entry.clone());
            }
        }
        result
    }

    /// Entries whose absolute rank falls within `around_n` of the player's
    /// own, ascending by rank. Empty for a negative `around_n` or an
    /// unindexed player.
    ///
    /// The window can straddle shard boundaries anywhere, so this scans
    /// every shard's data rather than walking ranges. Rank is the collection
    /// key: each rank value maps to at most one returned entry.
    pub fn get_rank_around(&self, player_id: &str, around_n: i64) -> Vec<RankedEntry> {
        if around_n < 0 {
            return Vec::new();
        }
        let Some(player) = self.player_entry.get(player_id) else {
            return Vec::new();
        };
        let around_n = around_n as u64;
        let lo = player.rank.saturating_sub(around_n).max(1);
        let hi = player.rank + around_n;

        let mut by_rank: BTreeMap<u64, &RankedEntry> = BTreeMap::new();
        for entries in self.shard_data.values() {
            for entry in entries {
                if entry.rank >= lo && entry.rank <= hi {
                    by_rank.insert(entry.rank, entry);
                }
            }
        }
        by_rank.into_values().cloned().collect()
    }

    fn rebuild_ordered_ranges(&mut self) {
        self.ordered_ranges.clear();
        self.ordered_ranges.extend(self.ranges.values().copied());
        self.ordered_ranges.sort_by_key(|r| r.min_rank);
    }

    /// Remove every index entry attributed to `shard_id`. Both indices are
    /// always purged in the same pass.
    fn purge_index(&mut self, shard_id: ShardId) {
        self.player_shard.retain(|player_id, owner| {
            if *owner == shard_id {
                self.player_entry.remove(player_id);
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(player_id: &str, score: i64, rank: u64) -> RankedEntry {
        RankedEntry {
            player_id: player_id.to_string(),
            score,
            rank,
            timestamp: 1_700_000_000 + rank as i64,
        }
    }

    /// Shard 1 holds ranks 1-3 (X, Y, Z), shard 2 holds ranks 4-6 (W, V, U).
    fn two_shard_center() -> RankCenter {
        let mut center = RankCenter::new();
        center.set_range(1, 1, 3).unwrap();
        center.set_range(2, 4, 6).unwrap();
        center.update_rank_data(1, vec![entry("X", 900, 1), entry("Y", 800, 2), entry("Z", 700, 3)]);
        center.update_rank_data(2, vec![entry("W", 600, 4), entry("V", 500, 5), entry("U", 400, 6)]);
        center
    }

    fn ids(entries: &[RankedEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.player_id.as_str()).collect()
    }

    #[test]
    fn set_range_validates_bounds() {
        let mut center = RankCenter::new();
        assert_eq!(center.set_range(1, 0, 5), Err(RangeError::MinBelowOne));
        assert_eq!(
            center.set_range(1, 10, 5),
            Err(RangeError::MaxBelowMin { min: 10, max: 5 })
        );
        assert_eq!(center.get_range(1), None);
        assert_eq!(center.shard_count(), 0);

        center.set_range(1, 1, 10_000).unwrap();
        let range = center.get_range(1).unwrap();
        assert_eq!((range.min_rank, range.max_rank), (1, 10_000));

        // A later invalid call leaves the prior range untouched.
        assert!(center.set_range(1, 5, 2).is_err());
        assert_eq!(center.get_range(1).unwrap().min_rank, 1);
    }

    #[test]
    fn overlapping_ranges_are_accepted() {
        let mut center = RankCenter::new();
        center.set_range(1, 1, 100).unwrap();
        center.set_range(2, 50, 150).unwrap();
        assert_eq!(center.shard_count(), 2);
    }

    #[test]
    fn update_rank_data_is_idempotent() {
        let mut center = two_shard_center();
        let before: Vec<_> = ["X", "Y", "Z"]
            .iter()
            .map(|p| center.get_player_entry(p).cloned().unwrap())
            .collect();
        center.update_rank_data(1, vec![entry("X", 900, 1), entry("Y", 800, 2), entry("Z", 700, 3)]);
        for (p, old) in ["X", "Y", "Z"].iter().zip(&before) {
            assert_eq!(center.get_player_entry(p), Some(old));
            assert_eq!(center.get_shard_id_for_player(p), Some(1));
        }
    }

    #[test]
    fn reindex_drops_players_missing_from_new_push() {
        let mut center = two_shard_center();
        center.update_rank_data(1, vec![entry("X", 900, 1), entry("Q", 650, 2)]);
        assert_eq!(center.get_player_entry("Y"), None);
        assert_eq!(center.get_shard_id_for_player("Z"), None);
        assert_eq!(center.get_player_entry("Q").unwrap().rank, 2);
        // The other shard's index is untouched.
        assert_eq!(center.get_shard_id_for_player("W"), Some(2));
    }

    #[test]
    fn duplicate_player_in_push_last_write_wins() {
        let mut center = RankCenter::new();
        center.set_range(1, 1, 10).unwrap();
        center.update_rank_data(1, vec![entry("X", 900, 1), entry("X", 850, 2)]);
        assert_eq!(center.get_player_entry("X").unwrap().rank, 2);
    }

    #[test]
    fn shard_for_score_walks_ranges_in_order() {
        let mut center = two_shard_center();
        assert_eq!(center.get_shard_id_for_score(800), Some(1));
        assert_eq!(center.get_shard_id_for_score(400), Some(2));
        assert_eq!(center.get_shard_id_for_score(123), None);

        // Same score in both shards: the lower-ranged shard wins.
        center.update_rank_data(2, vec![entry("W", 700, 4)]);
        assert_eq!(center.get_shard_id_for_score(700), Some(1));
    }

    #[test]
    fn top_n_merges_in_range_order() {
        let center = two_shard_center();
        assert_eq!(ids(&center.get_top_n(5)), vec!["X", "Y", "Z", "W", "V"]);
        assert_eq!(ids(&center.get_top_n(2)), vec!["X", "Y"]);
        assert!(center.get_top_n(0).is_empty());
        assert!(center.get_top_n(-3).is_empty());
        // Asking past the population returns what exists.
        assert_eq!(center.get_top_n(100).len(), 6);
    }

    #[test]
    fn top_n_does_not_backfill_short_shards() {
        let mut center = two_shard_center();
        // Shard 1 claims ranks 1-3 but publishes only rank 1.
        center.update_rank_data(1, vec![entry("X", 900, 1)]);
        assert_eq!(ids(&center.get_top_n(4)), vec!["X", "W", "V", "U"]);
    }

    #[test]
    fn rank_around_spans_shards() {
        let center = two_shard_center();
        // Z sits at rank 3, the shard 1 / shard 2 boundary.
        assert_eq!(ids(&center.get_rank_around("Z", 1)), vec!["Y", "Z", "W"]);
        assert_eq!(ids(&center.get_rank_around("X", 2)), vec!["X", "Y", "Z"]);
        assert_eq!(ids(&center.get_rank_around("U", 10)).len(), 6);
    }

    #[test]
    fn rank_around_zero_returns_self() {
        let center = two_shard_center();
        let result = center.get_rank_around("V", 0);
        assert_eq!(ids(&result), vec!["V"]);
        assert_eq!(result[0].rank, center.get_player_entry("V").unwrap().rank);
    }

    #[test]
    fn rank_around_rejects_negative_and_unknown() {
        let center = two_shard_center();
        assert!(center.get_rank_around("Z", -1).is_empty());
        assert!(center.get_rank_around("nobody", 3).is_empty());
    }

    #[test]
    fn remove_shard_purges_indices() {
        let mut center = two_shard_center();
        assert!(center.remove_shard(1));
        assert_eq!(center.get_player_entry("X"), None);
        assert_eq!(center.get_shard_id_for_player("Y"), None);
        assert_eq!(center.get_range(1), None);
        assert_eq!(center.shard_count(), 1);
        assert_eq!(ids(&center.get_top_n(6)), vec!["W", "V", "U"]);

        assert!(!center.remove_shard(1));
        assert!(!center.remove_shard(99));
    }

    #[test]
    fn remove_shard_with_data_but_no_range() {
        let mut center = RankCenter::new();
        center.update_rank_data(7, vec![entry("X", 10, 1)]);
        assert!(center.remove_shard(7));
        assert_eq!(center.get_player_entry("X"), None);
    }

    #[test]
    fn queries_are_safe_on_empty_state() {
        let mut center = RankCenter::new();
        assert!(center.get_top_n(10).is_empty());
        assert!(center.get_rank_around("X", 1).is_empty());
        assert_eq!(center.get_shard_id_for_score(5), None);
        center.clear();
        assert_eq!(center.shard_count(), 0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut center = two_shard_center();
        center.clear();
        assert_eq!(center.shard_count(), 0);
        assert_eq!(center.get_player_entry("X"), None);
        assert!(center.get_top_n(5).is_empty());
    }

    #[test]
    fn entries_serialize_round_trip() {
        let e = entry("X", 900, 1);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(serde_json::from_str::<RankedEntry>(&json).unwrap(), e);
    }
}
