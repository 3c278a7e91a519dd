use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::VoteRejection;
use crate::tally::{BlockTally, TallyContext};
use crate::types::{Amount, OutPoint, RewardTransaction, Script, Tier, WinnerVote};

/// Votes are accepted up to this many blocks past the tip.
pub const FUTURE_VOTE_WINDOW: u64 = 20;

/// Blocks past the tip inspected when deciding whether a node is already
/// scheduled for payment.
pub const SCHEDULE_LOOKAHEAD: u64 = 8;

/// Rank lookups anchor this many blocks behind the vote height so short
/// reorgs do not flip the voting quorum.
pub const RANK_REFERENCE_OFFSET: u64 = 100;

/// Retention floor for the pruning horizon.
pub const MIN_RETENTION: u64 = 1_000;

#[derive(Default)]
struct VoteTable {
    by_hash: HashMap<String, WinnerVote>,
    by_voter: HashSet<(OutPoint, Tier, u64)>,
}

impl VoteTable {
    fn index_key(vote: &WinnerVote) -> (OutPoint, Tier, u64) {
        (vote.voter.prevout, vote.payee_tier, vote.height)
    }

    fn rebuild_index(&mut self) {
        self.by_voter = self.by_hash.values().map(Self::index_key).collect();
    }
}

/// Serializable image of the election tables, captured and restored under
/// the paired locks.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub votes: Vec<(String, WinnerVote)>,
    pub tallies: Vec<(u64, BlockTally)>,
    pub last_produced_height: u64,
}

/// The per-height payee election tables: votes by content hash and tallies
/// by height. Lock order is always votes before tallies; both are taken for
/// any mutation so a half-applied vote is never observable.
#[derive(Default)]
pub struct ElectionStore {
    votes: Mutex<VoteTable>,
    tallies: Mutex<BTreeMap<u64, BlockTally>>,
    last_produced_height: Mutex<u64>,
}

impl ElectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a vote and credits its payee in the matching tally. The
    /// duplicate and one-vote-per-(voter, height, tier) checks run under the
    /// paired locks, so two racing admissions cannot both succeed.
    pub fn admit(&self, vote: WinnerVote) -> Result<(), VoteRejection> {
        let hash = vote.hash();
        let mut votes = self.votes.lock();
        let mut tallies = self.tallies.lock();

        if votes.by_hash.contains_key(&hash) {
            return Err(VoteRejection::DuplicateVote);
        }
        let key = VoteTable::index_key(&vote);
        if votes.by_voter.contains(&key) {
            return Err(VoteRejection::AlreadyVoted);
        }

        let tally = tallies
            .entry(vote.height)
            .or_insert_with(|| BlockTally::new(vote.height));
        tally.add_payee(
            vote.payee_script.clone(),
            vote.payee_tier,
            vote.payee_input.clone(),
            1,
        );
        votes.by_voter.insert(key);
        votes.by_hash.insert(hash, vote);
        Ok(())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.votes.lock().by_hash.contains_key(hash)
    }

    pub fn can_vote(&self, voter: &OutPoint, height: u64, tier: Tier) -> bool {
        !self.votes.lock().by_voter.contains(&(*voter, tier, height))
    }

    pub fn vote_count(&self) -> usize {
        self.votes.lock().by_hash.len()
    }

    /// The winning payee script for `(height, tier)`, if any votes exist.
    pub fn payee_for(&self, height: u64, tier: Tier) -> Option<Script> {
        self.tallies
            .lock()
            .get(&height)
            .and_then(|tally| tally.best_payee(tier))
            .map(|record| record.script.clone())
    }

    pub fn tally_at(&self, height: u64) -> Option<BlockTally> {
        self.tallies.lock().get(&height).cloned()
    }

    /// Applies the quorum check of the tally at `height`; heights without a
    /// tally accept any transaction.
    pub fn is_reward_tx_valid(
        &self,
        tx: &RewardTransaction,
        height: u64,
        block_value: Amount,
        proof_of_stake: bool,
        ctx: TallyContext<'_>,
    ) -> bool {
        match self.tallies.lock().get(&height) {
            Some(tally) => tally.is_reward_tx_valid(tx, block_value, proof_of_stake, ctx),
            None => true,
        }
    }

    /// True when `script` wins `tier` at any height in the schedule window
    /// `[tip, tip + SCHEDULE_LOOKAHEAD]`, excluding `exclude_height`.
    pub fn scheduled(&self, script: &Script, tier: Tier, tip: u64, exclude_height: u64) -> bool {
        let tallies = self.tallies.lock();
        for height in tip..=tip + SCHEDULE_LOOKAHEAD {
            if height == exclude_height {
                continue;
            }
            if let Some(winner) = tallies.get(&height).and_then(|tally| tally.best_payee(tier)) {
                if &winner.script == script {
                    return true;
                }
            }
        }
        false
    }

    /// Drops every vote and tally outside `[tip − horizon, tip + 20]`,
    /// reporting each evicted vote hash. When the first aged-out vote of a
    /// height goes, the whole tally for that height goes with it.
    pub fn prune(&self, tip_height: u64, horizon: u64, mut evicted: impl FnMut(&str)) {
        let floor = tip_height.saturating_sub(horizon);
        let ceiling = tip_height + FUTURE_VOTE_WINDOW;

        let mut votes = self.votes.lock();
        let mut tallies = self.tallies.lock();

        let stale: Vec<String> = votes
            .by_hash
            .iter()
            .filter(|(_, vote)| vote.height < floor || vote.height > ceiling)
            .map(|(hash, _)| hash.clone())
            .collect();
        for hash in stale {
            if let Some(vote) = votes.by_hash.remove(&hash) {
                debug!(height = vote.height, "removing aged masternode payment vote");
                votes.by_voter.remove(&VoteTable::index_key(&vote));
                tallies.remove(&vote.height);
                evicted(&hash);
            }
        }
        tallies.retain(|height, _| *height >= floor && *height <= ceiling);
    }

    /// Snapshot of `(hash, height, tier)` for every stored vote; used by the
    /// initial-sync push without holding the lock across peer writes.
    pub fn vote_refs(&self) -> Vec<(String, u64, Tier)> {
        self.votes
            .lock()
            .by_hash
            .iter()
            .map(|(hash, vote)| (hash.clone(), vote.height, vote.payee_tier))
            .collect()
    }

    pub fn oldest_height(&self) -> Option<u64> {
        self.tallies.lock().keys().next().copied()
    }

    pub fn newest_height(&self) -> Option<u64> {
        self.tallies.lock().keys().next_back().copied()
    }

    pub fn last_produced_height(&self) -> u64 {
        *self.last_produced_height.lock()
    }

    pub fn set_last_produced_height(&self, height: u64) {
        *self.last_produced_height.lock() = height;
    }

    pub fn status_line(&self) -> String {
        format!(
            "Votes: {}, Blocks: {}",
            self.votes.lock().by_hash.len(),
            self.tallies.lock().len()
        )
    }

    /// Read-only traversal for the on-disk snapshot.
    pub fn capture(&self) -> StoreSnapshot {
        let votes = self.votes.lock();
        let tallies = self.tallies.lock();
        let mut vote_entries: Vec<(String, WinnerVote)> = votes
            .by_hash
            .iter()
            .map(|(hash, vote)| (hash.clone(), vote.clone()))
            .collect();
        // deterministic order keeps repeated snapshots byte-identical
        vote_entries.sort_by(|a, b| a.0.cmp(&b.0));
        StoreSnapshot {
            votes: vote_entries,
            tallies: tallies
                .iter()
                .map(|(height, tally)| (*height, tally.clone()))
                .collect(),
            last_produced_height: *self.last_produced_height.lock(),
        }
    }

    /// Replaces the store contents wholesale from a snapshot, rebuilding the
    /// one-vote-per-voter index.
    pub fn restore(&self, snapshot: StoreSnapshot) {
        let mut votes = self.votes.lock();
        let mut tallies = self.tallies.lock();
        votes.by_hash = snapshot.votes.into_iter().collect();
        votes.rebuild_index();
        *tallies = snapshot.tallies.into_iter().collect();
        *self.last_produced_height.lock() = snapshot.last_produced_height;
    }
}
