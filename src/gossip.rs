use std::collections::HashMap;

use tracing::{debug, warn};

use crate::crypto::public_key_from_hex;
use crate::engine::PaymentsEngine;
use crate::errors::VoteRejection;
use crate::interfaces::{Inventory, OverlayNode, PaymentsPeer};
use crate::store::{FUTURE_VOTE_WINDOW, RANK_REFERENCE_OFFSET};
use crate::tally::SIGNATURES_TOTAL;
use crate::types::{Tier, WinnerVote};

/// Wire command carrying a winner vote.
pub const WINNER_COMMAND: &str = "mnw";

/// Wire command closing a sync chunk.
pub const SYNC_STATUS_COMMAND: &str = "ssc";

impl PaymentsEngine {
    /// Decodes and processes an inbound `"mnw"` payload.
    pub fn process_winner_bytes(
        &self,
        peer: &dyn PaymentsPeer,
        payload: &[u8],
    ) -> Result<(), VoteRejection> {
        let vote: WinnerVote =
            bincode::deserialize(payload).map_err(|_| VoteRejection::Decode)?;
        self.process_winner(peer, vote)
    }

    /// Full inbound handling of one winner vote: resolution, dedup, window,
    /// double-vote, validity, signature, admission and relay. Peer scoring
    /// follows the rejection kind.
    pub fn process_winner(
        &self,
        peer: &dyn PaymentsPeer,
        mut vote: WinnerVote,
    ) -> Result<(), VoteRejection> {
        if !self.inner.sync.is_blockchain_synced() || self.inner.config.lite_mode {
            return Err(VoteRejection::NotSynced);
        }
        let required = self.min_payments_protocol();
        if peer.protocol_version() < required {
            return Err(VoteRejection::ProtocolTooOld {
                version: peer.protocol_version(),
                required,
            });
        }
        let tip = self.inner.chain.try_tip().ok_or(VoteRejection::ChainBusy)?;

        if self.resolve_payee_node(peer, &mut vote).is_none() {
            // repeated unknown payees add up to a ban
            peer.misbehaving(2);
            return Err(VoteRejection::UnknownVoter);
        }

        let hash = vote.hash();
        if self.inner.store.contains(&hash) {
            debug!(peer = peer.id(), height = vote.height, "winner already seen");
            self.inner.sync.note_winner(&hash);
            return Err(VoteRejection::DuplicateVote);
        }

        let reach = (self.inner.registry.count_enabled(vote.payee_tier) as u64) * 5 / 4;
        let first_block = tip.height.saturating_sub(reach);
        if vote.height < first_block || vote.height > tip.height + FUTURE_VOTE_WINDOW {
            debug!(
                peer = peer.id(),
                height = vote.height,
                tip = tip.height,
                "winner out of range"
            );
            peer.misbehaving(1);
            return Err(VoteRejection::StaleWindow);
        }

        if !self
            .inner
            .store
            .can_vote(&vote.voter.prevout, vote.height, vote.payee_tier)
        {
            debug!(peer = peer.id(), height = vote.height, "masternode already voted");
            peer.misbehaving(1);
            return Err(VoteRejection::AlreadyVoted);
        }

        let voter = match self.check_winner_validity(peer, &vote) {
            Ok(node) => node,
            Err(err) => {
                if let VoteRejection::BadRank { rank } = err {
                    // nodes commonly misjudge the top 10; only punish the
                    // ones that are way off
                    if rank > SIGNATURES_TOTAL * 2 && self.inner.sync.is_synced() {
                        warn!(peer = peer.id(), rank, "voter far outside payment quorum");
                        peer.misbehaving(20);
                    }
                }
                return Err(err);
            }
        };

        let operator_key = public_key_from_hex(&voter.operator_key)
            .map_err(|_| VoteRejection::BadSignature)?;
        if vote.verify_signature(&operator_key).is_err() {
            if self.inner.sync.is_synced() {
                warn!(peer = peer.id(), "invalid winner signature");
                peer.misbehaving(20);
            }
            // it could just be a non-synced masternode on our side
            self.inner.registry.request_node(peer.id(), &vote.voter);
            return Err(VoteRejection::BadSignature);
        }

        self.add_winning_vote(vote)?;
        debug!(peer = peer.id(), %hash, "winning vote admitted");
        self.inner.network.relay_inventory(&Inventory::winner(hash.clone()));
        self.inner.sync.note_winner(&hash);
        Ok(())
    }

    /// Resolves the nominated payee to a registry node. Legacy votes carry
    /// no payee collateral; those resolve by script and are backfilled with
    /// the registry's tier and collateral.
    fn resolve_payee_node(
        &self,
        peer: &dyn PaymentsPeer,
        vote: &mut WinnerVote,
    ) -> Option<OverlayNode> {
        if vote.payee_input.is_empty() {
            match self.inner.registry.find_by_script(&vote.payee_script) {
                Some(node) => {
                    vote.payee_tier = node.tier;
                    vote.payee_input = node.collateral.clone();
                    Some(node)
                }
                None => {
                    debug!(peer = peer.id(), payee = %vote.payee_script, "unknown payee");
                    self.inner.registry.request_list_update(peer.id());
                    None
                }
            }
        } else {
            match self.inner.registry.find_by_input(&vote.payee_input) {
                Some(node) => Some(node),
                None => {
                    debug!(peer = peer.id(), payee = %vote.payee_script, "unknown payee");
                    self.inner.registry.request_node(peer.id(), &vote.payee_input);
                    None
                }
            }
        }
    }

    /// The vote-level validity rule: known voter, acceptable protocol, and a
    /// rank inside the signing quorum at `height − 100`.
    fn check_winner_validity(
        &self,
        peer: &dyn PaymentsPeer,
        vote: &WinnerVote,
    ) -> Result<OverlayNode, VoteRejection> {
        let voter = match self.inner.registry.find_by_input(&vote.voter) {
            Some(node) => node,
            None => {
                debug!(voter = %vote.voter.prevout, "unknown voting masternode");
                self.inner.registry.request_node(peer.id(), &vote.voter);
                return Err(VoteRejection::UnknownVoter);
            }
        };

        let required = self.min_payments_protocol();
        if voter.protocol_version < required {
            return Err(VoteRejection::ProtocolTooOld {
                version: voter.protocol_version,
                required,
            });
        }

        let anchor = vote
            .height
            .saturating_sub(RANK_REFERENCE_OFFSET);
        let rank = self
            .inner
            .registry
            .rank(&vote.voter, anchor, required)
            .ok_or(VoteRejection::ChainBusy)?;
        if rank > SIGNATURES_TOTAL {
            return Err(VoteRejection::BadRank { rank });
        }
        Ok(voter)
    }

    /// Initial-sync push: advertises every stored vote inside the per-tier
    /// window `[tip − cap, tip + 20]` to `peer`, then sends the chunk marker.
    pub fn sync_to_peer(&self, peer: &dyn PaymentsPeer, count_needed: u32) {
        let Some(tip) = self.inner.chain.try_tip() else {
            return;
        };

        let mut caps: HashMap<Tier, u64> = HashMap::new();
        for tier in Tier::ascending() {
            let enabled = (self.inner.registry.count_enabled(tier) as u64) * 5 / 4;
            caps.insert(tier, enabled.min(count_needed as u64));
        }

        let mut pushed = 0u32;
        for (hash, height, tier) in self.inner.store.vote_refs() {
            let cap = caps.get(&tier).copied().unwrap_or(0);
            let in_window = height >= tip.height.saturating_sub(cap)
                && height <= tip.height + FUTURE_VOTE_WINDOW;
            if !in_window {
                continue;
            }
            peer.push_inventory(&Inventory::winner(hash));
            pushed += 1;
        }
        peer.push_sync_status(pushed);
        debug!(peer = peer.id(), pushed, "payment votes synced");
    }
}
