use tracing::{debug, info, warn};

use crate::crypto::load_keypair;
use crate::engine::PaymentsEngine;
use crate::interfaces::Inventory;
use crate::store::RANK_REFERENCE_OFFSET;
use crate::tally::SIGNATURES_TOTAL;
use crate::types::{Tier, TxInput, WinnerVote};

impl PaymentsEngine {
    /// Produces and relays this operator's winner votes for `height`, one
    /// per tier, nominating the registry's next node in the payment queue.
    /// Returns whether any vote went out.
    pub fn process_block(&self, height: u64) -> bool {
        let Some(operator) = &self.inner.config.operator else {
            return false;
        };
        if height <= self.inner.store.last_produced_height() {
            return false;
        }

        let collateral = match operator.collateral_outpoint() {
            Ok(outpoint) => TxInput::from_outpoint(outpoint),
            Err(err) => {
                warn!(?err, "invalid operator collateral");
                return false;
            }
        };

        let required = self.min_payments_protocol();
        let anchor = height.saturating_sub(RANK_REFERENCE_OFFSET);
        match self.inner.registry.rank(&collateral, anchor, required) {
            None => {
                debug!(height, "own masternode unknown, not voting");
                return false;
            }
            Some(rank) if rank > SIGNATURES_TOTAL => {
                debug!(height, rank, "not in the payment quorum, not voting");
                return false;
            }
            Some(_) => {}
        }

        if self.inner.budget.is_budget_payment_block(height) {
            // budget blocks are nominated by the budgeting subsystem
            return false;
        }

        let keypair = match load_keypair(&operator.key_path) {
            Ok(keypair) => keypair,
            Err(err) => {
                warn!(?err, "failed to load operator key");
                return false;
            }
        };

        let mut winners = Vec::new();
        for tier in Tier::ascending() {
            let Some(node) = self
                .inner
                .registry
                .next_in_payment_queue(height, tier, true)
            else {
                debug!(height, %tier, "no masternode in payment queue");
                continue;
            };

            let mut vote = WinnerVote::new(
                collateral.clone(),
                height,
                node.payout_script.clone(),
                tier,
            );
            vote.payee_input = node.collateral.clone();
            vote.sign(&keypair);

            info!(height, %tier, payee = %vote.payee_script, "voting for winner");
            match self.add_winning_vote(vote.clone()) {
                Ok(()) => winners.push(vote),
                Err(err) => debug!(?err, height, %tier, "own vote not admitted"),
            }
        }

        if winners.is_empty() {
            return false;
        }
        for vote in &winners {
            self.inner
                .network
                .relay_inventory(&Inventory::winner(vote.hash()));
        }
        self.inner.store.set_last_produced_height(height);
        true
    }
}
