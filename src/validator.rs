use tracing::{debug, warn};

use crate::engine::PaymentsEngine;
use crate::interfaces::{Spork, TxValidation};
use crate::types::{Amount, Block};

impl PaymentsEngine {
    /// Whether the total minted value of `block` is acceptable. Treasury
    /// heights additionally require the configured treasury outputs.
    pub fn is_block_value_valid(&self, block: &Block, expected: Amount, minted: Amount) -> bool {
        let Some(tip) = self.inner.chain.try_tip() else {
            return true;
        };
        let height = if tip.hash == block.previous_hash {
            tip.height + 1
        } else {
            match self.inner.chain.height_of(&block.previous_hash) {
                Some(parent) => parent + 1,
                None => {
                    warn!("could not find previous block, accepting value");
                    return true;
                }
            }
        };

        if self.inner.schedule.is_treasury_block(height)
            && !self.treasury_outputs_present(block, height)
        {
            if block.time > self.inner.sporks.value(Spork::TreasuryEnforcement) {
                return false;
            }
            debug!(height, "treasury enforcement inactive, accepting anyway");
        }

        if !self.inner.sync.is_synced() {
            // superblocks land in the first 100 slots of a budget cycle
            if height % self.inner.schedule.budget_cycle_blocks() < 100 {
                return true;
            }
            return minted <= expected;
        }

        if !self.inner.sporks.is_active(Spork::EnableSuperblocks) {
            return minted <= expected;
        }
        if self.inner.budget.is_budget_payment_block(height) {
            // the budget subsystem evaluates its own block value
            return true;
        }
        minted <= expected
    }

    fn treasury_outputs_present(&self, block: &Block, height: u64) -> bool {
        let tx = block.reward_transaction();
        let award = self.inner.schedule.treasury_award(height);
        let payees = self.inner.schedule.treasury_payees(height);
        let found = payees
            .iter()
            .filter(|(script, percent)| {
                let due = award * (*percent as Amount) / 100;
                tx.outputs
                    .iter()
                    .any(|out| &out.script == script && out.value == due)
            })
            .count();
        if found != payees.len() {
            warn!(height, found, expected = payees.len(), "invalid treasury payment");
            return false;
        }
        true
    }

    /// Whether the reward outputs of `block` pay the elected masternodes.
    /// Budget blocks defer to the budget subsystem, treasury blocks were
    /// already covered by the value rule.
    pub fn is_block_payee_valid(&self, block: &Block, height: u64) -> bool {
        if !self.inner.sync.is_synced() {
            debug!("client not synced, skipping payee checks");
            return true;
        }

        let proof_of_stake = block.is_proof_of_stake();
        let tx = block.reward_transaction();

        if self.inner.sporks.is_active(Spork::EnableSuperblocks)
            && self.inner.budget.is_budget_payment_block(height)
        {
            match self.inner.budget.is_transaction_valid(tx, height) {
                TxValidation::Valid => return true,
                TxValidation::Invalid => {
                    warn!(height, "invalid budget payment detected");
                    if self.inner.sporks.is_active(Spork::BudgetEnforcement) {
                        return false;
                    }
                    debug!("budget enforcement disabled, accepting block");
                }
                // a double payment or a missing vote threshold falls back to
                // the regular masternode payee for this block
                TxValidation::DoublePayment | TxValidation::VoteThreshold => {}
            }
        }

        if self.inner.schedule.is_treasury_block(height) {
            return true;
        }

        let block_value = self.inner.schedule.block_value(height, proof_of_stake);
        if self.inner.store.is_reward_tx_valid(
            tx,
            height,
            block_value,
            proof_of_stake,
            self.tally_context(),
        ) {
            return true;
        }
        warn!(height, "invalid masternode payment detected");
        if self.inner.sporks.is_active(Spork::MasternodePaymentEnforcement) {
            return false;
        }
        debug!("masternode payment enforcement disabled, accepting block");
        true
    }
}
