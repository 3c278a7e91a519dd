use tracing::{debug, info};

use crate::engine::PaymentsEngine;
use crate::interfaces::Spork;
use crate::types::{Amount, RewardTransaction, Script, Tier, TxOut};

impl PaymentsEngine {
    /// Appends the reward outputs for the block this node is producing at
    /// `tip + 1`, dispatching budget and treasury heights to their owner.
    pub fn fill_block_payee(
        &self,
        tx: &mut RewardTransaction,
        fees: Amount,
        proof_of_stake: bool,
        zerocoin_stake: bool,
        block_value: Amount,
    ) {
        let Some(tip) = self.inner.chain.try_tip() else {
            return;
        };
        let next_height = tip.height + 1;

        if self.inner.sporks.is_active(Spork::EnableSuperblocks)
            && self.inner.budget.is_budget_payment_block(next_height)
        {
            self.inner
                .budget
                .fill_block_payee(tx, fees, proof_of_stake, block_value);
        } else if self.inner.schedule.is_treasury_block(next_height) {
            self.inner
                .budget
                .fill_treasury_payee(tx, fees, proof_of_stake, block_value);
        } else {
            self.fill_masternode_payees(tx, next_height, proof_of_stake, zerocoin_stake, block_value);
        }
    }

    fn fill_masternode_payees(
        &self,
        tx: &mut RewardTransaction,
        next_height: u64,
        proof_of_stake: bool,
        zerocoin_stake: bool,
        block_value: Amount,
    ) {
        let pay_new_tiers = self.inner.sporks.is_active(Spork::NewTiers);
        let mut level: usize = 1;
        let mut stake_outputs: usize = 1;
        let mut payments_total: Amount = 0;

        for tier in Tier::ascending().filter(|tier| pay_new_tiers || *tier == Tier::MAX) {
            let payee = match self.resolve_payee(next_height, tier) {
                Some(script) => script,
                None => {
                    debug!(%tier, "failed to detect masternode to pay");
                    continue;
                }
            };
            let payment = self.inner.schedule.masternode_payment(
                next_height,
                block_value,
                proof_of_stake,
                tier,
                0,
                zerocoin_stake,
            );

            if proof_of_stake {
                // vout[0] stays null on proof of stake; the stake reward may
                // already be split across several outputs, so charge the
                // payment back against all of them
                let appended_at = tx.outputs.len();
                if level == 1 {
                    stake_outputs = appended_at - 1;
                }
                tx.push_output(payment, payee.clone());
                if stake_outputs >= 1 && !tx.outputs[1].is_zerocoin_mint() {
                    if stake_outputs == 1 {
                        tx.outputs[1].value -= payment;
                    } else if stake_outputs > 1 {
                        let split = payment / stake_outputs as Amount;
                        let remainder = payment - split * stake_outputs as Amount;
                        for out in &mut tx.outputs[1..=stake_outputs] {
                            out.value -= split;
                        }
                        // uneven division: the dust lands on the last output
                        tx.outputs[stake_outputs].value -= remainder;
                    }
                }
            } else {
                if tx.outputs.len() < 1 + level {
                    tx.outputs.resize(1 + level, TxOut::default());
                }
                tx.outputs[level] = TxOut::new(payment, payee.clone());
                if level == 1 {
                    tx.outputs[0].value = block_value - payment;
                } else {
                    tx.outputs[0].value -= payment;
                }
            }

            payments_total += payment;
            level += 1;
            info!(%tier, payment, payee = %payee, "masternode payment");
        }

        if payments_total > 0 {
            debug!(height = next_height, payments_total, "masternode payments filled");
        }
    }

    /// The elected payee for `(height, tier)`, falling back to the registry's
    /// current rank-1 node when no election exists.
    fn resolve_payee(&self, height: u64, tier: Tier) -> Option<Script> {
        if let Some(script) = self.inner.store.payee_for(height, tier) {
            return Some(script);
        }
        self.inner
            .registry
            .top_ranked(tier)
            .map(|node| node.payout_script)
    }
}
