use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interfaces::{OverlayRegistry, RewardSchedule, Spork, SporkOracle};
use crate::types::{Amount, RewardTransaction, Script, Tier, TxInput};

/// Votes required before a payee is enforced against blocks.
pub const SIGNATURES_REQUIRED: u32 = 6;

/// Rank ceiling for voting masternodes.
pub const SIGNATURES_TOTAL: u32 = 10;

/// Collaborators consulted while judging a reward transaction.
#[derive(Clone, Copy)]
pub struct TallyContext<'a> {
    pub sporks: &'a dyn SporkOracle,
    pub registry: &'a dyn OverlayRegistry,
    pub schedule: &'a dyn RewardSchedule,
}

/// One nominated payee at one height: script, tier and accumulated votes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayeeRecord {
    pub script: Script,
    pub tier: Tier,
    pub collateral: TxInput,
    pub votes: u32,
}

impl PayeeRecord {
    pub fn qualified(&self) -> bool {
        self.votes >= SIGNATURES_REQUIRED
    }
}

/// All payee records for one block height.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockTally {
    pub height: u64,
    pub payees: Vec<PayeeRecord>,
}

impl BlockTally {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            payees: Vec::new(),
        }
    }

    /// Credits `weight` votes to the record matching `(script, tier)`,
    /// creating it on first nomination.
    pub fn add_payee(&mut self, script: Script, tier: Tier, collateral: TxInput, weight: u32) {
        if let Some(record) = self
            .payees
            .iter_mut()
            .find(|record| record.tier == tier && record.script == script)
        {
            record.votes += weight;
            return;
        }
        self.payees.push(PayeeRecord {
            script,
            tier,
            collateral,
            votes: weight,
        });
    }

    /// The winning payee script for `tier`: most votes, ties broken by the
    /// bytewise-lowest script.
    pub fn best_payee(&self, tier: Tier) -> Option<&PayeeRecord> {
        let mut best: Option<&PayeeRecord> = None;
        for record in self.payees.iter().filter(|record| record.tier == tier) {
            let better = match best {
                None => true,
                Some(current) => {
                    record.votes > current.votes
                        || (record.votes == current.votes && record.script < current.script)
                }
            };
            if better {
                best = Some(record);
            }
        }
        best
    }

    /// Checks that `tx` pays every tier with a qualified payee at least the
    /// curve amount, within the drift allowance. Without any quorum the
    /// longest chain wins and everything is accepted.
    pub fn is_reward_tx_valid(
        &self,
        tx: &RewardTransaction,
        block_value: Amount,
        proof_of_stake: bool,
        ctx: TallyContext<'_>,
    ) -> bool {
        let pay_new_tiers = ctx.sporks.is_active(Spork::NewTiers);
        let drift = if ctx.sporks.is_active(Spork::MasternodePaymentEnforcement) {
            ctx.registry.stable_size() + ctx.schedule.count_drift()
        } else {
            // peers disagree on the live count; only a larger count can lower
            // the required payment, so the allowance is additive
            ctx.registry.size() + ctx.schedule.count_drift()
        };

        let mut max_by_tier: HashMap<Tier, u32> = HashMap::new();
        for payee in &self.payees {
            if !payee.qualified() || (!pay_new_tiers && payee.tier != Tier::MAX) {
                continue;
            }
            let entry = max_by_tier.entry(payee.tier).or_insert(payee.votes);
            if payee.votes > *entry {
                *entry = payee.votes;
            }
        }

        if max_by_tier.is_empty() {
            debug!(height = self.height, "no payee quorum, accepting");
            return true;
        }

        let mut missing = String::new();
        for payee in &self.payees {
            if !payee.qualified() || (!pay_new_tiers && payee.tier != Tier::MAX) {
                continue;
            }
            let required = ctx.schedule.masternode_payment(
                self.height,
                block_value,
                proof_of_stake,
                payee.tier,
                drift,
                tx.zerocoin_spend,
            );
            let paid = tx
                .outputs
                .iter()
                .any(|out| {
                    let is_payee = out.script == payee.script;
                    if is_payee && out.value < required {
                        debug!(
                            paid = out.value,
                            required,
                            "masternode payment below drift range"
                        );
                    }
                    is_payee && out.value >= required
                });
            if paid {
                max_by_tier.remove(&payee.tier);
                if max_by_tier.is_empty() {
                    return true;
                }
                continue;
            }
            if !missing.is_empty() {
                missing.push_str(", ");
            }
            missing.push_str(&format!("{}:{}", payee.tier, payee.script));
        }

        debug!(height = self.height, %missing, "missing required masternode payment");
        false
    }

    /// Human-readable `"script:tier:votes"` listing for RPC surfaces.
    pub fn required_payments_string(&self) -> String {
        let mut rendered = String::new();
        for payee in &self.payees {
            if !rendered.is_empty() {
                rendered.push_str(", ");
            }
            rendered.push_str(&format!("{}:{}:{}", payee.script, payee.tier, payee.votes));
        }
        if rendered.is_empty() {
            "Unknown".to_string()
        } else {
            rendered
        }
    }
}
