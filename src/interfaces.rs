use serde::{Deserialize, Serialize};

use crate::types::{Amount, RewardTransaction, Script, Tier, TxInput};

/// Snapshot of the active chain tip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TipInfo {
    pub height: u64,
    pub hash: String,
    pub time: u64,
}

/// Read-only view of the block chain consulted by payment consensus.
pub trait ChainView: Send + Sync {
    /// Non-blocking tip lookup. `None` means the chain lock was contended or
    /// no tip exists yet; callers treat it as a benign "not ready".
    fn try_tip(&self) -> Option<TipInfo>;

    /// Hash of the main-chain block at `height`, if that height exists.
    fn block_hash_at(&self, height: u64) -> Option<String>;

    /// Main-chain height of the block with the given hash.
    fn height_of(&self, hash: &str) -> Option<u64>;
}

/// A masternode as seen through the overlay registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlayNode {
    pub collateral: TxInput,
    pub payout_script: Script,
    pub tier: Tier,
    pub protocol_version: u32,
    pub operator_key: String,
}

/// The masternode registry: collateral lookup, ranking and payment queueing.
pub trait OverlayRegistry: Send + Sync {
    fn find_by_input(&self, input: &TxInput) -> Option<OverlayNode>;
    fn find_by_script(&self, script: &Script) -> Option<OverlayNode>;

    /// Deterministic rank of `input` among nodes of its tier at the given
    /// reference height, restricted to nodes meeting `min_protocol`.
    fn rank(&self, input: &TxInput, ref_height: u64, min_protocol: u32) -> Option<u32>;

    fn count_enabled(&self, tier: Tier) -> u32;

    /// Node count ignoring recently activated entries, used while payment
    /// enforcement is active.
    fn stable_size(&self) -> u32;

    fn size(&self) -> u32;

    /// The oldest-paid eligible node of `tier` for `height`, or `None`.
    fn next_in_payment_queue(&self, height: u64, tier: Tier, filter_recent: bool)
        -> Option<OverlayNode>;

    /// The currently rank-1 node of `tier`; the builder's fallback payee
    /// when no election exists for the next height.
    fn top_ranked(&self, tier: Tier) -> Option<OverlayNode>;

    /// Ask the peer for its full masternode list (rate limited downstream).
    fn request_list_update(&self, peer_id: u64);

    /// Ask the peer for one missing masternode entry.
    fn request_node(&self, peer_id: u64, input: &TxInput);
}

/// Verdict of the budget subsystem on a candidate reward transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxValidation {
    Valid,
    Invalid,
    DoublePayment,
    VoteThreshold,
}

/// The treasury/superblock budget subsystem; owns budget and treasury blocks.
pub trait BudgetOracle: Send + Sync {
    fn is_budget_payment_block(&self, height: u64) -> bool;
    fn is_transaction_valid(&self, tx: &RewardTransaction, height: u64) -> TxValidation;
    fn fill_block_payee(
        &self,
        tx: &mut RewardTransaction,
        fees: Amount,
        proof_of_stake: bool,
        block_value: Amount,
    );
    fn fill_treasury_payee(
        &self,
        tx: &mut RewardTransaction,
        fees: Amount,
        proof_of_stake: bool,
        block_value: Amount,
    );
    fn required_payments_string(&self, height: u64) -> String;
}

/// Runtime feature flags recognised by payment consensus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Spork {
    MasternodePaymentEnforcement,
    BudgetEnforcement,
    PayUpdatedNodes,
    EnableSuperblocks,
    TreasuryEnforcement,
    NewTiers,
}

/// Authenticated runtime flag oracle.
pub trait SporkOracle: Send + Sync {
    fn is_active(&self, spork: Spork) -> bool;

    /// Raw spork value; treasury enforcement compares it against block time.
    fn value(&self, spork: Spork) -> u64;
}

/// The chain's reward curve and treasury schedule.
pub trait RewardSchedule: Send + Sync {
    fn block_value(&self, height: u64, proof_of_stake: bool) -> Amount;
    fn masternode_payment(
        &self,
        height: u64,
        block_value: Amount,
        proof_of_stake: bool,
        tier: Tier,
        drift: u32,
        zerocoin_spend: bool,
    ) -> Amount;
    fn is_treasury_block(&self, height: u64) -> bool;
    fn treasury_award(&self, height: u64) -> Amount;

    /// Configured treasury payees with their percentage shares.
    fn treasury_payees(&self, height: u64) -> Vec<(Script, u8)>;

    fn budget_cycle_blocks(&self) -> u64;

    /// Allowance absorbing masternode-count skew between peers.
    fn count_drift(&self) -> u32;
}

/// Initial-sync coordinator tracking which winners this node has seen.
pub trait SyncTracker: Send + Sync {
    fn is_blockchain_synced(&self) -> bool;
    fn is_synced(&self) -> bool;
    fn note_winner(&self, hash: &str);
    fn forget_winner(&self, hash: &str);
}

/// Inventory kinds advertised by this subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvKind {
    MasternodeWinner,
}

/// Inventory advertisement keyed by a winner vote's content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inventory {
    pub kind: InvKind,
    pub hash: String,
}

impl Inventory {
    pub fn winner(hash: String) -> Self {
        Self {
            kind: InvKind::MasternodeWinner,
            hash,
        }
    }
}

/// Outbound surface of a connected peer.
pub trait PaymentsPeer: Send + Sync {
    fn id(&self) -> u64;
    fn protocol_version(&self) -> u32;
    fn push_inventory(&self, inv: &Inventory);

    /// Sync chunk marker: number of payment-vote inventories pushed.
    fn push_sync_status(&self, count: u32);

    fn misbehaving(&self, score: u32);
}

/// Node-wide relay of inventory advertisements.
pub trait BroadcastNetwork: Send + Sync {
    fn relay_inventory(&self, inv: &Inventory);
}
