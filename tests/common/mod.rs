#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use ed25519_dalek::Keypair;
use parking_lot::Mutex;
use tempfile::TempDir;

use masternode_payments::config::PaymentsConfig;
use masternode_payments::crypto::generate_keypair;
use masternode_payments::interfaces::{
    BroadcastNetwork, BudgetOracle, ChainView, Inventory, OverlayNode, OverlayRegistry,
    PaymentsPeer, RewardSchedule, Spork, SporkOracle, SyncTracker, TipInfo, TxValidation,
};
use masternode_payments::tally::TallyContext;
use masternode_payments::types::{
    Amount, OutPoint, RewardTransaction, Script, Tier, TxInput, WinnerVote, COIN,
};
use masternode_payments::{Collaborators, PaymentsEngine};

pub const PROTOCOL: u32 = 70_912;

pub fn block_hash(height: u64) -> String {
    format!("hash-{height:08}")
}

pub fn p2pkh_script(tag: u8) -> Script {
    let mut bytes = vec![0x76, 0xa9, 0x14];
    bytes.extend_from_slice(&[tag; 20]);
    bytes.extend_from_slice(&[0x88, 0xac]);
    Script::new(bytes)
}

pub struct MockChain {
    tip_height: Mutex<Option<u64>>,
}

impl MockChain {
    pub fn new(tip_height: u64) -> Self {
        Self {
            tip_height: Mutex::new(Some(tip_height)),
        }
    }

    pub fn set_tip(&self, height: u64) {
        *self.tip_height.lock() = Some(height);
    }

    pub fn clear_tip(&self) {
        *self.tip_height.lock() = None;
    }
}

impl ChainView for MockChain {
    fn try_tip(&self) -> Option<TipInfo> {
        (*self.tip_height.lock()).map(|height| TipInfo {
            height,
            hash: block_hash(height),
            time: 1_700_000_000 + height,
        })
    }

    fn block_hash_at(&self, height: u64) -> Option<String> {
        let tip = (*self.tip_height.lock())?;
        (height <= tip).then(|| block_hash(height))
    }

    fn height_of(&self, hash: &str) -> Option<u64> {
        let tip = (*self.tip_height.lock())?;
        let height: u64 = hash.strip_prefix("hash-")?.parse().ok()?;
        (height <= tip).then_some(height)
    }
}

#[derive(Clone)]
pub struct RegisteredNode {
    pub node: OverlayNode,
    pub rank: u32,
}

#[derive(Default)]
pub struct MockRegistry {
    pub nodes: Mutex<Vec<RegisteredNode>>,
    pub queue: Mutex<HashMap<Tier, OverlayNode>>,
    pub reported_size: Mutex<Option<u32>>,
    pub node_requests: Mutex<Vec<(u64, TxInput)>>,
    pub list_requests: Mutex<Vec<u64>>,
}

impl MockRegistry {
    pub fn add(&self, node: OverlayNode, rank: u32) {
        self.nodes.lock().push(RegisteredNode { node, rank });
    }

    pub fn set_queue(&self, tier: Tier, node: OverlayNode) {
        self.queue.lock().insert(tier, node);
    }

    pub fn report_size(&self, size: u32) {
        *self.reported_size.lock() = Some(size);
    }
}

impl OverlayRegistry for MockRegistry {
    fn find_by_input(&self, input: &TxInput) -> Option<OverlayNode> {
        self.nodes
            .lock()
            .iter()
            .find(|entry| entry.node.collateral.prevout == input.prevout)
            .map(|entry| entry.node.clone())
    }

    fn find_by_script(&self, script: &Script) -> Option<OverlayNode> {
        self.nodes
            .lock()
            .iter()
            .find(|entry| &entry.node.payout_script == script)
            .map(|entry| entry.node.clone())
    }

    fn rank(&self, input: &TxInput, _ref_height: u64, min_protocol: u32) -> Option<u32> {
        self.nodes
            .lock()
            .iter()
            .find(|entry| {
                entry.node.collateral.prevout == input.prevout
                    && entry.node.protocol_version >= min_protocol
            })
            .map(|entry| entry.rank)
    }

    fn count_enabled(&self, tier: Tier) -> u32 {
        self.nodes
            .lock()
            .iter()
            .filter(|entry| entry.node.tier == tier)
            .count() as u32
    }

    fn stable_size(&self) -> u32 {
        self.size()
    }

    fn size(&self) -> u32 {
        let reported = *self.reported_size.lock();
        reported.unwrap_or_else(|| self.nodes.lock().len() as u32)
    }

    fn next_in_payment_queue(
        &self,
        _height: u64,
        tier: Tier,
        _filter_recent: bool,
    ) -> Option<OverlayNode> {
        self.queue.lock().get(&tier).cloned()
    }

    fn top_ranked(&self, tier: Tier) -> Option<OverlayNode> {
        self.nodes
            .lock()
            .iter()
            .filter(|entry| entry.node.tier == tier)
            .min_by_key(|entry| entry.rank)
            .map(|entry| entry.node.clone())
    }

    fn request_list_update(&self, peer_id: u64) {
        self.list_requests.lock().push(peer_id);
    }

    fn request_node(&self, peer_id: u64, input: &TxInput) {
        self.node_requests.lock().push((peer_id, input.clone()));
    }
}

pub struct MockBudget {
    pub budget_heights: Mutex<HashSet<u64>>,
    pub verdict: Mutex<TxValidation>,
    pub fills: Mutex<Vec<&'static str>>,
}

impl Default for MockBudget {
    fn default() -> Self {
        Self {
            budget_heights: Mutex::new(HashSet::new()),
            verdict: Mutex::new(TxValidation::Valid),
            fills: Mutex::new(Vec::new()),
        }
    }
}

impl MockBudget {
    pub fn claim_height(&self, height: u64) {
        self.budget_heights.lock().insert(height);
    }

    pub fn set_verdict(&self, verdict: TxValidation) {
        *self.verdict.lock() = verdict;
    }
}

impl BudgetOracle for MockBudget {
    fn is_budget_payment_block(&self, height: u64) -> bool {
        self.budget_heights.lock().contains(&height)
    }

    fn is_transaction_valid(&self, _tx: &RewardTransaction, _height: u64) -> TxValidation {
        *self.verdict.lock()
    }

    fn fill_block_payee(
        &self,
        tx: &mut RewardTransaction,
        _fees: Amount,
        _proof_of_stake: bool,
        _block_value: Amount,
    ) {
        self.fills.lock().push("budget");
        tx.push_output(1, Script::new(vec![0xb0]));
    }

    fn fill_treasury_payee(
        &self,
        tx: &mut RewardTransaction,
        _fees: Amount,
        _proof_of_stake: bool,
        _block_value: Amount,
    ) {
        self.fills.lock().push("treasury");
        tx.push_output(1, Script::new(vec![0xc0]));
    }

    fn required_payments_string(&self, _height: u64) -> String {
        "budget".to_string()
    }
}

#[derive(Default)]
pub struct MockSporks {
    pub active: Mutex<HashSet<Spork>>,
    pub values: Mutex<HashMap<Spork, u64>>,
}

impl MockSporks {
    pub fn activate(&self, spork: Spork) {
        self.active.lock().insert(spork);
    }

    pub fn deactivate(&self, spork: Spork) {
        self.active.lock().remove(&spork);
    }

    pub fn set_value(&self, spork: Spork, value: u64) {
        self.values.lock().insert(spork, value);
    }
}

impl SporkOracle for MockSporks {
    fn is_active(&self, spork: Spork) -> bool {
        self.active.lock().contains(&spork)
    }

    fn value(&self, spork: Spork) -> u64 {
        self.values.lock().get(&spork).copied().unwrap_or(u64::MAX)
    }
}

pub struct MockSchedule {
    pub block_value: Mutex<Amount>,
    pub payments: Mutex<HashMap<Tier, Amount>>,
    pub treasury_heights: Mutex<HashSet<u64>>,
    pub treasury_award: Mutex<Amount>,
    pub treasury_payees: Mutex<Vec<(Script, u8)>>,
    pub cycle: u64,
    pub drift: u32,
}

impl Default for MockSchedule {
    fn default() -> Self {
        let mut payments = HashMap::new();
        payments.insert(Tier::T1, COIN / 2);
        payments.insert(Tier::T2, COIN);
        payments.insert(Tier::T3, 45 * COIN / 10);
        Self {
            block_value: Mutex::new(50 * COIN),
            payments: Mutex::new(payments),
            treasury_heights: Mutex::new(HashSet::new()),
            treasury_award: Mutex::new(0),
            treasury_payees: Mutex::new(Vec::new()),
            cycle: 1_000,
            drift: 3,
        }
    }
}

impl MockSchedule {
    pub fn set_payment(&self, tier: Tier, amount: Amount) {
        self.payments.lock().insert(tier, amount);
    }

    pub fn make_treasury(&self, height: u64, award: Amount, payees: Vec<(Script, u8)>) {
        self.treasury_heights.lock().insert(height);
        *self.treasury_award.lock() = award;
        *self.treasury_payees.lock() = payees;
    }
}

impl RewardSchedule for MockSchedule {
    fn block_value(&self, _height: u64, _proof_of_stake: bool) -> Amount {
        *self.block_value.lock()
    }

    fn masternode_payment(
        &self,
        _height: u64,
        _block_value: Amount,
        _proof_of_stake: bool,
        tier: Tier,
        _drift: u32,
        _zerocoin_spend: bool,
    ) -> Amount {
        self.payments.lock().get(&tier).copied().unwrap_or(0)
    }

    fn is_treasury_block(&self, height: u64) -> bool {
        self.treasury_heights.lock().contains(&height)
    }

    fn treasury_award(&self, _height: u64) -> Amount {
        *self.treasury_award.lock()
    }

    fn treasury_payees(&self, _height: u64) -> Vec<(Script, u8)> {
        self.treasury_payees.lock().clone()
    }

    fn budget_cycle_blocks(&self) -> u64 {
        self.cycle
    }

    fn count_drift(&self) -> u32 {
        self.drift
    }
}

pub struct MockSync {
    pub blockchain_synced: AtomicBool,
    pub synced: AtomicBool,
    pub seen: Mutex<HashSet<String>>,
}

impl Default for MockSync {
    fn default() -> Self {
        Self {
            blockchain_synced: AtomicBool::new(true),
            synced: AtomicBool::new(true),
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl MockSync {
    pub fn set_synced(&self, synced: bool) {
        self.blockchain_synced.store(synced, Ordering::SeqCst);
        self.synced.store(synced, Ordering::SeqCst);
    }
}

impl SyncTracker for MockSync {
    fn is_blockchain_synced(&self) -> bool {
        self.blockchain_synced.load(Ordering::SeqCst)
    }

    fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    fn note_winner(&self, hash: &str) {
        self.seen.lock().insert(hash.to_string());
    }

    fn forget_winner(&self, hash: &str) {
        self.seen.lock().remove(hash);
    }
}

#[derive(Default)]
pub struct MockNetwork {
    pub relayed: Mutex<Vec<Inventory>>,
}

impl BroadcastNetwork for MockNetwork {
    fn relay_inventory(&self, inv: &Inventory) {
        self.relayed.lock().push(inv.clone());
    }
}

pub struct MockPeer {
    pub peer_id: u64,
    pub version: u32,
    pub inventories: Mutex<Vec<Inventory>>,
    pub sync_counts: Mutex<Vec<u32>>,
    pub score: AtomicU32,
}

impl MockPeer {
    pub fn new(peer_id: u64) -> Self {
        Self {
            peer_id,
            version: PROTOCOL,
            inventories: Mutex::new(Vec::new()),
            sync_counts: Mutex::new(Vec::new()),
            score: AtomicU32::new(0),
        }
    }

    pub fn with_version(peer_id: u64, version: u32) -> Self {
        Self {
            version,
            ..Self::new(peer_id)
        }
    }

    pub fn total_score(&self) -> u32 {
        self.score.load(Ordering::SeqCst)
    }
}

impl PaymentsPeer for MockPeer {
    fn id(&self) -> u64 {
        self.peer_id
    }

    fn protocol_version(&self) -> u32 {
        self.version
    }

    fn push_inventory(&self, inv: &Inventory) {
        self.inventories.lock().push(inv.clone());
    }

    fn push_sync_status(&self, count: u32) {
        self.sync_counts.lock().push(count);
    }

    fn misbehaving(&self, score: u32) {
        self.score.fetch_add(score, Ordering::SeqCst);
    }
}

/// One registered masternode with its operator keypair, able to sign votes.
pub struct Voter {
    pub keypair: Keypair,
    pub input: TxInput,
    pub node: OverlayNode,
}

impl Voter {
    pub fn signed_vote(&self, height: u64, payee: &OverlayNode) -> WinnerVote {
        let mut vote = WinnerVote::new(
            self.input.clone(),
            height,
            payee.payout_script.clone(),
            payee.tier,
        );
        vote.payee_input = payee.collateral.clone();
        vote.sign(&self.keypair);
        vote
    }

    /// A vote in the legacy shape: payee identified by script only.
    pub fn signed_legacy_vote(&self, height: u64, payee_script: Script) -> WinnerVote {
        let mut vote = WinnerVote::new(self.input.clone(), height, payee_script, Tier::MAX);
        vote.sign(&self.keypair);
        vote
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub chain: Arc<MockChain>,
    pub registry: Arc<MockRegistry>,
    pub budget: Arc<MockBudget>,
    pub sporks: Arc<MockSporks>,
    pub schedule: Arc<MockSchedule>,
    pub sync: Arc<MockSync>,
    pub network: Arc<MockNetwork>,
    pub engine: PaymentsEngine,
}

impl Harness {
    pub fn new(tip_height: u64) -> Self {
        Self::with_config(tip_height, |_| {})
    }

    pub fn with_config(tip_height: u64, tweak: impl FnOnce(&mut PaymentsConfig)) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let chain = Arc::new(MockChain::new(tip_height));
        let registry = Arc::new(MockRegistry::default());
        let budget = Arc::new(MockBudget::default());
        let sporks = Arc::new(MockSporks::default());
        let schedule = Arc::new(MockSchedule::default());
        let sync = Arc::new(MockSync::default());
        let network = Arc::new(MockNetwork::default());

        let mut config = PaymentsConfig {
            data_dir: dir.path().join("payments"),
            active_protocol_version: PROTOCOL,
            min_protocol_pre_enforcement: PROTOCOL - 2,
            ..PaymentsConfig::default()
        };
        tweak(&mut config);

        let engine = PaymentsEngine::new(
            config,
            Collaborators {
                chain: chain.clone(),
                registry: registry.clone(),
                budget: budget.clone(),
                sporks: sporks.clone(),
                schedule: schedule.clone(),
                sync: sync.clone(),
                network: network.clone(),
            },
        )
        .expect("engine");

        Self {
            dir,
            chain,
            registry,
            budget,
            sporks,
            schedule,
            sync,
            network,
            engine,
        }
    }

    /// Registers `count` rank-ordered voting masternodes of `tier`.
    pub fn register_voters(&self, count: usize, tier: Tier) -> Vec<Voter> {
        (0..count)
            .map(|index| {
                let keypair = generate_keypair();
                let input = TxInput::from_outpoint(OutPoint::new([0x10 + index as u8; 32], 0));
                let node = OverlayNode {
                    collateral: input.clone(),
                    payout_script: p2pkh_script(0x10 + index as u8),
                    tier,
                    protocol_version: PROTOCOL,
                    operator_key: hex::encode(keypair.public.to_bytes()),
                };
                self.registry.add(node.clone(), index as u32 + 1);
                Voter {
                    keypair,
                    input,
                    node,
                }
            })
            .collect()
    }

    /// Registers a payee-only masternode (never votes) of `tier`.
    pub fn register_payee(&self, tag: u8, tier: Tier) -> OverlayNode {
        let keypair = generate_keypair();
        let node = OverlayNode {
            collateral: TxInput::from_outpoint(OutPoint::new([tag; 32], 1)),
            payout_script: p2pkh_script(tag),
            tier,
            protocol_version: PROTOCOL,
            operator_key: hex::encode(keypair.public.to_bytes()),
        };
        self.registry.add(node.clone(), 50);
        node
    }

    pub fn tally_ctx(&self) -> TallyContext<'_> {
        TallyContext {
            sporks: &*self.sporks,
            registry: &*self.registry,
            schedule: &*self.schedule,
        }
    }
}
