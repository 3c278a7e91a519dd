use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::PaymentsConfig;
use crate::errors::{PaymentResult, SnapshotReadError, VoteRejection};
use crate::interfaces::{
    BroadcastNetwork, BudgetOracle, ChainView, OverlayNode, OverlayRegistry, RewardSchedule,
    Spork, SporkOracle, SyncTracker,
};
use crate::snapshot::SnapshotFile;
use crate::store::{ElectionStore, MIN_RETENTION, RANK_REFERENCE_OFFSET};
use crate::tally::TallyContext;
use crate::types::{Script, Tier, WinnerVote};

/// External systems wired into the payments engine at construction.
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainView>,
    pub registry: Arc<dyn OverlayRegistry>,
    pub budget: Arc<dyn BudgetOracle>,
    pub sporks: Arc<dyn SporkOracle>,
    pub schedule: Arc<dyn RewardSchedule>,
    pub sync: Arc<dyn SyncTracker>,
    pub network: Arc<dyn BroadcastNetwork>,
}

/// Masternode payment consensus: the election store plus every operation the
/// node performs on it. Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct PaymentsEngine {
    pub(crate) inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) config: PaymentsConfig,
    pub(crate) store: ElectionStore,
    pub(crate) snapshot: SnapshotFile,
    pub(crate) chain: Arc<dyn ChainView>,
    pub(crate) registry: Arc<dyn OverlayRegistry>,
    pub(crate) budget: Arc<dyn BudgetOracle>,
    pub(crate) sporks: Arc<dyn SporkOracle>,
    pub(crate) schedule: Arc<dyn RewardSchedule>,
    pub(crate) sync: Arc<dyn SyncTracker>,
    pub(crate) network: Arc<dyn BroadcastNetwork>,
}

impl PaymentsEngine {
    pub fn new(config: PaymentsConfig, collaborators: Collaborators) -> PaymentResult<Self> {
        config.ensure_directories()?;
        let snapshot = SnapshotFile::new(config.snapshot_path(), config.network_magic);
        let inner = Arc::new(EngineInner {
            config,
            store: ElectionStore::new(),
            snapshot,
            chain: collaborators.chain,
            registry: collaborators.registry,
            budget: collaborators.budget,
            sporks: collaborators.sporks,
            schedule: collaborators.schedule,
            sync: collaborators.sync,
            network: collaborators.network,
        });
        Ok(Self { inner })
    }

    pub fn store(&self) -> &ElectionStore {
        &self.inner.store
    }

    pub fn config(&self) -> &PaymentsConfig {
        &self.inner.config
    }

    /// The protocol floor for payment votes; elevated to the active protocol
    /// once the pay-updated-nodes spork is on.
    pub fn min_payments_protocol(&self) -> u32 {
        if self.inner.sporks.is_active(Spork::PayUpdatedNodes) {
            self.inner.config.active_protocol_version
        } else {
            self.inner.config.min_protocol_pre_enforcement
        }
    }

    pub(crate) fn tally_context(&self) -> TallyContext<'_> {
        TallyContext {
            sporks: self.inner.sporks.as_ref(),
            registry: self.inner.registry.as_ref(),
            schedule: self.inner.schedule.as_ref(),
        }
    }

    /// Shared admission path for gossiped and locally produced votes. The
    /// rank reference block `height − 100` must exist on our chain before a
    /// vote is counted.
    pub fn add_winning_vote(&self, vote: WinnerVote) -> Result<(), VoteRejection> {
        let anchor = vote
            .height
            .checked_sub(RANK_REFERENCE_OFFSET)
            .ok_or(VoteRejection::ChainBusy)?;
        if self.inner.chain.block_hash_at(anchor).is_none() {
            return Err(VoteRejection::ChainBusy);
        }
        self.inner.store.admit(vote)
    }

    pub fn payee_for(&self, height: u64, tier: Tier) -> Option<Script> {
        self.inner.store.payee_for(height, tier)
    }

    /// Whether `node` already wins some height in the near payment schedule;
    /// producers use this to avoid nominating an already-scheduled node.
    pub fn scheduled(&self, node: &OverlayNode, exclude_height: u64) -> bool {
        let Some(tip) = self.inner.chain.try_tip() else {
            return false;
        };
        self.inner
            .store
            .scheduled(&node.payout_script, node.tier, tip.height, exclude_height)
    }

    /// Retention horizon: 1.25 × the overlay size, floored at 1000 blocks.
    pub fn horizon(&self) -> u64 {
        ((self.inner.registry.size() as u64) * 5 / 4).max(MIN_RETENTION)
    }

    /// Drops votes and tallies outside the horizon around the current tip.
    /// Called after every tip advance and after a snapshot load.
    pub fn prune(&self) {
        let Some(tip) = self.inner.chain.try_tip() else {
            return;
        };
        let sync = Arc::clone(&self.inner.sync);
        self.inner
            .store
            .prune(tip.height, self.horizon(), |hash| sync.forget_winner(hash));
    }

    /// Payees a block at `height` is expected to fund, as a display string;
    /// budget blocks defer to the budget subsystem.
    pub fn required_payments_string(&self, height: u64) -> String {
        if self.inner.sporks.is_active(Spork::EnableSuperblocks)
            && self.inner.budget.is_budget_payment_block(height)
        {
            return self.inner.budget.required_payments_string(height);
        }
        self.inner
            .store
            .tally_at(height)
            .map(|tally| tally.required_payments_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn status_line(&self) -> String {
        self.inner.store.status_line()
    }

    pub fn oldest_block(&self) -> Option<u64> {
        self.inner.store.oldest_height()
    }

    pub fn newest_block(&self) -> Option<u64> {
        self.inner.store.newest_height()
    }

    /// Loads the snapshot file into the store. Without `dry_run`, contents
    /// replace the live tables and the store is pruned immediately.
    pub fn load_snapshot(&self, dry_run: bool) -> Result<(), SnapshotReadError> {
        let snapshot = self.inner.snapshot.read()?;
        if dry_run {
            return Ok(());
        }
        self.inner.store.restore(snapshot);
        info!(status = %self.status_line(), "masternode payments restored from disk");
        self.prune();
        Ok(())
    }

    /// Startup policy: a missing or rewriteable file starts empty, real
    /// corruption is surfaced to the operator.
    pub fn bootstrap(&self) -> Result<(), SnapshotReadError> {
        match self.load_snapshot(false) {
            Ok(()) => Ok(()),
            Err(SnapshotReadError::FileError(err)) => {
                debug!(%err, "no payments snapshot, starting empty");
                Ok(())
            }
            Err(SnapshotReadError::IncorrectFormat(reason)) => {
                warn!(%reason, "payments snapshot invalid, starting empty");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Writes the current tables to disk; the shutdown path.
    pub fn flush(&self) -> PaymentResult<()> {
        self.inner.snapshot.write(&self.inner.store.capture())
    }

    /// Dry-run verify then rewrite, the periodic persistence cycle.
    pub fn dump_snapshot(&self) -> PaymentResult<()> {
        self.inner.snapshot.dump(&self.inner.store.capture())
    }

    /// Periodic snapshot persistence; failures are logged and retried on the
    /// next cycle.
    pub fn spawn_snapshot_task(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let interval = Duration::from_millis(engine.inner.config.snapshot_interval_ms);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = engine.dump_snapshot() {
                    warn!(?err, "masternode payments snapshot failed");
                }
            }
        })
    }
}
