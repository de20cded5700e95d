//! Depth-synchronized scheduler.
//!
//! Each depth level is fanned out across a fixed pool of workers. Workers
//! never touch the tree: they send unit outcomes to the scheduler, which
//! owns the tree and applies inserts one at a time. A [`DepthBarrier`] makes
//! sure level `d` is fully committed before level `d + 1` is read.

mod barrier;
mod cancel;
mod plan;
mod strategy;
mod throttle;

pub use barrier::DepthBarrier;
pub use cancel::CancelToken;
pub use plan::ScanPlan;
pub use strategy::{
    ClassicStrategy, RecursiveStrategy, ScanStrategy, UnitKey, WorkUnit, build_url,
};
pub use throttle::{THROTTLE_WINDOW, Throttle};

use crate::error::{BurrowError, Result};
use crate::state::ResumeState;
use crate::tree::DiscoveryTree;
use burrow_scanner::{Requester, ResponseRecord};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Running { depth: usize },
    Interrupted { depth: usize },
    Done,
}

/// Progress notifications, delivered from the scheduler task
#[derive(Debug, Clone)]
pub enum ScanEvent {
    State(ScanState),
    LevelStarted { depth: usize, units: usize },
    UnitCompleted { url: String, status: Option<u16>, kept: bool },
}

/// Callback for reporting scan progress
pub type ProgressCallback = Arc<dyn Fn(ScanEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub requests: usize,
    pub kept: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub enum ScanOutcome {
    /// The tree is sealed
    Completed {
        tree: DiscoveryTree,
        stats: ScanStats,
    },
    Interrupted {
        state: Box<ResumeState>,
        stats: ScanStats,
    },
}

#[derive(Debug)]
enum UnitResult {
    Kept(ResponseRecord),
    Discarded(u16),
    Failed(String),
}

/// What a worker reports back for one unit
#[derive(Debug)]
struct UnitOutcome {
    key: UnitKey,
    url: String,
    result: UnitResult,
}

pub struct Scheduler {
    plan: Arc<ScanPlan>,
    requester: Arc<dyn Requester>,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
    state: ScanState,
}

impl Scheduler {
    pub fn new(plan: ScanPlan, requester: Arc<dyn Requester>) -> Self {
        Self {
            plan: Arc::new(plan),
            requester,
            cancel: CancelToken::new(),
            progress: None,
            state: ScanState::Idle,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Starts a fresh crawl from the configured URL
    pub async fn run(mut self) -> Result<ScanOutcome> {
        let mut tree = DiscoveryTree::new();
        tree.insert(self.plan.config.url.as_str(), None, None);
        info!(
            "Starting {} scan of {}",
            self.plan.strategy.name(),
            self.plan.config.url
        );
        self.crawl(tree, 0, HashSet::new()).await
    }

    /// Continues an interrupted crawl at its saved depth, skipping units
    /// that already completed
    pub async fn resume(mut self, state: ResumeState) -> Result<ScanOutcome> {
        if state.tree.root().is_none() {
            return Err(BurrowError::State("State file has no root node".to_string()));
        }
        info!(
            "Resuming {} scan of {} at depth {} ({} unit(s) already done)",
            self.plan.strategy.name(),
            self.plan.config.url,
            state.depth,
            state.completed.len()
        );
        let completed = state.completed.into_iter().collect();
        self.crawl(state.tree, state.depth, completed).await
    }

    async fn crawl(
        &mut self,
        mut tree: DiscoveryTree,
        start_depth: usize,
        mut completed: HashSet<UnitKey>,
    ) -> Result<ScanOutcome> {
        let mut stats = ScanStats::default();
        let levels = self.plan.strategy.levels();

        for depth in start_depth..levels {
            if self.cancel.is_cancelled() {
                return self.interrupt(tree, depth, completed, stats);
            }

            let frontier = tree.nodes_at_depth(depth);
            if frontier.is_empty() {
                info!("Frontier at depth {} is empty, stopping", depth);
                break;
            }

            self.transition(ScanState::Running { depth });
            let units: Vec<WorkUnit> = self
                .plan
                .strategy
                .units(&tree, &frontier, &self.plan.candidates)
                .into_iter()
                .filter(|unit| !completed.contains(&unit.key))
                .collect();

            info!(
                "Depth {}: {} frontier node(s), {} unit(s)",
                depth,
                frontier.len(),
                units.len()
            );
            self.emit(ScanEvent::LevelStarted {
                depth,
                units: units.len(),
            });

            let interrupted = self
                .run_level(&mut tree, depth, units, &mut completed, &mut stats)
                .await?;

            let settled = tree.nodes_at_depth(depth).len();
            assert_eq!(
                settled,
                frontier.len(),
                "depth barrier violated: depth {} changed while it was being expanded",
                depth
            );

            if interrupted {
                return self.interrupt(tree, depth, completed, stats);
            }
            completed.clear();
        }

        tree.seal();
        self.transition(ScanState::Done);
        info!(
            "Scan complete: {} request(s), {} kept, {} failed",
            stats.requests, stats.kept, stats.failed
        );
        Ok(ScanOutcome::Completed { tree, stats })
    }

    /// Runs one level to its barrier. Returns `true` when the level was cut
    /// short by cancellation.
    async fn run_level(
        &mut self,
        tree: &mut DiscoveryTree,
        depth: usize,
        units: Vec<WorkUnit>,
        completed: &mut HashSet<UnitKey>,
        stats: &mut ScanStats,
    ) -> Result<bool> {
        if units.is_empty() {
            return Ok(self.cancel.is_cancelled());
        }

        let barrier = Arc::new(DepthBarrier::new(units.len()));
        let (tx, mut rx) = mpsc::unbounded_channel::<UnitOutcome>();
        let handles = self.spawn_workers(units, depth, &barrier, tx);

        let mut interrupted = false;
        let mut deadline: Option<Instant> = None;
        let mut aborted = false;

        loop {
            tokio::select! {
                biased;

                Some(outcome) = rx.recv() => {
                    self.apply(tree, outcome, completed, stats);
                }
                _ = barrier.wait() => break,
                _ = self.cancel.cancelled(), if !interrupted => {
                    interrupted = true;
                    deadline = Some(Instant::now() + self.plan.grace_period());
                    info!(
                        "Cancellation requested at depth {}, waiting up to {:?} for in-flight requests",
                        depth,
                        self.plan.grace_period()
                    );
                    self.transition(ScanState::Interrupted { depth });
                }
                _ = expire(deadline), if deadline.is_some() => {
                    warn!(
                        "Grace period expired with {} unit(s) outstanding, abandoning them",
                        barrier.remaining()
                    );
                    for handle in &handles {
                        handle.abort();
                    }
                    aborted = true;
                    break;
                }
            }
        }

        while let Ok(outcome) = rx.try_recv() {
            self.apply(tree, outcome, completed, stats);
        }

        if !aborted {
            for joined in join_all(handles).await {
                joined?;
            }
        }

        // a cancel that lands as the last unit arrives may never be selected
        Ok(interrupted || self.cancel.is_cancelled())
    }

    fn spawn_workers(
        &self,
        units: Vec<WorkUnit>,
        depth: usize,
        barrier: &Arc<DepthBarrier>,
        tx: UnboundedSender<UnitOutcome>,
    ) -> Vec<JoinHandle<()>> {
        let threads = self.plan.threads();
        let total = units.len();
        let units_per_worker = total.div_ceil(threads);

        let mut units = units.into_iter();
        let mut handles = Vec::with_capacity(threads);

        for worker_id in 0..threads {
            let worker_units: Vec<WorkUnit> = units.by_ref().take(units_per_worker).collect();
            if worker_units.is_empty() {
                break;
            }

            let plan = self.plan.clone();
            let requester = self.requester.clone();
            let cancel = self.cancel.clone();
            let barrier = barrier.clone();
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                let mut throttle = Throttle::new(plan.throttle());
                debug!("Worker {} started with {} unit(s)", worker_id, worker_units.len());

                for unit in worker_units {
                    if cancel.is_cancelled() {
                        barrier.arrive();
                        continue;
                    }
                    throttle.acquire().await;
                    if cancel.is_cancelled() {
                        barrier.arrive();
                        continue;
                    }

                    let outcome = execute_unit(requester.as_ref(), &plan, unit, depth + 1).await;
                    // the receiver only goes away once the level is abandoned
                    let _ = tx.send(outcome);
                    barrier.arrive();
                }
            }));
        }

        handles
    }

    fn apply(
        &self,
        tree: &mut DiscoveryTree,
        outcome: UnitOutcome,
        completed: &mut HashSet<UnitKey>,
        stats: &mut ScanStats,
    ) {
        let UnitOutcome { key, url, result } = outcome;
        stats.requests += 1;

        let (status, kept) = match result {
            UnitResult::Kept(record) => {
                let status = record.status_code;
                debug!("Kept {} [{}]", url, status);
                tree.insert(key.word.clone(), Some(record), Some(key.parent));
                stats.kept += 1;
                (Some(status), true)
            }
            UnitResult::Discarded(status) => (Some(status), false),
            UnitResult::Failed(reason) => {
                debug!("Skipping {}: {}", url, reason);
                stats.failed += 1;
                (None, false)
            }
        };

        completed.insert(key);
        self.emit(ScanEvent::UnitCompleted { url, status, kept });
    }

    fn interrupt(
        &mut self,
        tree: DiscoveryTree,
        depth: usize,
        completed: HashSet<UnitKey>,
        stats: ScanStats,
    ) -> Result<ScanOutcome> {
        self.transition(ScanState::Interrupted { depth });

        let state = ResumeState::new(
            self.plan.config.clone(),
            self.plan.words.clone(),
            depth,
            tree,
            completed.into_iter().collect(),
        );
        if let Some(path) = &self.plan.config.state_file {
            state.save(path)?;
        }

        self.transition(ScanState::Done);
        info!(
            "Scan interrupted at depth {} after {} request(s)",
            depth, stats.requests
        );
        Ok(ScanOutcome::Interrupted {
            state: Box::new(state),
            stats,
        })
    }

    fn transition(&mut self, next: ScanState) {
        if self.state != next {
            debug!("Scan state {:?} -> {:?}", self.state, next);
            self.state = next;
            self.emit(ScanEvent::State(next));
        }
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(callback) = &self.progress {
            callback(event);
        }
    }
}

async fn execute_unit(
    requester: &dyn Requester,
    plan: &ScanPlan,
    unit: WorkUnit,
    depth: usize,
) -> UnitOutcome {
    let WorkUnit { key, url } = unit;

    let result = match requester.execute(&url).await {
        Ok(record) if plan.filters.evaluate(&record, depth) => UnitResult::Kept(record),
        Ok(record) => {
            debug!("Filtered {} [{}]", url, record.status_code);
            UnitResult::Discarded(record.status_code)
        }
        Err(e) => {
            warn!("Request to {} failed: {}", url, e);
            UnitResult::Failed(e.to_string())
        }
    };

    UnitOutcome { key, url, result }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
