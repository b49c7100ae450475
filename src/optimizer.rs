//! Strategy optimizer for roll-container loading.
//!
//! A run loads the items in one fixed order with repeated placement passes
//! until a pass commits nothing. The optimizer performs one run per ordering
//! strategy and keeps the run that places the most items, preferring higher
//! volume utilization between runs that place equally many.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::error::{PackError, Result};
use crate::ledger::Ledger;
use crate::model::{Container, Item, PlacedItem, validate_items};
use crate::orientation::Orientation;
use crate::search::{PlacementTag, classify_placement, find_best_placement};
use crate::types::Vec3;

/// Tuning knobs of the placement search and the strategy runner.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Minimum share of the footprint that must rest on non-fragile tops (0.0 to 1.0)
    pub support_ratio: f64,
    /// Spacing of the anchor sweep along the container walls (cm)
    pub wall_step: f64,
    /// Spacing of the interior anchor grid (cm)
    pub grid_step: f64,
    /// Score reduction per wall the footprint touches
    pub wall_contact_bonus: f64,
    /// Score reduction per side face touching a placed item
    pub neighbor_contact_bonus: f64,
    /// Evaluate strategies on the rayon thread pool
    pub parallel_strategies: bool,
    /// Wall-clock budget for the whole optimization
    pub time_limit: Option<Duration>,
}

impl PackingConfig {
    pub const DEFAULT_SUPPORT_RATIO: f64 = 0.5;
    pub const DEFAULT_WALL_STEP: f64 = 1.0;
    pub const DEFAULT_GRID_STEP: f64 = 5.0;
    pub const DEFAULT_WALL_CONTACT_BONUS: f64 = 60.0;
    pub const DEFAULT_NEIGHBOR_CONTACT_BONUS: f64 = 40.0;
    pub const DEFAULT_PARALLEL_STRATEGIES: bool = true;
    /// Finest anchor spacing the search accepts (cm).
    pub const MIN_SEARCH_STEP: f64 = 0.1;

    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            support_ratio: Self::DEFAULT_SUPPORT_RATIO,
            wall_step: Self::DEFAULT_WALL_STEP,
            grid_step: Self::DEFAULT_GRID_STEP,
            wall_contact_bonus: Self::DEFAULT_WALL_CONTACT_BONUS,
            neighbor_contact_bonus: Self::DEFAULT_NEIGHBOR_CONTACT_BONUS,
            parallel_strategies: Self::DEFAULT_PARALLEL_STRATEGIES,
            time_limit: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    pub fn support_ratio(mut self, ratio: f64) -> Self {
        self.config.support_ratio = ratio;
        self
    }

    /// Values below [`PackingConfig::MIN_SEARCH_STEP`] are raised to it.
    pub fn wall_step(mut self, step: f64) -> Self {
        self.config.wall_step = step.max(PackingConfig::MIN_SEARCH_STEP);
        self
    }

    /// Values below [`PackingConfig::MIN_SEARCH_STEP`] are raised to it.
    pub fn grid_step(mut self, step: f64) -> Self {
        self.config.grid_step = step.max(PackingConfig::MIN_SEARCH_STEP);
        self
    }

    pub fn wall_contact_bonus(mut self, bonus: f64) -> Self {
        self.config.wall_contact_bonus = bonus;
        self
    }

    pub fn neighbor_contact_bonus(mut self, bonus: f64) -> Self {
        self.config.neighbor_contact_bonus = bonus;
        self
    }

    pub fn parallel_strategies(mut self, enabled: bool) -> Self {
        self.config.parallel_strategies = enabled;
        self
    }

    pub fn time_limit(mut self, limit: Option<Duration>) -> Self {
        self.config.time_limit = limit;
        self
    }

    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Item ordering used for one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    VolumeDesc,
    FootprintDesc,
    HeightDesc,
    WeightDesc,
    VolumeAsc,
    FragileFirst,
    HeavyBottom,
    TallThenBig,
    CompactFirst,
}

impl Strategy {
    /// Evaluation order; on equal results the earlier strategy wins.
    pub const ALL: [Strategy; 9] = [
        Strategy::VolumeDesc,
        Strategy::FootprintDesc,
        Strategy::HeightDesc,
        Strategy::WeightDesc,
        Strategy::VolumeAsc,
        Strategy::FragileFirst,
        Strategy::HeavyBottom,
        Strategy::TallThenBig,
        Strategy::CompactFirst,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::VolumeDesc => "volume_desc",
            Strategy::FootprintDesc => "footprint_desc",
            Strategy::HeightDesc => "height_desc",
            Strategy::WeightDesc => "weight_desc",
            Strategy::VolumeAsc => "volume_asc",
            Strategy::FragileFirst => "fragile_first",
            Strategy::HeavyBottom => "heavy_bottom",
            Strategy::TallThenBig => "tall_then_big",
            Strategy::CompactFirst => "compact_first",
        }
    }

    /// Returns the items in this strategy's order.
    ///
    /// Sorting is stable: items with equal keys keep their input order.
    pub fn order(self, items: &[Item]) -> Vec<Item> {
        let mut ordered = items.to_vec();
        let volume_desc = |a: &Item, b: &Item| b.volume().total_cmp(&a.volume());
        match self {
            Strategy::VolumeDesc => ordered.sort_by(volume_desc),
            Strategy::FootprintDesc => {
                ordered.sort_by(|a, b| b.footprint_area().total_cmp(&a.footprint_area()))
            }
            Strategy::HeightDesc => {
                ordered.sort_by(|a, b| b.dimensions().z.total_cmp(&a.dimensions().z))
            }
            Strategy::WeightDesc => ordered.sort_by(|a, b| b.weight.total_cmp(&a.weight)),
            Strategy::VolumeAsc => ordered.sort_by(|a, b| a.volume().total_cmp(&b.volume())),
            Strategy::FragileFirst => {
                ordered.sort_by(|a, b| b.fragile.cmp(&a.fragile).then_with(|| volume_desc(a, b)))
            }
            Strategy::HeavyBottom => ordered.sort_by(|a, b| {
                b.weight
                    .total_cmp(&a.weight)
                    .then_with(|| volume_desc(a, b))
            }),
            Strategy::TallThenBig => ordered.sort_by(|a, b| {
                b.dimensions()
                    .z
                    .total_cmp(&a.dimensions().z)
                    .then_with(|| volume_desc(a, b))
            }),
            Strategy::CompactFirst => {
                ordered.sort_by(|a, b| compactness(b).total_cmp(&compactness(a)))
            }
        }
        ordered
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Footprint per unit of height, with heights below 1 cm counted as 1 cm.
fn compactness(item: &Item) -> f64 {
    let dims = item.dimensions();
    dims.base_area() / dims.z.max(1.0)
}

/// One commit of a run, in loading order.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementEvent {
    /// 1-based commit index
    pub sequence: usize,
    pub item_id: String,
    pub orientation: Orientation,
    pub position: Vec3,
    pub dims: Vec3,
    pub tag: PlacementTag,
    /// Load after this commit (kg)
    pub total_weight: f64,
}

/// Events emitted while reporting a packing, suitable for live visualisation.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// A strategy run has been evaluated.
    StrategyEvaluated {
        strategy: Strategy,
        placed_count: usize,
        utilization: f64,
        score: f64,
    },
    /// An item of the selected run was committed.
    ItemPlaced {
        sequence: usize,
        id: String,
        orientation: String,
        tag: PlacementTag,
        #[schema(value_type = [f64; 3])]
        pos: (f64, f64, f64),
        #[schema(value_type = [f64; 3])]
        dims: (f64, f64, f64),
        total_weight: f64,
    },
    /// An item of the selected run could not be placed.
    ItemUnpacked { id: String },
    /// Reporting is complete.
    Finished {
        strategy: Strategy,
        placed: usize,
        unpacked: usize,
        utilization: f64,
    },
}

/// Outcome of one strategy run, used to audit the selection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, ToSchema)]
pub struct StrategySummary {
    pub strategy: Strategy,
    pub placed_count: usize,
    /// Volume utilization in percent
    pub utilization: f64,
    /// `placed_count × 10000 + utilization`
    pub score: f64,
}

impl StrategySummary {
    fn of(strategy: Strategy, ledger: &Ledger) -> Self {
        let placed_count = ledger.placed_count();
        let utilization = ledger.utilization();
        Self {
            strategy,
            placed_count,
            utilization,
            score: placed_count as f64 * 10_000.0 + utilization,
        }
    }
}

/// Utilizations closer than this (percentage points) count as equal.
///
/// Runs that place the same boxes in a different order sum their volumes in a
/// different order too, which only moves the last bits of the result.
const UTILIZATION_TOLERANCE: f64 = 1e-9;

/// Orders two runs: more placed items first, then higher utilization.
pub fn compare_runs(a: &StrategySummary, b: &StrategySummary) -> Ordering {
    a.placed_count.cmp(&b.placed_count).then_with(|| {
        if (a.utilization - b.utilization).abs() <= UTILIZATION_TOLERANCE {
            Ordering::Equal
        } else {
            a.utilization.total_cmp(&b.utilization)
        }
    })
}

/// A finished run: its ledger plus the commit log.
#[derive(Clone, Debug)]
struct RunOutcome {
    strategy: Strategy,
    ledger: Ledger,
    events: Vec<PlacementEvent>,
}

/// Loads `items` in the given order until a full pass commits nothing.
fn pack_round(
    strategy: Strategy,
    items: Vec<Item>,
    container: &Container,
    config: &PackingConfig,
) -> RunOutcome {
    let mut ledger = Ledger::new(container.clone());
    let mut events = Vec::new();
    let mut remaining = items;

    let mut made_progress = true;
    while made_progress && !remaining.is_empty() {
        made_progress = false;
        let mut left = Vec::with_capacity(remaining.len());

        for item in remaining {
            let Some(candidate) = find_best_placement(&item, &ledger, config) else {
                left.push(item);
                continue;
            };

            let tag = classify_placement(&candidate, &ledger);
            let (orientation, position, dims) =
                (candidate.orientation, candidate.position, candidate.dims);

            match ledger.attempt_commit(candidate) {
                Ok(()) => {
                    made_progress = true;
                    debug!(
                        %strategy,
                        item = item.label(),
                        x = position.x,
                        y = position.y,
                        z = position.z,
                        top = position.z + dims.z,
                        %tag,
                        "item committed"
                    );
                    events.push(PlacementEvent {
                        sequence: ledger.placed_count(),
                        item_id: item.id.clone(),
                        orientation,
                        position,
                        dims,
                        tag,
                        total_weight: ledger.total_weight(),
                    });
                }
                Err(rejection) => {
                    debug!(%strategy, %rejection, "commit refused");
                    left.push(item);
                }
            }
        }
        remaining = left;
    }

    ledger.record_unpacked(remaining);
    RunOutcome {
        strategy,
        ledger,
        events,
    }
}

/// Result of an optimization: the selected run plus a summary of every run
/// that was evaluated.
///
/// The selected run is read-only once returned:
///
/// ```compile_fail
/// use roll_pack::Container;
/// use roll_pack::optimizer::optimize_packing;
///
/// let mut result = optimize_packing(&Container::standard(), &[]).unwrap();
/// result.events.clear();
/// ```
#[derive(Clone, Debug)]
pub struct PackingResult {
    strategy: Strategy,
    ledger: Ledger,
    events: Vec<PlacementEvent>,
    summaries: Vec<StrategySummary>,
}

impl PackingResult {
    /// Strategy of the selected run.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Read-only view of the selected run's ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Commit log of the selected run.
    pub fn events(&self) -> &[PlacementEvent] {
        &self.events
    }

    /// One summary per evaluated run, in strategy order.
    pub fn summaries(&self) -> &[StrategySummary] {
        &self.summaries
    }

    /// Placed items in commit order.
    pub fn placed(&self) -> &[PlacedItem] {
        self.ledger.placed()
    }

    pub fn placed_count(&self) -> usize {
        self.ledger.placed_count()
    }

    pub fn unpacked_ids(&self) -> Vec<&str> {
        self.ledger
            .unpacked()
            .iter()
            .map(|item| item.id.as_str())
            .collect()
    }

    pub fn total_weight(&self) -> f64 {
        self.ledger.total_weight()
    }

    pub fn utilization(&self) -> f64 {
        self.ledger.utilization()
    }

    /// True if every item was placed.
    pub fn is_complete(&self) -> bool {
        self.ledger.unpacked().is_empty()
    }

    /// Replays the selected run as a stream of events.
    pub fn replay(&self, mut on_event: impl FnMut(&PackEvent)) {
        for summary in &self.summaries {
            on_event(&PackEvent::StrategyEvaluated {
                strategy: summary.strategy,
                placed_count: summary.placed_count,
                utilization: summary.utilization,
                score: summary.score,
            });
        }
        for event in &self.events {
            on_event(&PackEvent::ItemPlaced {
                sequence: event.sequence,
                id: event.item_id.clone(),
                orientation: event.orientation.code().to_string(),
                tag: event.tag,
                pos: event.position.as_tuple(),
                dims: event.dims.as_tuple(),
                total_weight: event.total_weight,
            });
        }
        for item in self.ledger.unpacked() {
            on_event(&PackEvent::ItemUnpacked {
                id: item.id.clone(),
            });
        }
        on_event(&PackEvent::Finished {
            strategy: self.strategy,
            placed: self.placed_count(),
            unpacked: self.ledger.unpacked().len(),
            utilization: self.utilization(),
        });
    }
}

/// Runs the ordering strategies and selects the best loading.
///
/// Cancellation and the time limit are honoured between strategy runs; a run
/// that has started always finishes.
#[derive(Clone, Debug)]
pub struct Optimizer {
    config: PackingConfig,
    cancelled: Arc<AtomicBool>,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(PackingConfig::default())
    }
}

impl Optimizer {
    pub fn new(config: PackingConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &PackingConfig {
        &self.config
    }

    /// Shared flag; storing `true` skips every strategy run not yet started.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::Relaxed);
    }

    /// Evaluates every strategy and returns the best run.
    ///
    /// # Errors
    /// Invalid container or items, or no run completed before cancellation
    /// or the time limit.
    pub fn optimize(&self, container: &Container, items: &[Item]) -> Result<PackingResult> {
        self.run(container, items, &Strategy::ALL)
    }

    /// Packs with a single ordering strategy.
    pub fn pack_with_strategy(
        &self,
        container: &Container,
        items: &[Item],
        strategy: Strategy,
    ) -> Result<PackingResult> {
        self.run(container, items, &[strategy])
    }

    /// Like [`Optimizer::optimize`] (or a single strategy when given), then
    /// replays the selected run through `on_event`.
    pub fn pack_with_progress(
        &self,
        container: &Container,
        items: &[Item],
        strategy: Option<Strategy>,
        on_event: impl FnMut(&PackEvent),
    ) -> Result<PackingResult> {
        let result = match strategy {
            Some(strategy) => self.pack_with_strategy(container, items, strategy)?,
            None => self.optimize(container, items)?,
        };
        result.replay(on_event);
        Ok(result)
    }

    fn run(
        &self,
        container: &Container,
        items: &[Item],
        strategies: &[Strategy],
    ) -> Result<PackingResult> {
        container.validate()?;
        validate_items(items)?;

        let deadline = self.config.time_limit.map(|limit| Instant::now() + limit);
        let evaluate = |strategy: &Strategy| self.evaluate(*strategy, container, items, deadline);

        // Collected in strategy order either way, so selection does not depend
        // on scheduling.
        let outcomes: Vec<Option<RunOutcome>> = if self.config.parallel_strategies {
            strategies.par_iter().map(evaluate).collect()
        } else {
            strategies.iter().map(evaluate).collect()
        };

        let completed: Vec<RunOutcome> = outcomes.into_iter().flatten().collect();
        let summaries: Vec<StrategySummary> = completed
            .iter()
            .map(|run| StrategySummary::of(run.strategy, &run.ledger))
            .collect();

        let best = completed
            .into_iter()
            .zip(summaries.iter())
            .fold(None, |best: Option<(RunOutcome, &StrategySummary)>, (run, summary)| {
                match best {
                    Some((_, current)) if compare_runs(summary, current) != Ordering::Greater => {
                        best
                    }
                    _ => Some((run, summary)),
                }
            });

        let Some((winner, summary)) = best else {
            return Err(self.interruption_error());
        };

        info!(
            strategy = %winner.strategy,
            placed = summary.placed_count,
            unpacked = winner.ledger.unpacked().len(),
            utilization = %format!("{:.1}", summary.utilization),
            weight = winner.ledger.total_weight(),
            evaluated = summaries.len(),
            "selected strategy"
        );

        Ok(PackingResult {
            strategy: winner.strategy,
            ledger: winner.ledger,
            events: winner.events,
            summaries,
        })
    }

    fn evaluate(
        &self,
        strategy: Strategy,
        container: &Container,
        items: &[Item],
        deadline: Option<Instant>,
    ) -> Option<RunOutcome> {
        if self.cancelled.load(AtomicOrdering::Relaxed) {
            debug!(%strategy, "skipped after cancellation");
            return None;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            debug!(%strategy, "skipped after time limit");
            return None;
        }

        let outcome = pack_round(strategy, strategy.order(items), container, &self.config);
        info!(
            %strategy,
            placed = outcome.ledger.placed_count(),
            utilization = %format!("{:.1}", outcome.ledger.utilization()),
            "strategy evaluated"
        );
        Some(outcome)
    }

    fn interruption_error(&self) -> PackError {
        if self.cancelled.load(AtomicOrdering::Relaxed) {
            PackError::Cancelled
        } else {
            let limit = self.config.time_limit.unwrap_or_default();
            PackError::Timeout(limit.as_millis() as u64)
        }
    }
}

/// Packs `items` with the default configuration.
pub fn optimize_packing(container: &Container, items: &[Item]) -> Result<PackingResult> {
    Optimizer::default().optimize(container, items)
}
