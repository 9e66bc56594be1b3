use crate::allocation::Allocator;
use crate::critical_path::{rank_paths, CriticalPathVisitor};
use crate::explosion::ExplosionEngine;
use crate::planning::OrderPlanner;
use crate::shortage::ShortageDetector;
use chrono::Utc;
use mrp_bom::{AllocationContext, AlternateSelector, BomTraverser, SelectionStrategy, WalkRequest};
use mrp_cache::{CacheConfig, CacheStats, ExplosionCache};
use mrp_core::{
    validate, AllocationResult, BomRepository, CancelToken, CriticalPathAnalysis,
    DemandRequirement, GrossRequirement, InventoryRepository, ItemRepository, NetRequirement,
    PartNumber, PlannedOrder, Result, Serial, Shortage,
};
use serde::Serialize;

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct MrpConfig {
    pub cache_enabled: bool,

    /// Memo entries kept before eviction; 0 = unbounded
    pub max_cache_entries: usize,

    pub selection_strategy: SelectionStrategy,

    /// Default N for critical-path rankings
    pub top_paths: usize,
}

impl Default for MrpConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            max_cache_entries: 5_000,
            selection_strategy: SelectionStrategy::Priority,
            top_paths: 5,
        }
    }
}

/// Everything one planning run produced. The run is atomic: any error
/// discards the whole result.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub gross_requirements: Vec<GrossRequirement>,
    pub allocations: Vec<AllocationResult>,
    pub net_requirements: Vec<NetRequirement>,
    pub planned_orders: Vec<PlannedOrder>,
    pub shortages: Vec<Shortage>,
    pub cache_stats: CacheStats,
}

/// Unified MRP engine: the entry point for planning runs and
/// critical-path analysis. Repositories are injected and treated as
/// read-only during a run (allocation is the one sanctioned mutation,
/// inside the inventory store).
pub struct MrpEngine<I, B, V>
where
    I: ItemRepository,
    B: BomRepository,
    V: InventoryRepository,
{
    items: I,
    bom: B,
    inventory: V,
    cache: ExplosionCache,
    config: MrpConfig,
    cancel: CancelToken,
}

impl<I, B, V> MrpEngine<I, B, V>
where
    I: ItemRepository,
    B: BomRepository,
    V: InventoryRepository,
{
    /// Build an engine, validating the item master and BOM structure up
    /// front. Bad data never reaches a planning run.
    pub fn new(items: I, bom: B, inventory: V, config: MrpConfig) -> Result<Self> {
        let all_items = items.all_items()?;
        validate::validate_items(&all_items)?;

        let all_lines = bom.all_lines()?;
        validate::validate_bom(&all_lines)?;

        tracing::debug!(
            items = all_items.len(),
            bom_lines = all_lines.len(),
            "engine validated input data"
        );

        let cache = ExplosionCache::with_config(CacheConfig {
            max_entries: config.max_cache_entries,
        });

        Ok(Self {
            items,
            bom,
            inventory,
            cache,
            config,
            cancel: CancelToken::new(),
        })
    }

    /// Token to cancel an in-flight run from another thread
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn inventory(&self) -> &V {
        &self.inventory
    }

    /// Run the full pipeline: explode → allocate → plan → detect
    /// shortages.
    pub fn plan(&self, demands: &[DemandRequirement]) -> Result<PlanResult> {
        validate::validate_demands(demands)?;

        tracing::info!(demands = demands.len(), "starting planning run");
        let started = std::time::Instant::now();

        let selector = self.selector();
        let traverser = BomTraverser::new(&self.items, &self.bom, selector)
            .with_cancel_token(self.cancel.clone());

        // The memo key ignores location, and availability-aware selection
        // is location-sensitive, so the cache only serves the priority
        // strategy.
        let cache = (self.config.cache_enabled
            && self.config.selection_strategy == SelectionStrategy::Priority)
            .then_some(&self.cache);

        let gross_requirements =
            ExplosionEngine::new(&traverser, cache).explode_all(demands)?;
        tracing::debug!(
            gross = gross_requirements.len(),
            "explosion complete"
        );

        let outcome = Allocator::new(&self.inventory).allocate(&gross_requirements)?;
        tracing::debug!(
            allocations = outcome.allocations.len(),
            net = outcome.net_requirements.len(),
            "allocation complete"
        );

        let planned_orders = OrderPlanner::new(&self.items).plan_orders(&outcome.net_requirements)?;
        let shortages = ShortageDetector::detect(&outcome.net_requirements, &planned_orders);

        tracing::info!(
            orders = planned_orders.len(),
            shortages = shortages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "planning run complete"
        );

        Ok(PlanResult {
            gross_requirements,
            allocations: outcome.allocations,
            net_requirements: outcome.net_requirements,
            planned_orders,
            shortages,
            cache_stats: self.cache.stats(),
        })
    }

    /// Enumerate and rank the lead-time chains under one part. With
    /// `allocations` from a prior run the scoring credits that run's
    /// inventory assignments; otherwise it queries the store live.
    pub fn critical_path(
        &self,
        part: &PartNumber,
        target_serial: &Serial,
        location: &str,
        top_n: usize,
        allocations: Option<&AllocationContext>,
    ) -> Result<CriticalPathAnalysis> {
        let selector = self.selector();
        let traverser = BomTraverser::new(&self.items, &self.bom, selector)
            .with_cancel_token(self.cancel.clone());

        let mut visitor = CriticalPathVisitor::new(match allocations {
            Some(_) => None,
            None => Some(&self.inventory),
        });

        let mut paths = traverser.walk(
            &mut visitor,
            WalkRequest {
                part: part.clone(),
                quantity: 1,
                target_serial: target_serial.clone(),
                location: location.to_string(),
                demand_trace: part.as_str().to_string(),
                need_date: Utc::now().date_naive(),
                allocations,
            },
        )?;

        let total_paths = paths.len();
        rank_paths(&mut paths);

        let critical_path = paths.first().cloned();
        let top_paths: Vec<_> = paths.into_iter().take(top_n).collect();
        let inventory_coverage = if top_paths.is_empty() {
            0.0
        } else {
            top_paths
                .iter()
                .filter(|path| path.details.iter().any(|node| node.has_inventory))
                .count() as f64
                / top_paths.len() as f64
        };

        tracing::debug!(
            part = part.as_str(),
            total_paths,
            "critical-path analysis complete"
        );

        Ok(CriticalPathAnalysis {
            top_level_part: part.clone(),
            target_serial: target_serial.clone(),
            location: location.to_string(),
            analysis_date: Utc::now(),
            critical_path,
            top_paths,
            total_paths,
            inventory_coverage,
        })
    }

    fn selector(&self) -> AlternateSelector<'_> {
        match self.config.selection_strategy {
            SelectionStrategy::Priority => AlternateSelector::priority(),
            SelectionStrategy::Availability => {
                AlternateSelector::availability_aware(&self.inventory)
            }
        }
    }
}
