use chrono::NaiveDate;
use mrp_core::{AllocationResult, Item, PartNumber, Quantity, Result, Serial};
use std::collections::HashMap;

/// Inventory coverage from an upstream MRP run, keyed by
/// `(part, location)`. Injected into the traversal context so visitors can
/// credit allocated stock without reaching back into run results.
#[derive(Debug, Clone, Default)]
pub struct AllocationContext {
    entries: HashMap<(PartNumber, String), AllocationEntry>,
}

#[derive(Debug, Clone, Copy)]
pub struct AllocationEntry {
    pub allocated_qty: Quantity,
    pub remaining_demand: Quantity,
}

impl AllocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a run's allocation results into a lookup, summing repeats
    pub fn from_allocations(allocations: &[AllocationResult]) -> Self {
        let mut ctx = Self::new();
        for alloc in allocations {
            ctx.add(
                alloc.part.clone(),
                alloc.location.clone(),
                alloc.allocated_qty,
                alloc.remaining_demand,
            );
        }
        ctx
    }

    pub fn add(
        &mut self,
        part: PartNumber,
        location: String,
        allocated_qty: Quantity,
        remaining_demand: Quantity,
    ) {
        let entry = self
            .entries
            .entry((part, location))
            .or_insert(AllocationEntry {
                allocated_qty: 0,
                remaining_demand: 0,
            });
        entry.allocated_qty += allocated_qty;
        entry.remaining_demand += remaining_demand;
    }

    pub fn get(&self, part: &PartNumber, location: &str) -> Option<AllocationEntry> {
        self.entries
            .get(&(part.clone(), location.to_string()))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a visitor sees at one node of the walk
pub struct NodeContext<'a> {
    pub part: PartNumber,
    pub item: Item,
    pub target_serial: Serial,
    pub location: String,

    /// Units of this part required by the walk so far (root demand scaled
    /// by the qty_per chain)
    pub quantity: Quantity,

    /// 0 at the demand root
    pub level: usize,

    /// Trace of the *parent* requirement; the demand source at the root.
    /// This node's own requirement trace is `demand_trace -> part`.
    pub demand_trace: String,

    /// Need date of the root demand; per-node offsets are applied later by
    /// the order planner
    pub need_date: NaiveDate,

    pub allocations: Option<&'a AllocationContext>,
}

/// Two-phase visitor driven by [`crate::BomTraverser`].
///
/// `visit_node` runs pre-order and can stop the descent;
/// `process_children` runs post-order and folds child results. A visitor
/// that can answer for a whole subtree without walking it (a memo cache)
/// overrides `try_shortcut`.
pub trait BomVisitor {
    /// Per-node scratch value handed from `visit_node` to `process_children`
    type NodeData;

    /// Folded result of a subtree
    type Output;

    /// Answer for the whole subtree without descending, if possible
    fn try_shortcut(&mut self, _ctx: &NodeContext<'_>) -> Result<Option<Self::Output>> {
        Ok(None)
    }

    /// Called before children are resolved. Returning `false` as the
    /// second element skips the descent; `process_children` still runs
    /// with no child results.
    fn visit_node(&mut self, ctx: &NodeContext<'_>) -> Result<(Self::NodeData, bool)>;

    /// Fold this node's data with its child subtree results
    fn process_children(
        &mut self,
        ctx: &NodeContext<'_>,
        node_data: Self::NodeData,
        child_results: Vec<Self::Output>,
    ) -> Result<Self::Output>;
}
