use crate::alternates::AlternateSelector;
use crate::visitor::{AllocationContext, BomVisitor, NodeContext};
use chrono::NaiveDate;
use mrp_core::{
    BomRepository, CancelToken, ItemRepository, MrpError, PartNumber, Quantity, Result, Serial,
};

/// Root of one walk: the demand the traversal expands
pub struct WalkRequest<'a> {
    pub part: PartNumber,
    pub quantity: Quantity,
    pub target_serial: Serial,
    pub location: String,

    /// Trace seed; the demand source for an explosion walk
    pub demand_trace: String,

    pub need_date: NaiveDate,
    pub allocations: Option<&'a AllocationContext>,
}

/// Generic post-order walker over the serial-effective BOM (C6).
///
/// For each node it resolves the item, lets the visitor pre-visit, picks
/// one line per find-number group via the alternate selector, recurses in
/// ascending find-number order, and hands the child results back to the
/// visitor. Cycles are excluded by load-time validation; the walker does
/// not re-check them.
pub struct BomTraverser<'a> {
    items: &'a dyn ItemRepository,
    bom: &'a dyn BomRepository,
    selector: AlternateSelector<'a>,
    cancel: CancelToken,
}

impl<'a> BomTraverser<'a> {
    pub fn new(
        items: &'a dyn ItemRepository,
        bom: &'a dyn BomRepository,
        selector: AlternateSelector<'a>,
    ) -> Self {
        Self {
            items,
            bom,
            selector,
            cancel: CancelToken::new(),
        }
    }

    /// Observe an external cancellation token instead of the built-in one
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn walk<V: BomVisitor>(&self, visitor: &mut V, request: WalkRequest<'_>) -> Result<V::Output> {
        let shared = WalkShared {
            target_serial: request.target_serial,
            location: request.location,
            need_date: request.need_date,
            allocations: request.allocations,
        };
        self.walk_node(
            visitor,
            &shared,
            request.part,
            request.quantity,
            0,
            request.demand_trace,
        )
    }

    fn walk_node<V: BomVisitor>(
        &self,
        visitor: &mut V,
        shared: &WalkShared<'_>,
        part: PartNumber,
        quantity: Quantity,
        level: usize,
        demand_trace: String,
    ) -> Result<V::Output> {
        if self.cancel.is_cancelled() {
            return Err(MrpError::Cancelled);
        }

        let item = self.items.get_item(&part)?;
        let ctx = NodeContext {
            part,
            item,
            target_serial: shared.target_serial.clone(),
            location: shared.location.clone(),
            quantity,
            level,
            demand_trace,
            need_date: shared.need_date,
            allocations: shared.allocations,
        };

        if let Some(output) = visitor.try_shortcut(&ctx)? {
            return Ok(output);
        }

        let (node_data, descend) = visitor.visit_node(&ctx)?;
        if !descend {
            return visitor.process_children(&ctx, node_data, Vec::new());
        }

        let groups = self.bom.alternate_groups(&ctx.part)?;
        let child_trace = format!("{} -> {}", ctx.demand_trace, ctx.part.as_str());

        let mut child_results = Vec::new();
        for find_number in groups.keys().copied() {
            let candidates =
                self.bom
                    .effective_alternates(&ctx.part, find_number, &shared.target_serial)?;
            let Some(line) = self
                .selector
                .select(&candidates, ctx.quantity, &shared.location)?
            else {
                // No alternate effective for the target serial
                continue;
            };

            let result = self.walk_node(
                visitor,
                shared,
                line.child.clone(),
                line.qty_per * ctx.quantity,
                level + 1,
                child_trace.clone(),
            )?;
            child_results.push(result);
        }

        visitor.process_children(&ctx, node_data, child_results)
    }
}

struct WalkShared<'a> {
    target_serial: Serial,
    location: String,
    need_date: NaiveDate,
    allocations: Option<&'a AllocationContext>,
}
