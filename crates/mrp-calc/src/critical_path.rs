use mrp_bom::{BomVisitor, NodeContext};
use mrp_core::{
    CriticalPath, CriticalPathNode, InventoryRepository, PartNumber, Quantity, Result,
};

/// Enumerates every root-to-leaf chain through the effective BOM (C11),
/// scoring each node's lead time against inventory coverage. Coverage
/// comes from the allocation context when an upstream run supplied one,
/// otherwise from a live inventory query.
pub struct CriticalPathVisitor<'a> {
    inventory: Option<&'a dyn InventoryRepository>,
}

impl<'a> CriticalPathVisitor<'a> {
    pub fn new(inventory: Option<&'a dyn InventoryRepository>) -> Self {
        Self { inventory }
    }

    fn coverage(&self, ctx: &NodeContext<'_>) -> Result<Quantity> {
        if let Some(allocations) = ctx.allocations {
            return Ok(allocations
                .get(&ctx.part, &ctx.location)
                .map(|entry| entry.allocated_qty)
                .unwrap_or(0));
        }
        if let Some(inventory) = self.inventory {
            return inventory.available_quantity(&ctx.part, &ctx.location);
        }
        Ok(0)
    }
}

/// Lead time after crediting coverage: fully covered nodes cost nothing,
/// partial coverage scales the lead time down pro rata (floored).
pub fn effective_lead_time(lead_time_days: i64, covered: Quantity, required: Quantity) -> i64 {
    if required <= 0 || covered >= required {
        0
    } else if covered <= 0 {
        lead_time_days
    } else {
        lead_time_days * (required - covered) / required
    }
}

fn lead_time_of(part: &PartNumber, details: &[CriticalPathNode]) -> i64 {
    details
        .iter()
        .find(|node| node.part == *part)
        .map(|node| node.lead_time_days)
        .unwrap_or(0)
}

impl BomVisitor for CriticalPathVisitor<'_> {
    type NodeData = CriticalPathNode;
    type Output = Vec<CriticalPath>;

    fn visit_node(&mut self, ctx: &NodeContext<'_>) -> Result<(Self::NodeData, bool)> {
        let covered = self.coverage(ctx)?;
        let node = CriticalPathNode {
            part: ctx.part.clone(),
            description: ctx.item.description.clone(),
            lead_time_days: ctx.item.lead_time_days,
            cumulative_time: ctx.item.lead_time_days,
            level: ctx.level,
            has_inventory: covered > 0,
            inventory_qty: covered,
            required_qty: ctx.quantity,
            effective_lead_time: effective_lead_time(
                ctx.item.lead_time_days,
                covered,
                ctx.quantity,
            ),
        };
        Ok((node, true))
    }

    fn process_children(
        &mut self,
        _ctx: &NodeContext<'_>,
        node: Self::NodeData,
        child_results: Vec<Self::Output>,
    ) -> Result<Self::Output> {
        let child_paths: Vec<CriticalPath> = child_results.into_iter().flatten().collect();

        if child_paths.is_empty() {
            return Ok(vec![CriticalPath {
                total_lead_time: node.lead_time_days,
                effective_lead_time: node.effective_lead_time,
                path_length: 1,
                path: vec![node.part.clone()],
                details: vec![node.clone()],
                bottleneck_part: node.part,
            }]);
        }

        let mut paths = Vec::with_capacity(child_paths.len());
        for child_path in child_paths {
            let mut head = node.clone();
            head.cumulative_time = head.lead_time_days + child_path.total_lead_time;

            let bottleneck_part = if head.lead_time_days
                < lead_time_of(&child_path.bottleneck_part, &child_path.details)
            {
                child_path.bottleneck_part.clone()
            } else {
                head.part.clone()
            };

            let mut path = Vec::with_capacity(child_path.path_length + 1);
            path.push(head.part.clone());
            path.extend(child_path.path.iter().cloned());

            let mut details = Vec::with_capacity(child_path.details.len() + 1);
            details.push(head);
            details.extend(child_path.details.iter().cloned());

            paths.push(CriticalPath {
                total_lead_time: node.lead_time_days + child_path.total_lead_time,
                effective_lead_time: node.effective_lead_time + child_path.effective_lead_time,
                path_length: 1 + child_path.path_length,
                path,
                details,
                bottleneck_part,
            });
        }

        Ok(paths)
    }
}

/// Descending `(effective, total, length)`; stable, so equal paths keep
/// enumeration order
pub fn rank_paths(paths: &mut [CriticalPath]) {
    paths.sort_by(|a, b| {
        b.effective_lead_time
            .cmp(&a.effective_lead_time)
            .then_with(|| b.total_lead_time.cmp(&a.total_lead_time))
            .then_with(|| b.path_length.cmp(&a.path_length))
    });
}
