use mrp_core::{
    AllocationResult, GrossRequirement, InventoryRepository, NetRequirement, PartNumber, Quantity,
    Result,
};
use std::collections::HashMap;

/// Allocation pass output: what inventory covered, and what is left to plan
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub allocations: Vec<AllocationResult>,
    pub net_requirements: Vec<NetRequirement>,
}

/// Nets gross requirements against on-hand inventory (C8). Requirements
/// are grouped by `(part, location)` in first-seen order; the store
/// allocates each group total FIFO, and the unallocated remainder is
/// handed back to the group's requirements in input order so per-demand
/// traceability survives netting.
pub struct Allocator<'a> {
    inventory: &'a dyn InventoryRepository,
}

impl<'a> Allocator<'a> {
    pub fn new(inventory: &'a dyn InventoryRepository) -> Self {
        Self { inventory }
    }

    pub fn allocate(&self, gross_requirements: &[GrossRequirement]) -> Result<AllocationOutcome> {
        let mut group_order: Vec<(PartNumber, String)> = Vec::new();
        let mut groups: HashMap<(PartNumber, String), Vec<&GrossRequirement>> = HashMap::new();

        for req in gross_requirements {
            let key = (req.part.clone(), req.location.clone());
            if !groups.contains_key(&key) {
                group_order.push(key.clone());
            }
            groups.entry(key).or_default().push(req);
        }

        let mut allocations = Vec::new();
        let mut net_requirements = Vec::new();

        for key in &group_order {
            let group = &groups[key];
            let total_demand: Quantity = group.iter().map(|req| req.quantity).sum();

            let allocation = self.inventory.allocate(&key.0, &key.1, total_demand)?;
            tracing::debug!(
                part = key.0.as_str(),
                location = %key.1,
                demand = total_demand,
                allocated = allocation.allocated_qty,
                "allocated inventory"
            );

            let mut remaining = allocation.remaining_demand;
            allocations.push(allocation);

            // Unfilled demand flows back through the requirements in input
            // order, each consumed in full before the next
            for req in group {
                if remaining == 0 {
                    break;
                }
                let short = req.quantity.min(remaining);
                net_requirements.push(NetRequirement {
                    quantity: short,
                    ..(*req).clone()
                });
                remaining -= short;
            }
        }

        Ok(AllocationOutcome {
            allocations,
            net_requirements,
        })
    }
}
