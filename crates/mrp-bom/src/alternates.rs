use mrp_core::{BomLine, InventoryRepository, Quantity, Result};

/// How to choose one line from an alternate group (替代料)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    /// Lowest priority wins unconditionally
    #[default]
    Priority,

    /// Lowest priority with enough on-hand stock wins; falls back to the
    /// primary when nothing covers the requirement
    Availability,
}

/// Chooses exactly one BOM line per find-number group from the serial-
/// effective candidates.
pub struct AlternateSelector<'a> {
    strategy: SelectionStrategy,
    inventory: Option<&'a dyn InventoryRepository>,
}

impl<'a> AlternateSelector<'a> {
    /// Priority-only selection
    pub fn priority() -> Self {
        Self {
            strategy: SelectionStrategy::Priority,
            inventory: None,
        }
    }

    /// Availability-aware selection against the given inventory
    pub fn availability_aware(inventory: &'a dyn InventoryRepository) -> Self {
        Self {
            strategy: SelectionStrategy::Availability,
            inventory: Some(inventory),
        }
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Select one line from the effective candidates of a single
    /// find-number group. Ties at equal priority keep input order.
    pub fn select(
        &self,
        candidates: &[BomLine],
        required_qty: Quantity,
        location: &str,
    ) -> Result<Option<BomLine>> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let mut ordered: Vec<&BomLine> = candidates.iter().collect();
        ordered.sort_by_key(|line| line.priority);

        match (self.strategy, self.inventory) {
            (SelectionStrategy::Availability, Some(inventory)) => {
                for line in &ordered {
                    let available = inventory.available_quantity(&line.child, location)?;
                    if available >= required_qty * line.qty_per {
                        return Ok(Some((*line).clone()));
                    }
                }
                // Nothing covers the demand: take the primary and let the
                // shortfall propagate as a net requirement
                Ok(Some(ordered[0].clone()))
            }
            _ => Ok(Some(ordered[0].clone())),
        }
    }
}
