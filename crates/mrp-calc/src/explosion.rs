use chrono::Utc;
use mrp_bom::{BomTraverser, BomVisitor, NodeContext, WalkRequest};
use mrp_cache::{ExplosionCache, ExplosionCacheEntry, ExplosionCacheKey};
use mrp_core::{DemandRequirement, GrossRequirement, Result};

/// Gross-requirement visitor (C7): emits one requirement per visited node
/// at the root's need date; per-node scheduling happens in the order
/// planner. With a cache attached, whole subtrees short-circuit on hits
/// and every freshly walked subtree is stored unit-normalized.
pub struct GrossRequirementVisitor<'a> {
    cache: Option<&'a ExplosionCache>,
}

impl<'a> GrossRequirementVisitor<'a> {
    pub fn new(cache: Option<&'a ExplosionCache>) -> Self {
        Self { cache }
    }
}

impl BomVisitor for GrossRequirementVisitor<'_> {
    type NodeData = GrossRequirement;
    type Output = Vec<GrossRequirement>;

    fn try_shortcut(&mut self, ctx: &NodeContext<'_>) -> Result<Option<Self::Output>> {
        let Some(cache) = self.cache else {
            return Ok(None);
        };
        let key = ExplosionCacheKey::new(ctx.part.clone(), ctx.target_serial.clone());
        let Some(entry) = cache.get(&key) else {
            return Ok(None);
        };

        tracing::debug!(
            part = ctx.part.as_str(),
            serial = ctx.target_serial.as_str(),
            "explosion cache hit"
        );

        // Rescale the unit subtree to this demand and re-anchor the traces
        let scaled = entry
            .unit_requirements
            .iter()
            .map(|unit| GrossRequirement {
                part: unit.part.clone(),
                quantity: unit.quantity * ctx.quantity,
                need_date: ctx.need_date,
                demand_trace: format!("{} -> {}", ctx.demand_trace, unit.demand_trace),
                location: ctx.location.clone(),
                target_serial: ctx.target_serial.clone(),
            })
            .collect();
        Ok(Some(scaled))
    }

    fn visit_node(&mut self, ctx: &NodeContext<'_>) -> Result<(Self::NodeData, bool)> {
        let requirement = GrossRequirement {
            part: ctx.part.clone(),
            quantity: ctx.quantity,
            need_date: ctx.need_date,
            demand_trace: format!("{} -> {}", ctx.demand_trace, ctx.part.as_str()),
            location: ctx.location.clone(),
            target_serial: ctx.target_serial.clone(),
        };
        Ok((requirement, true))
    }

    fn process_children(
        &mut self,
        ctx: &NodeContext<'_>,
        node_data: Self::NodeData,
        child_results: Vec<Self::Output>,
    ) -> Result<Self::Output> {
        let mut requirements = vec![node_data];
        for child in child_results {
            requirements.extend(child);
        }

        if let Some(cache) = self.cache {
            if ctx.quantity > 0 {
                cache.insert(
                    ExplosionCacheKey::new(ctx.part.clone(), ctx.target_serial.clone()),
                    normalize(ctx, &requirements),
                );
            }
        }

        Ok(requirements)
    }
}

/// Rescale a subtree's requirements to a demand of one unit and rewrite
/// the traces relative to the subtree root. Every quantity in the subtree
/// is a whole multiple of the entry quantity, so the division is exact.
fn normalize(ctx: &NodeContext<'_>, requirements: &[GrossRequirement]) -> ExplosionCacheEntry {
    let prefix = format!("{} -> ", ctx.demand_trace);
    let unit_requirements = requirements
        .iter()
        .map(|req| GrossRequirement {
            part: req.part.clone(),
            quantity: req.quantity / ctx.quantity,
            need_date: req.need_date,
            demand_trace: req
                .demand_trace
                .strip_prefix(&prefix)
                .unwrap_or(&req.demand_trace)
                .to_string(),
            location: req.location.clone(),
            target_serial: req.target_serial.clone(),
        })
        .collect();

    ExplosionCacheEntry {
        unit_requirements,
        lead_time_days: ctx.item.lead_time_days,
        computed_at: Utc::now(),
    }
}

/// Drives the gross-requirement visitor over each top-level demand
pub struct ExplosionEngine<'a> {
    traverser: &'a BomTraverser<'a>,
    cache: Option<&'a ExplosionCache>,
}

impl<'a> ExplosionEngine<'a> {
    pub fn new(traverser: &'a BomTraverser<'a>, cache: Option<&'a ExplosionCache>) -> Self {
        Self { traverser, cache }
    }

    pub fn explode_demand(&self, demand: &DemandRequirement) -> Result<Vec<GrossRequirement>> {
        let mut visitor = GrossRequirementVisitor::new(self.cache);
        self.traverser.walk(
            &mut visitor,
            WalkRequest {
                part: demand.part.clone(),
                quantity: demand.quantity,
                target_serial: demand.target_serial.clone(),
                location: demand.location.clone(),
                demand_trace: demand.source.clone(),
                need_date: demand.need_date,
                allocations: None,
            },
        )
    }

    /// Explode all demands in input order into one flat requirement list
    pub fn explode_all(&self, demands: &[DemandRequirement]) -> Result<Vec<GrossRequirement>> {
        let mut all = Vec::new();
        for demand in demands {
            tracing::debug!(
                part = demand.part.as_str(),
                quantity = demand.quantity,
                source = %demand.source,
                "exploding demand"
            );
            all.extend(self.explode_demand(demand)?);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_bom::AlternateSelector;
    use mrp_core::repository::memory::{InMemoryBomRepository, InMemoryItemRepository};
    use mrp_core::{
        BomLine, Item, LotSizeRule, MakeBuy, PartNumber, Quantity, Serial, SerialEffectivity,
    };

    fn create_test_item(part: &str) -> Item {
        Item {
            part: PartNumber::new(part),
            description: format!("Item {}", part),
            lead_time_days: 10,
            lot_rule: LotSizeRule::LotForLot,
            min_order_qty: 0,
            max_order_qty: 10_000,
            safety_stock: 0,
            uom: "EA".to_string(),
            make_buy: Some(MakeBuy::Make),
        }
    }

    fn create_test_line(parent: &str, child: &str, qty: Quantity, find: u32) -> BomLine {
        BomLine {
            parent: PartNumber::new(parent),
            child: PartNumber::new(child),
            qty_per: qty,
            find_number: find,
            effectivity: SerialEffectivity::open_ended(Serial::new("SN001")),
            priority: 0,
        }
    }

    fn demand(part: &str, quantity: Quantity) -> DemandRequirement {
        DemandRequirement {
            part: PartNumber::new(part),
            quantity,
            need_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            source: "SO-1".to_string(),
            location: "FACTORY".to_string(),
            target_serial: Serial::new("SN001"),
        }
    }

    fn shared_subtree_fixture() -> (InMemoryItemRepository, InMemoryBomRepository) {
        let items = InMemoryItemRepository::new();
        let bom = InMemoryBomRepository::new();
        for part in ["P", "A1", "A2", "X", "LEAF"] {
            items.add_item(create_test_item(part));
        }
        // P -> A1 -> X -> LEAF
        //   -> A2 -> X -> LEAF  (same subtree through a second parent)
        bom.add_line(create_test_line("P", "A1", 1, 100));
        bom.add_line(create_test_line("P", "A2", 1, 200));
        bom.add_line(create_test_line("A1", "X", 2, 100));
        bom.add_line(create_test_line("A2", "X", 3, 100));
        bom.add_line(create_test_line("X", "LEAF", 5, 100));
        (items, bom)
    }

    #[test]
    fn test_gross_requirements_scale_by_qty_per() {
        let (items, bom) = shared_subtree_fixture();
        let traverser = BomTraverser::new(&items, &bom, AlternateSelector::priority());
        let engine = ExplosionEngine::new(&traverser, None);

        let reqs = engine.explode_demand(&demand("P", 1)).unwrap();

        let total = |part: &str| -> Quantity {
            reqs.iter()
                .filter(|r| r.part.as_str() == part)
                .map(|r| r.quantity)
                .sum()
        };
        assert_eq!(total("P"), 1);
        assert_eq!(total("X"), 5); // 2 via A1 + 3 via A2
        assert_eq!(total("LEAF"), 25);
    }

    #[test]
    fn test_all_nodes_share_root_need_date() {
        let (items, bom) = shared_subtree_fixture();
        let traverser = BomTraverser::new(&items, &bom, AlternateSelector::priority());
        let engine = ExplosionEngine::new(&traverser, None);

        let reqs = engine.explode_demand(&demand("P", 1)).unwrap();
        let need = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        assert!(reqs.iter().all(|r| r.need_date == need));
    }

    #[test]
    fn test_traces_chain_back_to_the_demand() {
        let (items, bom) = shared_subtree_fixture();
        let traverser = BomTraverser::new(&items, &bom, AlternateSelector::priority());
        let engine = ExplosionEngine::new(&traverser, None);

        let reqs = engine.explode_demand(&demand("P", 1)).unwrap();
        let leaf_traces: Vec<&str> = reqs
            .iter()
            .filter(|r| r.part.as_str() == "LEAF")
            .map(|r| r.demand_trace.as_str())
            .collect();
        assert_eq!(
            leaf_traces,
            vec![
                "SO-1 -> P -> A1 -> X -> LEAF",
                "SO-1 -> P -> A2 -> X -> LEAF"
            ]
        );
    }

    #[test]
    fn test_memoized_subtree_reused_within_a_run() {
        let (items, bom) = shared_subtree_fixture();
        let cache = ExplosionCache::new();
        let traverser = BomTraverser::new(&items, &bom, AlternateSelector::priority());
        let engine = ExplosionEngine::new(&traverser, Some(&cache));

        let reqs = engine.explode_demand(&demand("P", 1)).unwrap();

        // The second arm hit the X subtree cached by the first arm
        let stats = cache.stats();
        assert!(stats.hits >= 1, "expected a hit on the shared subtree");
        assert!(cache
            .get(&ExplosionCacheKey::new(
                PartNumber::new("X"),
                Serial::new("SN001")
            ))
            .is_some());

        // And the quantities still come out right
        let leaf_total: Quantity = reqs
            .iter()
            .filter(|r| r.part.as_str() == "LEAF")
            .map(|r| r.quantity)
            .sum();
        assert_eq!(leaf_total, 25);
    }

    #[test]
    fn test_cache_is_transparent() {
        let (items, bom) = shared_subtree_fixture();
        let traverser = BomTraverser::new(&items, &bom, AlternateSelector::priority());

        let cold = ExplosionEngine::new(&traverser, None)
            .explode_demand(&demand("P", 4))
            .unwrap();

        let cache = ExplosionCache::new();
        let warm_engine = ExplosionEngine::new(&traverser, Some(&cache));
        // Prime on one run, then verify a second run matches the uncached one
        warm_engine.explode_demand(&demand("P", 4)).unwrap();
        let warm = warm_engine.explode_demand(&demand("P", 4)).unwrap();

        assert_eq!(cold, warm);
    }

    proptest::proptest! {
        #[test]
        fn prop_cache_transparent_for_any_demand(
            demand_qty in 1i64..500,
            qty_a in 1i64..8,
            qty_b in 1i64..8,
            qty_leaf in 1i64..8,
        ) {
            let items = InMemoryItemRepository::new();
            let bom = InMemoryBomRepository::new();
            for part in ["P", "A1", "A2", "X", "LEAF"] {
                items.add_item(create_test_item(part));
            }
            bom.add_line(create_test_line("P", "A1", qty_a, 100));
            bom.add_line(create_test_line("P", "A2", qty_b, 200));
            bom.add_line(create_test_line("A1", "X", qty_a, 100));
            bom.add_line(create_test_line("A2", "X", qty_b, 100));
            bom.add_line(create_test_line("X", "LEAF", qty_leaf, 100));

            let traverser = BomTraverser::new(&items, &bom, AlternateSelector::priority());
            let cold = ExplosionEngine::new(&traverser, None)
                .explode_demand(&demand("P", demand_qty))
                .unwrap();

            let cache = ExplosionCache::new();
            let warm_engine = ExplosionEngine::new(&traverser, Some(&cache));
            let first = warm_engine.explode_demand(&demand("P", demand_qty)).unwrap();
            let replay = warm_engine.explode_demand(&demand("P", demand_qty)).unwrap();

            proptest::prop_assert_eq!(&cold, &first);
            proptest::prop_assert_eq!(&cold, &replay);
        }
    }

    #[test]
    fn test_unit_normalization_is_exact() {
        let (items, bom) = shared_subtree_fixture();
        let cache = ExplosionCache::new();
        let traverser = BomTraverser::new(&items, &bom, AlternateSelector::priority());
        let engine = ExplosionEngine::new(&traverser, Some(&cache));

        engine.explode_demand(&demand("P", 7)).unwrap();

        let entry = cache
            .get(&ExplosionCacheKey::new(
                PartNumber::new("P"),
                Serial::new("SN001")
            ))
            .unwrap();
        let unit_leaf: Quantity = entry
            .unit_requirements
            .iter()
            .filter(|r| r.part.as_str() == "LEAF")
            .map(|r| r.quantity)
            .sum();
        assert_eq!(unit_leaf, 25);

        // Root of the stored subtree carries a bare-part trace
        let root = entry
            .unit_requirements
            .iter()
            .find(|r| r.part.as_str() == "P")
            .unwrap();
        assert_eq!(root.demand_trace, "P");
        assert_eq!(root.quantity, 1);
    }
}
