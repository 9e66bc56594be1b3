use crate::models::*;
use crate::{MrpError, Result};
use std::collections::BTreeMap;

/// Item master lookup (C2). ERP systems implement this to provide data.
pub trait ItemRepository: Send + Sync {
    /// Get an item by part number, failing when absent
    fn get_item(&self, part: &PartNumber) -> Result<Item>;

    /// Get an item by part number, `None` when absent
    fn find_item(&self, part: &PartNumber) -> Result<Option<Item>>;

    /// Get multiple items (batch operation for performance)
    fn get_items(&self, parts: &[PartNumber]) -> Result<Vec<Item>>;

    /// All items, for load-time validation
    fn all_items(&self) -> Result<Vec<Item>>;
}

/// BOM line lookup (C3)
pub trait BomRepository: Send + Sync {
    /// All lines under a parent, in input order
    fn lines_for(&self, parent: &PartNumber) -> Result<Vec<BomLine>>;

    /// Lines under a parent grouped by find number, ascending
    fn alternate_groups(&self, parent: &PartNumber) -> Result<BTreeMap<u32, Vec<BomLine>>>;

    /// The alternates at one find number whose effectivity covers the
    /// target serial
    fn effective_alternates(
        &self,
        parent: &PartNumber,
        find_number: u32,
        target_serial: &Serial,
    ) -> Result<Vec<BomLine>>;

    /// All lines under a parent whose effectivity covers the target
    /// serial, ungrouped
    fn effective_lines(&self, parent: &PartNumber, target_serial: &Serial)
        -> Result<Vec<BomLine>>;

    /// All lines, for graph validation
    fn all_lines(&self) -> Result<Vec<BomLine>>;
}

/// On-hand inventory query and allocation (C4)
pub trait InventoryRepository: Send + Sync {
    /// Available lots for a part at a location, unsorted
    fn available_lots(&self, part: &PartNumber, location: &str) -> Result<Vec<InventoryLot>>;

    /// Available serialized units for a part at a location, unsorted
    fn available_serials(
        &self,
        part: &PartNumber,
        location: &str,
    ) -> Result<Vec<SerializedInventory>>;

    /// Total available quantity: lot quantities plus serialized unit count
    fn available_quantity(&self, part: &PartNumber, location: &str) -> Result<Quantity>;

    /// Draw up to `quantity` units FIFO: Available lots by
    /// `(receipt_date, lot_number)`, then Available serialized units by
    /// `(receipt_date, serial_number)`. Fully drained records transition
    /// Available → Allocated.
    fn allocate(
        &self,
        part: &PartNumber,
        location: &str,
        quantity: Quantity,
    ) -> Result<AllocationResult>;
}

/// Top-level demand source
pub trait DemandRepository: Send + Sync {
    /// All demands, in input order
    fn all_demands(&self) -> Result<Vec<DemandRequirement>>;
}

/// In-memory repositories for testing and simple use cases
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    #[derive(Clone, Default)]
    pub struct InMemoryItemRepository {
        items: Arc<RwLock<HashMap<PartNumber, Item>>>,
    }

    impl InMemoryItemRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_item(&self, item: Item) {
            let mut items = self.items.write().unwrap();
            items.insert(item.part.clone(), item);
        }
    }

    impl ItemRepository for InMemoryItemRepository {
        fn get_item(&self, part: &PartNumber) -> Result<Item> {
            let items = self.items.read().unwrap();
            items
                .get(part)
                .cloned()
                .ok_or_else(|| MrpError::ItemNotFound(part.0.clone()))
        }

        fn find_item(&self, part: &PartNumber) -> Result<Option<Item>> {
            let items = self.items.read().unwrap();
            Ok(items.get(part).cloned())
        }

        fn get_items(&self, parts: &[PartNumber]) -> Result<Vec<Item>> {
            let items = self.items.read().unwrap();
            parts
                .iter()
                .map(|part| {
                    items
                        .get(part)
                        .cloned()
                        .ok_or_else(|| MrpError::ItemNotFound(part.0.clone()))
                })
                .collect()
        }

        fn all_items(&self) -> Result<Vec<Item>> {
            let items = self.items.read().unwrap();
            let mut all: Vec<Item> = items.values().cloned().collect();
            all.sort_by(|a, b| a.part.cmp(&b.part));
            Ok(all)
        }
    }

    #[derive(Clone, Default)]
    pub struct InMemoryBomRepository {
        lines: Arc<RwLock<Vec<BomLine>>>,
    }

    impl InMemoryBomRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_line(&self, line: BomLine) {
            let mut lines = self.lines.write().unwrap();
            lines.push(line);
        }
    }

    impl BomRepository for InMemoryBomRepository {
        fn lines_for(&self, parent: &PartNumber) -> Result<Vec<BomLine>> {
            let lines = self.lines.read().unwrap();
            Ok(lines
                .iter()
                .filter(|line| line.parent == *parent)
                .cloned()
                .collect())
        }

        fn alternate_groups(&self, parent: &PartNumber) -> Result<BTreeMap<u32, Vec<BomLine>>> {
            let lines = self.lines.read().unwrap();
            let mut groups: BTreeMap<u32, Vec<BomLine>> = BTreeMap::new();
            for line in lines.iter().filter(|line| line.parent == *parent) {
                groups.entry(line.find_number).or_default().push(line.clone());
            }
            Ok(groups)
        }

        fn effective_alternates(
            &self,
            parent: &PartNumber,
            find_number: u32,
            target_serial: &Serial,
        ) -> Result<Vec<BomLine>> {
            let lines = self.lines.read().unwrap();
            Ok(lines
                .iter()
                .filter(|line| {
                    line.parent == *parent
                        && line.find_number == find_number
                        && line.effectivity.contains(target_serial)
                })
                .cloned()
                .collect())
        }

        fn effective_lines(
            &self,
            parent: &PartNumber,
            target_serial: &Serial,
        ) -> Result<Vec<BomLine>> {
            let lines = self.lines.read().unwrap();
            Ok(lines
                .iter()
                .filter(|line| {
                    line.parent == *parent && line.effectivity.contains(target_serial)
                })
                .cloned()
                .collect())
        }

        fn all_lines(&self) -> Result<Vec<BomLine>> {
            let lines = self.lines.read().unwrap();
            Ok(lines.clone())
        }
    }

    #[derive(Clone, Default)]
    pub struct InMemoryInventoryRepository {
        lots: Arc<RwLock<Vec<InventoryLot>>>,
        serials: Arc<RwLock<Vec<SerializedInventory>>>,
    }

    impl InMemoryInventoryRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_lot(&self, lot: InventoryLot) {
            let mut lots = self.lots.write().unwrap();
            lots.push(lot);
        }

        pub fn add_serial(&self, unit: SerializedInventory) {
            let mut serials = self.serials.write().unwrap();
            serials.push(unit);
        }

        /// Snapshot of all lot records, for reporting
        pub fn lots(&self) -> Vec<InventoryLot> {
            self.lots.read().unwrap().clone()
        }

        /// Snapshot of all serialized records, for reporting
        pub fn serials(&self) -> Vec<SerializedInventory> {
            self.serials.read().unwrap().clone()
        }
    }

    impl InventoryRepository for InMemoryInventoryRepository {
        fn available_lots(&self, part: &PartNumber, location: &str) -> Result<Vec<InventoryLot>> {
            let lots = self.lots.read().unwrap();
            Ok(lots
                .iter()
                .filter(|lot| {
                    lot.part == *part
                        && lot.location == location
                        && lot.status == InventoryStatus::Available
                        && lot.quantity > 0
                })
                .cloned()
                .collect())
        }

        fn available_serials(
            &self,
            part: &PartNumber,
            location: &str,
        ) -> Result<Vec<SerializedInventory>> {
            let serials = self.serials.read().unwrap();
            Ok(serials
                .iter()
                .filter(|unit| {
                    unit.part == *part
                        && unit.location == location
                        && unit.status == InventoryStatus::Available
                })
                .cloned()
                .collect())
        }

        fn available_quantity(&self, part: &PartNumber, location: &str) -> Result<Quantity> {
            let lot_qty: Quantity = self
                .available_lots(part, location)?
                .iter()
                .map(|lot| lot.quantity)
                .sum();
            let serial_qty = self.available_serials(part, location)?.len() as Quantity;
            Ok(lot_qty + serial_qty)
        }

        fn allocate(
            &self,
            part: &PartNumber,
            location: &str,
            quantity: Quantity,
        ) -> Result<AllocationResult> {
            if quantity < 0 {
                return Err(MrpError::AllocationError(format!(
                    "negative demand {} for {}",
                    quantity,
                    part.as_str()
                )));
            }

            let mut allocated_from = Vec::new();
            let mut remaining = quantity;

            // Lots first, oldest receipt first, lot number breaking ties
            {
                let mut lots = self.lots.write().unwrap();
                let mut candidates: Vec<usize> = lots
                    .iter()
                    .enumerate()
                    .filter(|(_, lot)| {
                        lot.part == *part
                            && lot.location == location
                            && lot.status == InventoryStatus::Available
                            && lot.quantity > 0
                    })
                    .map(|(idx, _)| idx)
                    .collect();
                candidates.sort_by(|&a, &b| {
                    lots[a]
                        .receipt_date
                        .cmp(&lots[b].receipt_date)
                        .then_with(|| lots[a].lot_number.cmp(&lots[b].lot_number))
                });

                for idx in candidates {
                    if remaining == 0 {
                        break;
                    }
                    let lot = &mut lots[idx];
                    let draw = lot.quantity.min(remaining);
                    allocated_from.push(AllocationSource::Lot {
                        lot_number: lot.lot_number.clone(),
                        quantity: draw,
                    });
                    remaining -= draw;
                    if draw == lot.quantity {
                        lot.status = InventoryStatus::Allocated;
                    } else {
                        lot.quantity -= draw;
                    }
                }
            }

            // Then serialized units, one each
            if remaining > 0 {
                let mut serials = self.serials.write().unwrap();
                let mut candidates: Vec<usize> = serials
                    .iter()
                    .enumerate()
                    .filter(|(_, unit)| {
                        unit.part == *part
                            && unit.location == location
                            && unit.status == InventoryStatus::Available
                    })
                    .map(|(idx, _)| idx)
                    .collect();
                candidates.sort_by(|&a, &b| {
                    serials[a]
                        .receipt_date
                        .cmp(&serials[b].receipt_date)
                        .then_with(|| serials[a].serial_number.cmp(&serials[b].serial_number))
                });

                for idx in candidates {
                    if remaining == 0 {
                        break;
                    }
                    let unit = &mut serials[idx];
                    allocated_from.push(AllocationSource::Serialized {
                        serial_number: unit.serial_number.clone(),
                    });
                    unit.status = InventoryStatus::Allocated;
                    remaining -= 1;
                }
            }

            Ok(AllocationResult {
                part: part.clone(),
                location: location.to_string(),
                allocated_qty: quantity - remaining,
                remaining_demand: remaining,
                allocated_from,
            })
        }
    }

    #[derive(Clone, Default)]
    pub struct InMemoryDemandRepository {
        demands: Arc<RwLock<Vec<DemandRequirement>>>,
    }

    impl InMemoryDemandRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_demand(&self, demand: DemandRequirement) {
            let mut demands = self.demands.write().unwrap();
            demands.push(demand);
        }
    }

    impl DemandRepository for InMemoryDemandRepository {
        fn all_demands(&self) -> Result<Vec<DemandRequirement>> {
            let demands = self.demands.read().unwrap();
            Ok(demands.clone())
        }
    }
}
