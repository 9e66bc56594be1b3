use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use mrp_core::repository::memory::{
    InMemoryBomRepository, InMemoryDemandRepository, InMemoryInventoryRepository,
    InMemoryItemRepository,
};
use mrp_core::*;
use serde::Deserialize;
use std::path::Path;

/// Raw planning dataset as loaded from disk or a built-in scenario
#[derive(Debug, Default)]
pub struct PlanningData {
    pub items: Vec<Item>,
    pub bom_lines: Vec<BomLine>,
    pub lots: Vec<InventoryLot>,
    pub serials: Vec<SerializedInventory>,
    pub demands: Vec<DemandRequirement>,
}

#[derive(Debug, Deserialize)]
struct ItemRecord {
    part_number: String,
    description: String,
    lead_time_days: i64,
    lot_size_rule: String,
    min_order_qty: Quantity,
    max_order_qty: Quantity,
    safety_stock: Quantity,
    unit_of_measure: String,
    #[serde(default)]
    make_buy_code: String,
}

#[derive(Debug, Deserialize)]
struct BomRecord {
    parent_pn: String,
    child_pn: String,
    qty_per: Quantity,
    find_number: u32,
    from_serial: String,
    #[serde(default)]
    to_serial: String,
    priority: u32,
}

#[derive(Debug, Deserialize)]
struct InventoryRecord {
    part_number: String,
    #[serde(rename = "type")]
    record_type: String,
    identifier: String,
    location: String,
    quantity: Quantity,
    receipt_date: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct DemandRecord {
    part_number: String,
    quantity: Quantity,
    need_date: String,
    demand_source: String,
    location: String,
    target_serial: String,
}

fn parse_date(s: &str, what: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid {} date: {}", what, s))
}

fn parse_lot_rule(s: &str) -> Result<LotSizeRule> {
    match s {
        "LotForLot" | "lot_for_lot" => Ok(LotSizeRule::LotForLot),
        "MinimumQty" | "minimum_qty" => Ok(LotSizeRule::MinimumQty),
        "StandardPack" | "standard_pack" => Ok(LotSizeRule::StandardPack),
        other => bail!("unknown lot size rule: {}", other),
    }
}

fn parse_make_buy(s: &str) -> Result<Option<MakeBuy>> {
    match s {
        "" => Ok(None),
        "M" | "Make" => Ok(Some(MakeBuy::Make)),
        "B" | "Buy" => Ok(Some(MakeBuy::Buy)),
        other => bail!("unknown make/buy code: {}", other),
    }
}

fn parse_status(s: &str) -> Result<InventoryStatus> {
    match s {
        "Available" | "available" => Ok(InventoryStatus::Available),
        "Allocated" | "allocated" => Ok(InventoryStatus::Allocated),
        "Quarantine" | "quarantine" => Ok(InventoryStatus::Quarantine),
        other => bail!("unknown inventory status: {}", other),
    }
}

pub fn load_items(path: &Path) -> Result<Vec<Item>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open items file {}", path.display()))?;

    let mut items = Vec::new();
    for record in reader.deserialize() {
        let record: ItemRecord = record.context("malformed items row")?;
        items.push(Item {
            part: PartNumber::new(record.part_number),
            description: record.description,
            lead_time_days: record.lead_time_days,
            lot_rule: parse_lot_rule(&record.lot_size_rule)?,
            min_order_qty: record.min_order_qty,
            max_order_qty: record.max_order_qty,
            safety_stock: record.safety_stock,
            uom: record.unit_of_measure,
            make_buy: parse_make_buy(&record.make_buy_code)?,
        });
    }
    Ok(items)
}

pub fn load_bom(path: &Path) -> Result<Vec<BomLine>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open BOM file {}", path.display()))?;

    let mut lines = Vec::new();
    for record in reader.deserialize() {
        let record: BomRecord = record.context("malformed BOM row")?;
        let to = if record.to_serial.is_empty() {
            None
        } else {
            Some(Serial::new(record.to_serial))
        };
        lines.push(BomLine {
            parent: PartNumber::new(record.parent_pn),
            child: PartNumber::new(record.child_pn),
            qty_per: record.qty_per,
            find_number: record.find_number,
            effectivity: SerialEffectivity::new(Serial::new(record.from_serial), to),
            priority: record.priority,
        });
    }
    Ok(lines)
}

pub fn load_inventory(path: &Path) -> Result<(Vec<InventoryLot>, Vec<SerializedInventory>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open inventory file {}", path.display()))?;

    let mut lots = Vec::new();
    let mut serials = Vec::new();
    for record in reader.deserialize() {
        let record: InventoryRecord = record.context("malformed inventory row")?;
        let receipt_date = parse_date(&record.receipt_date, "receipt")?;
        let status = parse_status(&record.status)?;
        match record.record_type.as_str() {
            "lot" => lots.push(InventoryLot {
                part: PartNumber::new(record.part_number),
                lot_number: record.identifier,
                location: record.location,
                quantity: record.quantity,
                receipt_date,
                status,
            }),
            "serial" => serials.push(SerializedInventory {
                part: PartNumber::new(record.part_number),
                serial_number: Serial::new(record.identifier),
                location: record.location,
                status,
                receipt_date,
            }),
            other => bail!("unknown inventory record type: {}", other),
        }
    }
    Ok((lots, serials))
}

pub fn load_demands(path: &Path) -> Result<Vec<DemandRequirement>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open demands file {}", path.display()))?;

    let mut demands = Vec::new();
    for record in reader.deserialize() {
        let record: DemandRecord = record.context("malformed demands row")?;
        demands.push(DemandRequirement {
            part: PartNumber::new(record.part_number),
            quantity: record.quantity,
            need_date: parse_date(&record.need_date, "need")?,
            source: record.demand_source,
            location: record.location,
            target_serial: Serial::new(record.target_serial),
        });
    }
    Ok(demands)
}

impl PlanningData {
    /// Validate the dataset and load it into in-memory repositories
    pub fn into_repositories(
        self,
    ) -> Result<(
        InMemoryItemRepository,
        InMemoryBomRepository,
        InMemoryInventoryRepository,
        InMemoryDemandRepository,
    )> {
        validate::validate_inventory(&self.lots, &self.serials)?;

        let items = InMemoryItemRepository::new();
        for item in self.items {
            items.add_item(item);
        }

        let bom = InMemoryBomRepository::new();
        for line in self.bom_lines {
            bom.add_line(line);
        }

        let inventory = InMemoryInventoryRepository::new();
        for lot in self.lots {
            inventory.add_lot(lot);
        }
        for unit in self.serials {
            inventory.add_serial(unit);
        }

        let demands = InMemoryDemandRepository::new();
        for demand in self.demands {
            demands.add_demand(demand);
        }

        Ok((items, bom, inventory, demands))
    }
}

/// Built-in demo dataset: a two-flight launch campaign with a guidance
/// unit cut-in at AS506, partial engine stock, and a deliberately long
/// turbopump chain.
pub fn demo_scenario() -> PlanningData {
    fn item(
        part: &str,
        description: &str,
        lead: i64,
        rule: LotSizeRule,
        min: Quantity,
        max: Quantity,
        make_buy: Option<MakeBuy>,
    ) -> Item {
        Item {
            part: PartNumber::new(part),
            description: description.to_string(),
            lead_time_days: lead,
            lot_rule: rule,
            min_order_qty: min,
            max_order_qty: max,
            safety_stock: 0,
            uom: "EA".to_string(),
            make_buy,
        }
    }

    fn line(parent: &str, child: &str, qty: Quantity, find: u32, from: &str, to: Option<&str>, priority: u32) -> BomLine {
        BomLine {
            parent: PartNumber::new(parent),
            child: PartNumber::new(child),
            qty_per: qty,
            find_number: find,
            effectivity: SerialEffectivity::new(Serial::new(from), to.map(Serial::new)),
            priority,
        }
    }

    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

    PlanningData {
        items: vec![
            item("LAUNCH-VEHICLE", "Two-stage launch vehicle", 30, LotSizeRule::LotForLot, 0, 10, Some(MakeBuy::Make)),
            item("FIRST-STAGE", "First stage assembly", 60, LotSizeRule::LotForLot, 0, 10, Some(MakeBuy::Make)),
            item("SECOND-STAGE", "Second stage assembly", 45, LotSizeRule::LotForLot, 0, 10, Some(MakeBuy::Make)),
            item("FAIRING", "Payload fairing half-shell pair", 40, LotSizeRule::LotForLot, 0, 10, Some(MakeBuy::Make)),
            item("ENGINE", "Sea-level engine", 90, LotSizeRule::LotForLot, 0, 3, Some(MakeBuy::Make)),
            item("ENGINE-VAC", "Vacuum-optimized engine", 100, LotSizeRule::LotForLot, 0, 2, Some(MakeBuy::Make)),
            item("TURBOPUMP", "Engine turbopump", 75, LotSizeRule::LotForLot, 0, 5, Some(MakeBuy::Buy)),
            item("GUIDANCE-V1", "Guidance unit, block 1", 50, LotSizeRule::LotForLot, 0, 10, Some(MakeBuy::Buy)),
            item("GUIDANCE-V2", "Guidance unit, block 2", 55, LotSizeRule::LotForLot, 0, 10, Some(MakeBuy::Buy)),
            item("TANK-DOME", "Propellant tank dome", 35, LotSizeRule::StandardPack, 4, 8, Some(MakeBuy::Buy)),
            item("FASTENER-KIT", "Structural fastener kit", 14, LotSizeRule::MinimumQty, 20, 500, None),
        ],
        bom_lines: vec![
            line("LAUNCH-VEHICLE", "FIRST-STAGE", 1, 100, "AS501", None, 0),
            line("LAUNCH-VEHICLE", "SECOND-STAGE", 1, 200, "AS501", None, 0),
            line("LAUNCH-VEHICLE", "FAIRING", 1, 300, "AS501", None, 0),
            line("FIRST-STAGE", "ENGINE", 9, 100, "AS501", None, 0),
            line("FIRST-STAGE", "TANK-DOME", 2, 200, "AS501", None, 0),
            line("FIRST-STAGE", "FASTENER-KIT", 40, 300, "AS501", None, 0),
            line("SECOND-STAGE", "ENGINE-VAC", 1, 100, "AS501", None, 0),
            line("SECOND-STAGE", "TANK-DOME", 2, 200, "AS501", None, 0),
            // Guidance block cut-in at AS506
            line("SECOND-STAGE", "GUIDANCE-V1", 1, 400, "AS501", Some("AS505"), 0),
            line("SECOND-STAGE", "GUIDANCE-V2", 1, 400, "AS506", None, 0),
            line("ENGINE", "TURBOPUMP", 1, 100, "AS501", None, 0),
            line("ENGINE-VAC", "TURBOPUMP", 1, 100, "AS501", None, 0),
        ],
        lots: vec![
            InventoryLot {
                part: PartNumber::new("TANK-DOME"),
                lot_number: "TD-2401".to_string(),
                location: "FACTORY".to_string(),
                quantity: 4,
                receipt_date: date(2025, 3, 10),
                status: InventoryStatus::Available,
            },
            InventoryLot {
                part: PartNumber::new("FASTENER-KIT"),
                lot_number: "FK-88".to_string(),
                location: "FACTORY".to_string(),
                quantity: 60,
                receipt_date: date(2025, 2, 1),
                status: InventoryStatus::Available,
            },
        ],
        serials: vec![
            SerializedInventory {
                part: PartNumber::new("ENGINE"),
                serial_number: Serial::new("EN101"),
                location: "FACTORY".to_string(),
                status: InventoryStatus::Available,
                receipt_date: date(2025, 4, 2),
            },
            SerializedInventory {
                part: PartNumber::new("ENGINE"),
                serial_number: Serial::new("EN102"),
                location: "FACTORY".to_string(),
                status: InventoryStatus::Available,
                receipt_date: date(2025, 4, 20),
            },
        ],
        demands: vec![
            DemandRequirement {
                part: PartNumber::new("LAUNCH-VEHICLE"),
                quantity: 1,
                need_date: date(2026, 3, 1),
                source: "FLIGHT-12".to_string(),
                location: "FACTORY".to_string(),
                target_serial: Serial::new("AS503"),
            },
            DemandRequirement {
                part: PartNumber::new("LAUNCH-VEHICLE"),
                quantity: 1,
                need_date: date(2026, 9, 1),
                source: "FLIGHT-13".to_string(),
                location: "FACTORY".to_string(),
                target_serial: Serial::new("AS507"),
            },
        ],
    }
}

pub fn builtin_scenario(name: &str) -> Result<PlanningData> {
    match name {
        "demo" => Ok(demo_scenario()),
        other => bail!("unknown scenario: {} (available: demo)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scenario_is_valid() {
        let data = demo_scenario();
        validate::validate_items(&data.items).unwrap();
        validate::validate_bom(&data.bom_lines).unwrap();
        validate::validate_inventory(&data.lots, &data.serials).unwrap();
        validate::validate_demands(&data.demands).unwrap();
    }

    #[test]
    fn test_lot_rule_parsing() {
        assert_eq!(parse_lot_rule("LotForLot").unwrap(), LotSizeRule::LotForLot);
        assert_eq!(parse_lot_rule("standard_pack").unwrap(), LotSizeRule::StandardPack);
        assert!(parse_lot_rule("EOQ").is_err());
    }

    #[test]
    fn test_make_buy_parsing() {
        assert_eq!(parse_make_buy("M").unwrap(), Some(MakeBuy::Make));
        assert_eq!(parse_make_buy("Buy").unwrap(), Some(MakeBuy::Buy));
        assert_eq!(parse_make_buy("").unwrap(), None);
        assert!(parse_make_buy("X").is_err());
    }
}
