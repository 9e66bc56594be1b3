use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Discrete unit count. All arithmetic is exact; fractional units do not
/// exist in this domain.
pub type Quantity = i64;

/// Unique identifier for parts
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartNumber(pub String);

impl PartNumber {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Effectivity serial (e.g. `AS502`, `SN001`): a non-digit prefix followed
/// by an unsigned unit number. Ordering is defined in [`crate::serial`],
/// not derived from the raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Serial(pub String);

impl Serial {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Serial range over which a BOM line participates in explosion (序號效用).
/// An absent `to` means open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialEffectivity {
    pub from: Serial,
    pub to: Option<Serial>,
}

impl SerialEffectivity {
    pub fn new(from: Serial, to: Option<Serial>) -> Self {
        Self { from, to }
    }

    /// Effective from the given serial onward, unbounded above.
    pub fn open_ended(from: Serial) -> Self {
        Self { from, to: None }
    }
}

/// Lot-sizing rule (批量規則) mapping a net requirement to an order quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotSizeRule {
    /// Order exactly the net quantity
    LotForLot,

    /// Order at least `min_order_qty`
    MinimumQty,

    /// Order in whole multiples of `min_order_qty`
    StandardPack,
}

/// Procurement code (自製/採購)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MakeBuy {
    Make,
    Buy,
}

/// Item master record
/// Compatible with SAP MARA/MARC and Oracle MTL_SYSTEM_ITEMS_B
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Part number (Material Number in SAP, Item ID in Oracle)
    pub part: PartNumber,

    /// Item description
    pub description: String,

    /// Lead time in calendar days
    pub lead_time_days: i64,

    /// Lot-sizing rule
    pub lot_rule: LotSizeRule,

    /// Minimum order quantity (required > 0 for MinimumQty/StandardPack)
    pub min_order_qty: Quantity,

    /// Maximum quantity on a single planned order
    pub max_order_qty: Quantity,

    /// Safety stock level
    pub safety_stock: Quantity,

    /// Unit of measure
    pub uom: String,

    /// Make/buy code; when absent the planner falls back to the
    /// lead-time rule
    pub make_buy: Option<MakeBuy>,
}

/// BOM line - one parent→child relationship with serial effectivity
/// Compatible with SAP STPO and Oracle BOM_COMPONENTS_B
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLine {
    /// Parent part number
    pub parent: PartNumber,

    /// Child part number
    pub child: PartNumber,

    /// Quantity of child required per unit of parent (基礎用量)
    pub qty_per: Quantity,

    /// Position identifier on the parent; lines sharing a find number are
    /// alternates (替代料組)
    pub find_number: u32,

    /// Serial range over which this line is effective
    pub effectivity: SerialEffectivity,

    /// Preference within the alternate group; 0 is the primary
    pub priority: u32,
}

/// Inventory record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryStatus {
    Available,
    Allocated,
    Quarantine,
}

/// Lot-controlled on-hand inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLot {
    pub part: PartNumber,
    pub lot_number: String,
    pub location: String,
    pub quantity: Quantity,
    pub receipt_date: NaiveDate,
    pub status: InventoryStatus,
}

/// Serialized on-hand inventory; each record is one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedInventory {
    pub part: PartNumber,
    pub serial_number: Serial,
    pub location: String,
    pub status: InventoryStatus,
    pub receipt_date: NaiveDate,
}

/// Top-level demand driving a planning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandRequirement {
    pub part: PartNumber,
    pub quantity: Quantity,
    pub need_date: NaiveDate,

    /// Originating document (sales order, program milestone, ...)
    pub source: String,

    pub location: String,

    /// Effectivity serial the demand builds toward
    pub target_serial: Serial,
}

/// Exploded requirement before inventory netting (毛需求).
/// `demand_trace` is the `"source -> parent -> ... -> part"` chain back to
/// the originating demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrossRequirement {
    pub part: PartNumber,
    pub quantity: Quantity,
    pub need_date: NaiveDate,
    pub demand_trace: String,
    pub location: String,
    pub target_serial: Serial,
}

/// Requirement remaining after inventory allocation (淨需求)
pub type NetRequirement = GrossRequirement;

/// One draw recorded during allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationSource {
    /// Quantity drawn from a lot
    Lot {
        lot_number: String,
        quantity: Quantity,
    },

    /// A single serialized unit
    Serialized { serial_number: Serial },
}

/// Result of allocating one `(part, location)` demand group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationResult {
    pub part: PartNumber,
    pub location: String,
    pub allocated_qty: Quantity,
    pub remaining_demand: Quantity,
    pub allocated_from: Vec<AllocationSource>,
}

/// Planned order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Make,
    Buy,
    Transfer,
}

/// Planned make/buy order produced by the order planner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedOrder {
    pub id: Uuid,
    pub part: PartNumber,
    pub quantity: Quantity,

    /// Order release date; `due_date - lead_time_days`
    pub start_date: NaiveDate,

    /// Completion date; equals the requirement's need date for the first
    /// order of a split chain
    pub due_date: NaiveDate,

    pub demand_trace: String,
    pub location: String,
    pub order_type: OrderType,
    pub target_serial: Serial,
}

/// Unplanned remainder: net requirement not covered by planned supply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortage {
    pub part: PartNumber,
    pub location: String,
    pub short_qty: Quantity,
    pub need_date: NaiveDate,
    pub demand_trace: String,
    pub target_serial: Serial,
}

/// One node on a critical path, with its inventory coverage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalPathNode {
    pub part: PartNumber,
    pub description: String,
    pub lead_time_days: i64,

    /// Chain lead time from this node down to the end of the path
    pub cumulative_time: i64,

    pub level: usize,
    pub has_inventory: bool,
    pub inventory_qty: Quantity,
    pub required_qty: Quantity,

    /// Lead time after inventory credit
    pub effective_lead_time: i64,
}

/// One root-to-leaf chain through the effective BOM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalPath {
    pub total_lead_time: i64,
    pub effective_lead_time: i64,
    pub path_length: usize,
    pub path: Vec<PartNumber>,
    pub details: Vec<CriticalPathNode>,

    /// Part with the longest individual lead time on this path
    pub bottleneck_part: PartNumber,
}

/// Critical-path analysis result (關鍵路徑分析)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalPathAnalysis {
    pub top_level_part: PartNumber,
    pub target_serial: Serial,
    pub location: String,
    pub analysis_date: DateTime<Utc>,

    /// Longest effective-lead-time chain; `None` only for an empty BOM
    pub critical_path: Option<CriticalPath>,

    /// Top N paths, descending
    pub top_paths: Vec<CriticalPath>,

    /// Paths enumerated before truncation to N
    pub total_paths: usize,

    /// Fraction of top paths containing at least one node with inventory
    pub inventory_coverage: f64,
}
