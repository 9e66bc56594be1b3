use chrono::Duration;
use mrp_core::{
    Item, ItemRepository, LotSizeRule, MakeBuy, NetRequirement, OrderType, PlannedOrder, Quantity,
    Result,
};
use uuid::Uuid;

/// Lead time assumed for parts without an item master record
pub const DEFAULT_LEAD_TIME_DAYS: i64 = 7;

/// Turns net requirements into planned orders (C9): lot-sizing, make/buy
/// typing, back-scheduling, and splitting against the max order quantity.
pub struct OrderPlanner<'a> {
    items: &'a dyn ItemRepository,
}

impl<'a> OrderPlanner<'a> {
    pub fn new(items: &'a dyn ItemRepository) -> Self {
        Self { items }
    }

    pub fn plan_orders(&self, net_requirements: &[NetRequirement]) -> Result<Vec<PlannedOrder>> {
        let mut orders = Vec::new();

        for req in net_requirements {
            match self.items.find_item(&req.part)? {
                Some(item) => {
                    let order_qty = lot_size(&item, req.quantity);
                    if order_qty == 0 {
                        continue;
                    }
                    split_into_orders(
                        req,
                        order_qty,
                        item.max_order_qty,
                        item.lead_time_days,
                        order_type_for(&item),
                        &mut orders,
                    );
                }
                None => {
                    tracing::debug!(
                        part = req.part.as_str(),
                        "no item master record; planning with default lead time"
                    );
                    split_into_orders(
                        req,
                        req.quantity,
                        req.quantity,
                        DEFAULT_LEAD_TIME_DAYS,
                        OrderType::Make,
                        &mut orders,
                    );
                }
            }
        }

        Ok(orders)
    }
}

/// Smallest quantity satisfying the item's lot rule that covers the net
/// requirement
fn lot_size(item: &Item, net_qty: Quantity) -> Quantity {
    match item.lot_rule {
        LotSizeRule::LotForLot => net_qty,
        LotSizeRule::MinimumQty => net_qty.max(item.min_order_qty),
        LotSizeRule::StandardPack => {
            let packs = (net_qty + item.min_order_qty - 1) / item.min_order_qty;
            packs * item.min_order_qty
        }
    }
}

fn order_type_for(item: &Item) -> OrderType {
    match item.make_buy {
        Some(MakeBuy::Make) => OrderType::Make,
        Some(MakeBuy::Buy) => OrderType::Buy,
        // Long procurement horizons read as purchased parts
        None => {
            if item.lead_time_days > 30 {
                OrderType::Buy
            } else {
                OrderType::Make
            }
        }
    }
}

/// Back-schedule one or more orders for a requirement. The first order is
/// due on the need date with `start = due - lead`; when the quantity
/// exceeds the max order size the overflow chains back-to-back, each
/// split starting on the previous order's due date.
fn split_into_orders(
    req: &NetRequirement,
    order_qty: Quantity,
    max_order_qty: Quantity,
    lead_time_days: i64,
    order_type: OrderType,
    orders: &mut Vec<PlannedOrder>,
) {
    let lead = Duration::days(lead_time_days);
    let mut remaining = order_qty;
    let mut due = req.need_date;
    let mut start = due - lead;
    let mut split_index = 1;

    while remaining > 0 {
        let quantity = remaining.min(max_order_qty);
        let demand_trace = if split_index == 1 {
            req.demand_trace.clone()
        } else {
            format!("{} (Split {})", req.demand_trace, split_index)
        };

        orders.push(PlannedOrder {
            id: Uuid::new_v4(),
            part: req.part.clone(),
            quantity,
            start_date: start,
            due_date: due,
            demand_trace,
            location: req.location.clone(),
            order_type,
            target_serial: req.target_serial.clone(),
        });

        remaining -= quantity;
        start = due;
        due = start + lead;
        split_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_core::repository::memory::InMemoryItemRepository;
    use mrp_core::{PartNumber, Serial};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_item(part: &str, lead: i64, rule: LotSizeRule, min: Quantity) -> Item {
        Item {
            part: PartNumber::new(part),
            description: format!("Item {}", part),
            lead_time_days: lead,
            lot_rule: rule,
            min_order_qty: min,
            max_order_qty: 10_000,
            safety_stock: 0,
            uom: "EA".to_string(),
            make_buy: Some(MakeBuy::Make),
        }
    }

    fn net(part: &str, qty: Quantity, need: NaiveDate) -> NetRequirement {
        NetRequirement {
            part: PartNumber::new(part),
            quantity: qty,
            need_date: need,
            demand_trace: format!("SO-1 -> {}", part),
            location: "FACTORY".to_string(),
            target_serial: Serial::new("SN001"),
        }
    }

    #[test]
    fn test_lot_for_lot_back_scheduling() {
        let items = InMemoryItemRepository::new();
        items.add_item(create_test_item("A", 30, LotSizeRule::LotForLot, 0));

        let orders = OrderPlanner::new(&items)
            .plan_orders(&[net("A", 1, date(2025, 2, 1))])
            .unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, 1);
        assert_eq!(orders[0].due_date, date(2025, 2, 1));
        assert_eq!(orders[0].start_date, date(2025, 1, 2));
        assert_eq!(orders[0].order_type, OrderType::Make);
    }

    #[test]
    fn test_minimum_qty_rounds_up() {
        let items = InMemoryItemRepository::new();
        items.add_item(create_test_item("A", 10, LotSizeRule::MinimumQty, 50));

        let orders = OrderPlanner::new(&items)
            .plan_orders(&[net("A", 20, date(2025, 2, 1))])
            .unwrap();
        assert_eq!(orders[0].quantity, 50);

        let orders = OrderPlanner::new(&items)
            .plan_orders(&[net("A", 80, date(2025, 2, 1))])
            .unwrap();
        assert_eq!(orders[0].quantity, 80);
    }

    #[test]
    fn test_standard_pack_ceiling() {
        let items = InMemoryItemRepository::new();
        items.add_item(create_test_item("A", 10, LotSizeRule::StandardPack, 25));

        let orders = OrderPlanner::new(&items)
            .plan_orders(&[net("A", 60, date(2025, 2, 1))])
            .unwrap();
        assert_eq!(orders[0].quantity, 75); // 3 packs of 25

        let orders = OrderPlanner::new(&items)
            .plan_orders(&[net("A", 75, date(2025, 2, 1))])
            .unwrap();
        assert_eq!(orders[0].quantity, 75); // exact multiple stays put
    }

    #[test]
    fn test_make_buy_fallback_on_lead_time() {
        let items = InMemoryItemRepository::new();
        let mut long = create_test_item("LONG", 45, LotSizeRule::LotForLot, 0);
        long.make_buy = None;
        let mut short = create_test_item("SHORT", 20, LotSizeRule::LotForLot, 0);
        short.make_buy = None;
        items.add_item(long);
        items.add_item(short);

        let orders = OrderPlanner::new(&items)
            .plan_orders(&[
                net("LONG", 1, date(2025, 6, 1)),
                net("SHORT", 1, date(2025, 6, 1)),
            ])
            .unwrap();

        assert_eq!(orders[0].order_type, OrderType::Buy);
        assert_eq!(orders[1].order_type, OrderType::Make);
    }

    #[test]
    fn test_split_orders_chain_back_to_back() {
        let items = InMemoryItemRepository::new();
        let mut item = create_test_item("A", 60, LotSizeRule::LotForLot, 0);
        item.max_order_qty = 10;
        items.add_item(item);

        let orders = OrderPlanner::new(&items)
            .plan_orders(&[net("A", 25, date(2025, 6, 30))])
            .unwrap();

        assert_eq!(orders.len(), 3);

        assert_eq!(orders[0].quantity, 10);
        assert_eq!(orders[0].start_date, date(2025, 5, 1));
        assert_eq!(orders[0].due_date, date(2025, 6, 30));
        assert_eq!(orders[0].demand_trace, "SO-1 -> A");

        assert_eq!(orders[1].quantity, 10);
        assert_eq!(orders[1].start_date, date(2025, 6, 30));
        assert_eq!(orders[1].due_date, date(2025, 8, 29));
        assert_eq!(orders[1].demand_trace, "SO-1 -> A (Split 2)");

        assert_eq!(orders[2].quantity, 5);
        assert_eq!(orders[2].start_date, date(2025, 8, 29));
        assert_eq!(orders[2].due_date, date(2025, 10, 28));
        assert_eq!(orders[2].demand_trace, "SO-1 -> A (Split 3)");

        // Every order spans exactly one lead time
        for order in &orders {
            assert_eq!(order.due_date - order.start_date, Duration::days(60));
        }
    }

    #[test]
    fn test_missing_item_gets_default_lead_time() {
        let items = InMemoryItemRepository::new();

        let orders = OrderPlanner::new(&items)
            .plan_orders(&[net("GHOST", 3, date(2025, 2, 8))])
            .unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, 3);
        assert_eq!(orders[0].order_type, OrderType::Make);
        assert_eq!(orders[0].start_date, date(2025, 2, 1));
    }

    #[test]
    fn test_lot_sizing_minimality() {
        // The chosen quantity satisfies the rule and no smaller quantity
        // >= the net requirement does
        let item = create_test_item("A", 10, LotSizeRule::StandardPack, 25);
        for net_qty in 1..=100 {
            let chosen = lot_size(&item, net_qty);
            assert!(chosen >= net_qty);
            assert_eq!(chosen % 25, 0);
            assert!(chosen - 25 < net_qty, "{} not minimal for {}", chosen, net_qty);
        }
    }
}
