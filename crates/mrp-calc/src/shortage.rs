use mrp_core::{NetRequirement, PartNumber, PlannedOrder, Quantity, Shortage};
use std::collections::HashMap;

/// Diffs planned supply against net requirements per `(part, location)`
/// (C10). The planner normally covers every requirement, so shortages
/// only appear when planning capped or dropped quantity.
pub struct ShortageDetector;

impl ShortageDetector {
    pub fn detect(
        net_requirements: &[NetRequirement],
        planned_orders: &[PlannedOrder],
    ) -> Vec<Shortage> {
        let mut group_order: Vec<(PartNumber, String)> = Vec::new();
        let mut required: HashMap<(PartNumber, String), Quantity> = HashMap::new();
        let mut first_req: HashMap<(PartNumber, String), &NetRequirement> = HashMap::new();

        for req in net_requirements {
            let key = (req.part.clone(), req.location.clone());
            if !required.contains_key(&key) {
                group_order.push(key.clone());
                first_req.insert(key.clone(), req);
            }
            *required.entry(key).or_insert(0) += req.quantity;
        }

        let mut planned: HashMap<(PartNumber, String), Quantity> = HashMap::new();
        for order in planned_orders {
            let key = (order.part.clone(), order.location.clone());
            *planned.entry(key).or_insert(0) += order.quantity;
        }

        let mut shortages = Vec::new();
        for key in group_order {
            let req_total = required[&key];
            let planned_total = planned.get(&key).copied().unwrap_or(0);
            if planned_total < req_total {
                let first = first_req[&key];
                shortages.push(Shortage {
                    part: key.0,
                    location: key.1,
                    short_qty: req_total - planned_total,
                    need_date: first.need_date,
                    demand_trace: first.demand_trace.clone(),
                    target_serial: first.target_serial.clone(),
                });
            }
        }

        shortages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mrp_core::{OrderType, Serial};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn net(part: &str, qty: Quantity) -> NetRequirement {
        NetRequirement {
            part: PartNumber::new(part),
            quantity: qty,
            need_date: date(2025, 2, 1),
            demand_trace: format!("SO-1 -> {}", part),
            location: "FACTORY".to_string(),
            target_serial: Serial::new("SN001"),
        }
    }

    fn order(part: &str, qty: Quantity) -> PlannedOrder {
        PlannedOrder {
            id: Uuid::new_v4(),
            part: PartNumber::new(part),
            quantity: qty,
            start_date: date(2025, 1, 1),
            due_date: date(2025, 2, 1),
            demand_trace: format!("SO-1 -> {}", part),
            location: "FACTORY".to_string(),
            order_type: OrderType::Make,
            target_serial: Serial::new("SN001"),
        }
    }

    #[test]
    fn test_fully_planned_reports_nothing() {
        let shortages = ShortageDetector::detect(
            &[net("A", 10), net("A", 5)],
            &[order("A", 10), order("A", 5)],
        );
        assert!(shortages.is_empty());
    }

    #[test]
    fn test_over_planning_is_not_a_shortage() {
        // Lot sizing can plan more than required
        let shortages = ShortageDetector::detect(&[net("A", 10)], &[order("A", 50)]);
        assert!(shortages.is_empty());
    }

    #[test]
    fn test_under_planning_reported_with_first_req_metadata() {
        let mut second = net("A", 5);
        second.demand_trace = "SO-2 -> A".to_string();

        let shortages = ShortageDetector::detect(&[net("A", 10), second], &[order("A", 8)]);

        assert_eq!(shortages.len(), 1);
        assert_eq!(shortages[0].short_qty, 7);
        assert_eq!(shortages[0].demand_trace, "SO-1 -> A");
        assert_eq!(shortages[0].part.as_str(), "A");
    }

    #[test]
    fn test_unplanned_part_is_fully_short() {
        let shortages = ShortageDetector::detect(&[net("A", 10)], &[]);
        assert_eq!(shortages.len(), 1);
        assert_eq!(shortages[0].short_qty, 10);
    }
}
