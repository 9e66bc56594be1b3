//! Load-time validation. A planning run never starts on data that violates
//! the model invariants; the run itself assumes them.

use crate::models::*;
use crate::serial;
use crate::{MrpError, Result};
use std::collections::{HashMap, HashSet};

/// Validate the item master: positive scalars, ordering of order-quantity
/// bounds, lot-rule prerequisites, unique part numbers.
pub fn validate_items(items: &[Item]) -> Result<()> {
    let mut seen: HashSet<&PartNumber> = HashSet::new();

    for item in items {
        if !seen.insert(&item.part) {
            return Err(MrpError::Validation(format!(
                "duplicate part number: {}",
                item.part.as_str()
            )));
        }
        if item.lead_time_days <= 0 {
            return Err(MrpError::Validation(format!(
                "{}: lead_time_days must be positive, got {}",
                item.part.as_str(),
                item.lead_time_days
            )));
        }
        if item.min_order_qty < 0 {
            return Err(MrpError::Validation(format!(
                "{}: min_order_qty must not be negative",
                item.part.as_str()
            )));
        }
        if item.max_order_qty <= 0 {
            return Err(MrpError::Validation(format!(
                "{}: max_order_qty must be positive",
                item.part.as_str()
            )));
        }
        if item.max_order_qty < item.min_order_qty {
            return Err(MrpError::Validation(format!(
                "{}: max_order_qty {} is below min_order_qty {}",
                item.part.as_str(),
                item.max_order_qty,
                item.min_order_qty
            )));
        }
        if item.safety_stock < 0 {
            return Err(MrpError::Validation(format!(
                "{}: safety_stock must not be negative",
                item.part.as_str()
            )));
        }
        if matches!(item.lot_rule, LotSizeRule::MinimumQty | LotSizeRule::StandardPack)
            && item.min_order_qty <= 0
        {
            return Err(MrpError::Validation(format!(
                "{}: lot rule {:?} requires min_order_qty > 0",
                item.part.as_str(),
                item.lot_rule
            )));
        }
    }

    Ok(())
}

/// Validate BOM structure: per-line invariants, duplicate lines,
/// effectivity bounds and overlap, acyclicity.
pub fn validate_bom(lines: &[BomLine]) -> Result<()> {
    let mut seen: HashSet<(&PartNumber, &PartNumber, u32)> = HashSet::new();

    for line in lines {
        if line.parent == line.child {
            return Err(MrpError::Validation(format!(
                "self-referencing BOM line: {}",
                line.parent.as_str()
            )));
        }
        if line.qty_per <= 0 {
            return Err(MrpError::Validation(format!(
                "{} -> {}: qty_per must be positive, got {}",
                line.parent.as_str(),
                line.child.as_str(),
                line.qty_per
            )));
        }
        if line.find_number == 0 {
            return Err(MrpError::Validation(format!(
                "{} -> {}: find_number must be positive",
                line.parent.as_str(),
                line.child.as_str()
            )));
        }
        if let Some(to) = &line.effectivity.to {
            if line.effectivity.from.compare(to) == std::cmp::Ordering::Greater {
                return Err(MrpError::Validation(format!(
                    "{} -> {}: effectivity from {} exceeds to {}",
                    line.parent.as_str(),
                    line.child.as_str(),
                    line.effectivity.from.as_str(),
                    to.as_str()
                )));
            }
        }
        if !seen.insert((&line.parent, &line.child, line.find_number)) {
            return Err(MrpError::Validation(format!(
                "duplicate BOM line {} -> {} at find {}",
                line.parent.as_str(),
                line.child.as_str(),
                line.find_number
            )));
        }
    }

    serial::validate_non_overlapping(lines)?;
    detect_cycles(lines)?;

    Ok(())
}

/// Validate inventory records before loading them into a repository
pub fn validate_inventory(lots: &[InventoryLot], serials: &[SerializedInventory]) -> Result<()> {
    for lot in lots {
        if lot.quantity < 0 {
            return Err(MrpError::Validation(format!(
                "lot {} of {}: quantity must not be negative",
                lot.lot_number,
                lot.part.as_str()
            )));
        }
    }
    let mut seen: HashSet<(&PartNumber, &Serial)> = HashSet::new();
    for unit in serials {
        if !seen.insert((&unit.part, &unit.serial_number)) {
            return Err(MrpError::Validation(format!(
                "duplicate serialized unit {} of {}",
                unit.serial_number.as_str(),
                unit.part.as_str()
            )));
        }
    }
    Ok(())
}

/// Validate top-level demands
pub fn validate_demands(demands: &[DemandRequirement]) -> Result<()> {
    for demand in demands {
        if demand.quantity <= 0 {
            return Err(MrpError::Validation(format!(
                "demand {} for {}: quantity must be positive, got {}",
                demand.source,
                demand.part.as_str(),
                demand.quantity
            )));
        }
    }
    Ok(())
}

/// DFS with a recursion stack over the parent→child relation; any back
/// edge is a cycle, reported with its path.
fn detect_cycles(lines: &[BomLine]) -> Result<()> {
    let mut children: HashMap<&PartNumber, Vec<&PartNumber>> = HashMap::new();
    for line in lines {
        children.entry(&line.parent).or_default().push(&line.child);
    }

    let mut parents: Vec<&PartNumber> = children.keys().copied().collect();
    parents.sort();

    let mut visited: HashSet<&PartNumber> = HashSet::new();
    let mut rec_stack: HashSet<&PartNumber> = HashSet::new();
    let mut path: Vec<&PartNumber> = Vec::new();

    for parent in parents {
        if !visited.contains(parent) {
            if let Some(cycle) =
                dfs_cycle(parent, &children, &mut visited, &mut rec_stack, &mut path)
            {
                return Err(MrpError::CircularDependency(cycle));
            }
        }
    }

    Ok(())
}

fn dfs_cycle<'a>(
    node: &'a PartNumber,
    children: &HashMap<&'a PartNumber, Vec<&'a PartNumber>>,
    visited: &mut HashSet<&'a PartNumber>,
    rec_stack: &mut HashSet<&'a PartNumber>,
    path: &mut Vec<&'a PartNumber>,
) -> Option<String> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(kids) = children.get(node) {
        for &child in kids {
            if !visited.contains(child) {
                if let Some(cycle) = dfs_cycle(child, children, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(child) {
                // Back edge: extract the cycle from the current path
                let start = path.iter().position(|&p| p == child).unwrap_or(0);
                let mut cycle: Vec<&str> =
                    path[start..].iter().map(|p| p.as_str()).collect();
                cycle.push(child.as_str());
                return Some(cycle.join(" -> "));
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}
