//! Effectivity serial ordering.
//!
//! Serials like `AS502` or `SN001` sort by (prefix, unit number), so `AS99`
//! precedes `AS502`. Strings that do not fit the prefix+number shape fall
//! back to plain lexicographic order.

use crate::models::{BomLine, Serial, SerialEffectivity};
use crate::{MrpError, Result};
use std::cmp::Ordering;

/// Split a serial into its non-digit prefix and trailing unit number.
/// Returns `None` when the string has no prefix, no trailing number, or a
/// digit inside the prefix.
pub fn parse(s: &str) -> Option<(&str, u64)> {
    let digits_at = s.find(|c: char| c.is_ascii_digit())?;
    if digits_at == 0 {
        return None;
    }

    let (prefix, digits) = s.split_at(digits_at);
    if digits.chars().any(|c| !c.is_ascii_digit()) {
        return None;
    }

    let number = digits.parse::<u64>().ok()?;
    Some((prefix, number))
}

/// Compare two serial strings: prefix lexicographic, then unit number.
/// Either side failing to parse degrades the comparison to plain
/// lexicographic order over the full strings.
pub fn compare(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    match (parse(a), parse(b)) {
        (Some((prefix_a, num_a)), Some((prefix_b, num_b))) => {
            prefix_a.cmp(prefix_b).then(num_a.cmp(&num_b))
        }
        _ => a.cmp(b),
    }
}

impl Serial {
    /// Effectivity ordering per [`compare`]
    pub fn compare(&self, other: &Serial) -> Ordering {
        compare(self.as_str(), other.as_str())
    }
}

// Ord must stay consistent with the derived Eq, so distinct spellings of the
// same unit number ("SN1" vs "SN001") get a final raw-string tiebreak.
impl Ord for Serial {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Serial {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl SerialEffectivity {
    /// Is `serial` inside this range? The upper bound is inclusive; an
    /// absent `to` is unbounded above.
    pub fn contains(&self, serial: &Serial) -> bool {
        if serial.compare(&self.from) == Ordering::Less {
            return false;
        }
        match &self.to {
            Some(to) => serial.compare(to) != Ordering::Greater,
            None => true,
        }
    }

    /// Do two ranges share any serial? Open-ended `to` is treated as +∞.
    pub fn overlaps(&self, other: &SerialEffectivity) -> bool {
        let starts_before_other_ends = match &other.to {
            Some(to) => self.from.compare(to) != Ordering::Greater,
            None => true,
        };
        let other_starts_before_self_ends = match &self.to {
            Some(to) => other.from.compare(to) != Ordering::Greater,
            None => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

fn describe(effectivity: &SerialEffectivity) -> String {
    match &effectivity.to {
        Some(to) => format!("{}..{}", effectivity.from.as_str(), to.as_str()),
        None => format!("{}..", effectivity.from.as_str()),
    }
}

/// Reject BOM data where two lines for the same `(parent, child)` have
/// overlapping effectivity ranges.
pub fn validate_non_overlapping(lines: &[BomLine]) -> Result<()> {
    use std::collections::HashMap;

    let mut by_pair: HashMap<(&str, &str), Vec<&BomLine>> = HashMap::new();
    for line in lines {
        by_pair
            .entry((line.parent.as_str(), line.child.as_str()))
            .or_default()
            .push(line);
    }

    for ((parent, child), group) in by_pair {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                if a.effectivity.overlaps(&b.effectivity) {
                    return Err(MrpError::EffectivityOverlap {
                        parent: parent.to_string(),
                        child: child.to_string(),
                        first: describe(&a.effectivity),
                        second: describe(&b.effectivity),
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartNumber;
    use proptest::prelude::*;

    fn serial(s: &str) -> Serial {
        Serial::new(s)
    }

    fn line(parent: &str, child: &str, find: u32, from: &str, to: Option<&str>) -> BomLine {
        BomLine {
            parent: PartNumber::new(parent),
            child: PartNumber::new(child),
            qty_per: 1,
            find_number: find,
            effectivity: SerialEffectivity::new(serial(from), to.map(serial)),
            priority: 0,
        }
    }

    #[test]
    fn test_parse_well_formed() {
        assert_eq!(parse("AS502"), Some(("AS", 502)));
        assert_eq!(parse("SN001"), Some(("SN", 1)));
        assert_eq!(parse("B7"), Some(("B", 7)));
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(parse("502"), None); // no prefix
        assert_eq!(parse("AS"), None); // no number
        assert_eq!(parse("A1B2"), None); // digit inside prefix
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_numeric_ordering_beats_lexicographic() {
        // Lexicographically "AS99" > "AS502"; numerically it is smaller
        assert_eq!(compare("AS99", "AS502"), Ordering::Less);
        assert_eq!(compare("AS503", "AS502"), Ordering::Greater);
        assert_eq!(compare("AS502", "AS502"), Ordering::Equal);
    }

    #[test]
    fn test_prefix_ordering() {
        assert_eq!(compare("AS999", "SN001"), Ordering::Less);
        assert_eq!(compare("SN5", "AS999"), Ordering::Greater);
    }

    #[test]
    fn test_malformed_falls_back_to_lexicographic() {
        assert_eq!(compare("123", "AS1"), Ordering::Less);
        assert_eq!(compare("ZZZ", "AS1"), Ordering::Greater);
    }

    #[test]
    fn test_effectivity_contains() {
        let range = SerialEffectivity::new(serial("AS501"), Some(serial("AS505")));
        assert!(!range.contains(&serial("AS500")));
        assert!(range.contains(&serial("AS501")));
        assert!(range.contains(&serial("AS503")));
        assert!(range.contains(&serial("AS505")));
        assert!(!range.contains(&serial("AS506")));
    }

    #[test]
    fn test_open_ended_contains() {
        let range = SerialEffectivity::open_ended(serial("AS506"));
        assert!(!range.contains(&serial("AS505")));
        assert!(range.contains(&serial("AS506")));
        assert!(range.contains(&serial("AS9999")));
    }

    #[test]
    fn test_overlap_detection() {
        let a = SerialEffectivity::new(serial("AS501"), Some(serial("AS505")));
        let b = SerialEffectivity::new(serial("AS505"), Some(serial("AS510")));
        let c = SerialEffectivity::new(serial("AS506"), None);

        assert!(a.overlaps(&b)); // shared endpoint
        assert!(!a.overlaps(&c));
        assert!(b.overlaps(&c)); // open-ended upper bound
    }

    #[test]
    fn test_validate_non_overlapping() {
        // Adjacent ranges for the same pair are fine
        let ok = vec![
            line("E", "V1", 300, "AS501", Some("AS505")),
            line("E", "V2", 300, "AS506", None),
        ];
        assert!(validate_non_overlapping(&ok).is_ok());

        // Same (parent, child) with overlapping ranges must fail
        let bad = vec![
            line("E", "V1", 300, "AS501", Some("AS505")),
            line("E", "V1", 310, "AS503", None),
        ];
        assert!(matches!(
            validate_non_overlapping(&bad),
            Err(MrpError::EffectivityOverlap { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_compare_is_antisymmetric(a in "[A-Z]{1,3}[0-9]{1,5}", b in "[A-Z]{1,3}[0-9]{1,5}") {
            let forward = compare(&a, &b);
            let backward = compare(&b, &a);
            prop_assert_eq!(forward, backward.reverse());
        }

        #[test]
        fn prop_serial_ord_total(a in "[A-Z]{1,3}[0-9]{1,5}", b in "[A-Z]{1,3}[0-9]{1,5}") {
            let sa = Serial::new(a.clone());
            let sb = Serial::new(b.clone());
            // Ord agrees with Eq: Equal iff identical strings
            prop_assert_eq!(sa.cmp(&sb) == Ordering::Equal, a == b);
        }

        #[test]
        fn prop_parse_round_trip(prefix in "[A-Z]{1,4}", num in 0u64..100_000) {
            let s = format!("{}{}", prefix, num);
            let (p, n) = parse(&s).unwrap();
            prop_assert_eq!(p, prefix);
            prop_assert_eq!(n, num);
        }
    }
}
