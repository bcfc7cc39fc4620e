//! Rolled H (mill section) lines.

use super::types::{ColumnItem, RolledHGroup};

/// Combinations supplied as rolled sections rather than built up from plate.
pub const ROLLED_H_COMBINATIONS: &[&str] = &[
    "H400×B200",
    "H450×B200",
    "H500×B200",
    "H506×B201",
    "H482×B300",
    "H488×B300",
    "H582×B300",
    "H588×B300",
    "H600×B200",
];

pub fn is_rolled_h(combination: &str) -> bool {
    ROLLED_H_COMBINATIONS.contains(&combination)
}

/// Collect rolled H items by combination and length (to 0.01 m), in first
/// appearance order.
pub fn rolled_h_boq(items: &[ColumnItem]) -> Vec<RolledHGroup> {
    let mut groups: Vec<(String, RolledHGroup)> = Vec::new();

    for item in items.iter().filter(|i| is_rolled_h(&i.combination)) {
        let key = format!("{}-{:.2}", item.combination, item.length);
        let index = match groups.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                groups.push((
                    key,
                    RolledHGroup {
                        combination: item.combination.clone(),
                        length: item.length,
                        count: 0,
                        unit_weight: item.unit_weight,
                        total_weight: 0.0,
                        names: Vec::new(),
                        steel_grade: item.steel_grade.clone(),
                        is_grouped: false,
                        original_names: None,
                        original_count: None,
                    },
                ));
                groups.len() - 1
            }
        };
        let group = &mut groups[index].1;
        group.count += item.count;
        group.total_weight += item.weight();
        group.names.extend(item.names.iter().cloned());
    }

    groups.into_iter().map(|(_, g)| g).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, combination: &str, length: f64, count: u32) -> ColumnItem {
        ColumnItem {
            names: vec![name.into()],
            combination: combination.into(),
            h: 400.0,
            b: 200.0,
            tw: 8.0,
            tf: 13.0,
            area: 0.0084,
            unit_weight: 66.0,
            length,
            length_type: None,
            count,
            steel_grade: "SM355".into(),
            h1: None,
            h2: None,
            b1: None,
            b2: None,
            quantity: None,
            is_grouped: false,
            original_names: None,
            original_count: None,
        }
    }

    #[test]
    fn only_rolled_combinations_are_collected() {
        assert!(is_rolled_h("H588×B300"));
        assert!(!is_rolled_h("BH600×300"));

        let groups = rolled_h_boq(&[
            item("C1", "H400×B200", 4.0, 2),
            item("C2", "BH600×300", 4.0, 1),
            item("C3", "H400×B200", 4.001, 1),
            item("C4", "H400×B200", 5.0, 1),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].names, vec!["C1", "C3"]);
        assert_eq!(groups[0].count, 3);
        assert!((groups[0].total_weight - (66.0 * 4.0 * 2.0 + 66.0 * 4.001)).abs() < 1e-9);
        assert_eq!(groups[1].names, vec!["C4"]);
    }
}
