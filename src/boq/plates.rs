//! Plate take-off for built-up sections.

use super::grouping::{cluster, split_small, within_tolerance};
use super::rolled::is_rolled_h;
use super::types::{ColumnItem, PlateItem, ThicknessMergeRules};
use super::STEEL_DENSITY;

const DEFAULT_GRADE: &str = "SM420";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    H1,
    H2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlateKind {
    Web,
    Flange,
}

#[derive(Debug)]
struct PlateLine {
    section: Section,
    kind: PlateKind,
    thickness: f64,
    width: f64,
    total_length: f64,
    total_count: u64,
    steel_grade: String,
}

impl PlateLine {
    fn usage(&self) -> String {
        let section = match self.section {
            Section::H1 => "H1",
            Section::H2 => "H2",
        };
        let kind = match self.kind {
            PlateKind::Web => "Web",
            PlateKind::Flange => "Flange",
        };
        format!("{section} {kind}")
    }

    /// kg/m
    fn unit_weight(&self) -> f64 {
        plate_unit_weight(self.width, self.thickness)
    }

    fn total_weight(&self) -> f64 {
        self.unit_weight() * self.total_length
    }
}

/// Weight per metre of a plate `width_mm` wide and `thickness_mm` thick.
pub fn plate_unit_weight(width_mm: f64, thickness_mm: f64) -> f64 {
    width_mm * thickness_mm * STEEL_DENSITY / 1_000_000.0
}

fn non_zero_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| *v != 0.0).unwrap_or(fallback)
}

/// Add `length`/`count` to the line for (section, kind, thickness), creating
/// it with `width` on first use. Width is fixed by the first contributor.
#[allow(clippy::too_many_arguments)]
fn accumulate(
    lines: &mut Vec<PlateLine>,
    section: Section,
    kind: PlateKind,
    thickness: f64,
    width: f64,
    length: f64,
    count: u64,
    steel_grade: &str,
) {
    let index = match lines
        .iter()
        .position(|l| l.section == section && l.kind == kind && l.thickness == thickness)
    {
        Some(index) => index,
        None => {
            lines.push(PlateLine {
                section,
                kind,
                thickness,
                width,
                total_length: 0.0,
                total_count: 0,
                steel_grade: steel_grade.to_string(),
            });
            lines.len() - 1
        }
    };
    lines[index].total_length += length;
    lines[index].total_count += count;
}

/// Break built-up columns into web and flange plates and aggregate by
/// thickness, thinnest first.
///
/// Each column contributes one web and two flange plates per axis (H1, H2).
/// Web width is the section depth less both flanges. Merge rules substitute
/// thicknesses before aggregation.
pub fn plate_boq(items: &[ColumnItem], merge_rules: &ThicknessMergeRules) -> Vec<PlateItem> {
    let mut lines: Vec<PlateLine> = Vec::new();

    for item in items.iter().filter(|i| !is_rolled_h(&i.combination)) {
        let h1 = non_zero_or(item.h1, item.h);
        let h2 = non_zero_or(item.h2, item.h);
        let b1 = non_zero_or(item.b1, item.b);
        let b2 = non_zero_or(item.b2, item.b);
        let tw = merge_rules.apply(item.tw);
        let tf = merge_rules.apply(item.tf);

        let run = item.length * f64::from(item.count);
        let count = u64::from(item.count);
        let grade = item.steel_grade.as_str();
        for (section, depth, flange_width) in [(Section::H1, h1, b1), (Section::H2, h2, b2)] {
            accumulate(&mut lines, section, PlateKind::Web, tw, depth - 2.0 * tf, run, count, grade);
            accumulate(
                &mut lines,
                section,
                PlateKind::Flange,
                tf,
                flange_width,
                run * 2.0,
                count * 2,
                grade,
            );
        }
    }

    let mut thicknesses: Vec<f64> = lines.iter().map(|l| l.thickness).collect();
    thicknesses.sort_by(f64::total_cmp);
    thicknesses.dedup();

    thicknesses
        .into_iter()
        .map(|thickness| {
            let plates: Vec<&PlateLine> = lines.iter().filter(|l| l.thickness == thickness).collect();
            let usage_parts = plates.iter().map(|p| p.usage()).collect::<Vec<_>>().join(", ");
            let avg_width = plates.iter().map(|p| p.width).sum::<f64>() / plates.len() as f64;
            let total_length: f64 = plates.iter().map(|p| p.total_length).sum();
            let total_count: u64 = plates.iter().map(|p| p.total_count).sum();
            let total_weight: f64 = plates.iter().map(|p| p.total_weight()).sum();
            let unit_weight = if total_length > 0.0 {
                total_weight / total_length
            } else {
                0.0
            };
            let steel_grade = plates
                .first()
                .map_or(DEFAULT_GRADE, |p| p.steel_grade.as_str())
                .to_string();

            PlateItem {
                thickness_mm: thickness,
                avg_width,
                unit_weight,
                total_length,
                total_count,
                total_weight,
                usage_parts,
                steel_grade,
                merge_info: None,
                thickness: Some(thickness),
            }
        })
        .collect()
}

fn merge_usage(into: &mut String, other: &str) {
    let mut parts: Vec<&str> = into.split(", ").collect();
    for part in other.split(", ") {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    *into = parts.join(", ");
}

/// Group plates by total weight. A small plate joins a group when its
/// (merge-rule adjusted) thickness equals the group's, or when thickness
/// and average width are both within 15%.
///
/// Grouped rows carry a `merge_info` summary of the weight per original
/// thickness.
pub fn group_plates_by_quantity(
    plates: Vec<PlateItem>,
    merge_rules: &ThicknessMergeRules,
) -> Vec<PlateItem> {
    if plates.is_empty() {
        return plates;
    }

    let (mut large, small) = split_small(plates, |p| p.total_weight);
    let (groupable, ungroupable): (Vec<_>, Vec<_>) = small
        .into_iter()
        .partition(|p| p.thickness_mm != 0.0 && p.avg_width != 0.0);
    large.extend(ungroupable);

    let clusters = cluster(groupable, |plate, head| {
        let adjusted = merge_rules.apply(plate.thickness_mm);
        adjusted == head.thickness_mm
            || (within_tolerance(adjusted, head.thickness_mm)
                && within_tolerance(plate.avg_width, head.avg_width))
    });

    let mut grouped: Vec<PlateItem> = clusters
        .into_iter()
        .filter_map(|members| {
            let total_weight: f64 = members.iter().map(|m| m.total_weight).sum();
            let total_count: u64 = members.iter().map(|m| m.total_count).sum();
            let total_length: f64 = members.iter().map(|m| m.total_length).sum();

            let mut by_thickness: Vec<(f64, f64)> = Vec::new();
            for member in &members {
                match by_thickness.iter_mut().find(|(t, _)| *t == member.thickness_mm) {
                    Some((_, weight)) => *weight += member.total_weight,
                    None => by_thickness.push((member.thickness_mm, member.total_weight)),
                }
            }
            by_thickness.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut members = members.into_iter();
            let mut rep = members.next()?;
            for member in members {
                merge_usage(&mut rep.usage_parts, &member.usage_parts);
            }

            let breakdown = by_thickness
                .iter()
                .map(|(t, w)| format!("{t}mm: {w:.2}kg"))
                .collect::<Vec<_>>()
                .join(", ");
            rep.merge_info = Some(format!(
                "{breakdown} → {}mm: {total_weight:.2}kg",
                rep.thickness_mm
            ));
            if total_length > 0.0 {
                rep.unit_weight = total_weight / total_length;
            }
            rep.total_weight = total_weight;
            rep.total_count = total_count;
            rep.total_length = total_length;
            Some(rep)
        })
        .collect();
    grouped.sort_by(|a, b| b.total_weight.total_cmp(&a.total_weight));

    large.extend(grouped);
    large
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built_up(name: &str, tw: f64, tf: f64, length: f64, count: u32) -> ColumnItem {
        ColumnItem {
            names: vec![name.into()],
            combination: "BH".into(),
            h: 600.0,
            b: 400.0,
            tw,
            tf,
            area: 0.03,
            unit_weight: 200.0,
            length,
            length_type: None,
            count,
            steel_grade: "SM355".into(),
            h1: None,
            h2: Some(500.0),
            b1: None,
            b2: Some(300.0),
            quantity: None,
            is_grouped: false,
            original_names: None,
            original_count: None,
        }
    }

    fn plate(thickness: f64, width: f64, weight: f64, usage: &str) -> PlateItem {
        PlateItem {
            thickness_mm: thickness,
            avg_width: width,
            unit_weight: plate_unit_weight(width, thickness),
            total_length: weight / plate_unit_weight(width, thickness),
            total_count: 1,
            total_weight: weight,
            usage_parts: usage.into(),
            steel_grade: "SM420".into(),
            merge_info: None,
            thickness: Some(thickness),
        }
    }

    #[test]
    fn unit_weight_uses_steel_density() {
        assert!((plate_unit_weight(1000.0, 10.0) - 78.5).abs() < 1e-9);
    }

    #[test]
    fn single_column_yields_web_and_flange_plates() {
        let plates = plate_boq(&[built_up("C1", 12.0, 20.0, 5.0, 2)], &ThicknessMergeRules::default());
        assert_eq!(plates.len(), 2);

        let web = &plates[0];
        assert_eq!(web.thickness_mm, 12.0);
        assert_eq!(web.usage_parts, "H1 Web, H2 Web");
        // H1 web 600-40=560, H2 web 500-40=460
        assert!((web.avg_width - 510.0).abs() < 1e-9);
        assert_eq!(web.total_count, 4);
        assert!((web.total_length - 20.0).abs() < 1e-9);
        let expected_web = (plate_unit_weight(560.0, 12.0) + plate_unit_weight(460.0, 12.0)) * 10.0;
        assert!((web.total_weight - expected_web).abs() < 1e-9);
        assert!((web.unit_weight - expected_web / 20.0).abs() < 1e-9);
        assert_eq!(web.steel_grade, "SM355");

        let flange = &plates[1];
        assert_eq!(flange.thickness_mm, 20.0);
        assert_eq!(flange.usage_parts, "H1 Flange, H2 Flange");
        assert_eq!(flange.total_count, 8);
        assert!((flange.total_length - 40.0).abs() < 1e-9);
    }

    #[test]
    fn merge_rules_substitute_thickness() {
        let rules: ThicknessMergeRules = [(12, 14.0)].into_iter().collect();
        let plates = plate_boq(
            &[built_up("C1", 12.0, 20.0, 5.0, 1), built_up("C2", 14.0, 20.0, 5.0, 1)],
            &rules,
        );
        let thicknesses: Vec<f64> = plates.iter().map(|p| p.thickness_mm).collect();
        assert_eq!(thicknesses, vec![14.0, 20.0]);
        assert_eq!(plates[0].total_count, 4);
    }

    #[test]
    fn rolled_sections_are_excluded() {
        let mut rolled = built_up("R1", 8.0, 13.0, 4.0, 1);
        rolled.combination = "H400×B200".into();
        assert!(plate_boq(&[rolled], &ThicknessMergeRules::default()).is_empty());
    }

    #[test]
    fn small_plates_group_with_merge_info() {
        let grouped = group_plates_by_quantity(
            vec![
                plate(20.0, 400.0, 10_000.0, "H1 Flange"),
                plate(9.0, 500.0, 100.0, "H1 Web"),
                plate(10.0, 520.0, 50.0, "H2 Web, H1 Web"),
                plate(40.0, 400.0, 60.0, "H2 Flange"),
            ],
            &ThicknessMergeRules::default(),
        );
        assert_eq!(grouped.len(), 3);
        assert!(grouped[0].merge_info.is_none());

        let merged = &grouped[1];
        assert_eq!(merged.thickness_mm, 9.0);
        assert_eq!(merged.usage_parts, "H1 Web, H2 Web");
        assert!((merged.total_weight - 150.0).abs() < 1e-9);
        assert_eq!(merged.total_count, 2);
        assert_eq!(
            merged.merge_info.as_deref(),
            Some("9mm: 100.00kg, 10mm: 50.00kg → 9mm: 150.00kg")
        );

        assert_eq!(grouped[2].thickness_mm, 40.0);
        assert_eq!(grouped[2].merge_info.as_deref(), Some("40mm: 60.00kg → 40mm: 60.00kg"));
    }
}
