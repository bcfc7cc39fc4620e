//! Totals and sub-material allowance.

use super::types::{ColumnItem, SubMaterialItem, Totals, UnitPrices};

/// Default connection-plate allowance, as a share of main steel weight.
pub const DEFAULT_SURCHARGE_RATE: f64 = 0.15;

fn price_per_ton(steel_grade: &str, prices: &UnitPrices) -> f64 {
    if steel_grade.contains("SM355") {
        prices.main_material_sm355
    } else {
        prices.main_material_sm420
    }
}

/// Count, area, weight (kg) and main-material amount over all items.
/// Grades containing `SM355` use the SM355 price; everything else SM420.
pub fn totals(items: &[ColumnItem], prices: &UnitPrices) -> Totals {
    items.iter().fold(Totals::default(), |mut acc, item| {
        let weight = item.weight();
        acc.total_count += u64::from(item.count);
        acc.total_area += item.area * f64::from(item.count);
        acc.total_weight += weight;
        acc.total_column_amount += weight / 1000.0 * price_per_ton(&item.steel_grade, prices);
        acc
    })
}

/// Connection plates, estimated as `rate` of the main steel weight.
pub fn sub_material(total_weight: f64, prices: &UnitPrices, rate: f64) -> Vec<SubMaterialItem> {
    let surcharge = total_weight * rate;
    vec![SubMaterialItem {
        kind: "3 PLATE".into(),
        spec: "Connection".into(),
        unit: "Ton".into(),
        quantity: None,
        steel_grade: "SM355/SM420".into(),
        main_material_weight: total_weight,
        surcharge,
        unit_price: prices.sub_material,
        amount: surcharge / 1000.0 * prices.sub_material,
        remark: format!("{}% of total steel weight", (rate * 100.0).round()),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICES: UnitPrices = UnitPrices {
        main_material_sm420: 1_200_000.0,
        main_material_sm355: 1_100_000.0,
        sub_material: 1_500_000.0,
    };

    fn item(grade: &str, unit_weight: f64, length: f64, count: u32) -> ColumnItem {
        ColumnItem {
            names: vec!["C".into()],
            combination: "BH".into(),
            h: 500.0,
            b: 400.0,
            tw: 12.0,
            tf: 20.0,
            area: 0.5,
            unit_weight,
            length,
            length_type: None,
            count,
            steel_grade: grade.into(),
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
    fn totals_price_by_grade() {
        let t = totals(
            &[item("SM355B", 100.0, 5.0, 2), item("SM420", 200.0, 5.0, 1), item("SS275", 100.0, 10.0, 1)],
            &PRICES,
        );
        assert_eq!(t.total_count, 4);
        assert!((t.total_area - 2.0).abs() < 1e-9);
        assert!((t.total_weight - 3000.0).abs() < 1e-9);
        // 1t SM355 + 1t SM420 + 1t fallback SM420
        assert!((t.total_column_amount - 3_500_000.0).abs() < 1e-6);
    }

    #[test]
    fn sub_material_is_share_of_weight() {
        let lines = sub_material(10_000.0, &PRICES, DEFAULT_SURCHARGE_RATE);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.kind, "3 PLATE");
        assert!((line.surcharge - 1500.0).abs() < 1e-9);
        assert!((line.amount - 2_250_000.0).abs() < 1e-6);
        assert_eq!(line.remark, "15% of total steel weight");
    }
}
