//! Bill of quantities for steel columns.
//!
//! Takes the calculator's column lines and produces the report tables:
//! grouped columns, plate take-off for built-up sections, rolled H lines,
//! totals and the sub-material allowance.

mod grouping;
mod plates;
mod rolled;
mod totals;
mod types;

pub use grouping::{SIMILARITY_TOLERANCE, SMALL_SHARE, group_by_quantity, group_rolled_h_by_quantity};
pub use plates::{group_plates_by_quantity, plate_boq, plate_unit_weight};
pub use rolled::{ROLLED_H_COMBINATIONS, is_rolled_h, rolled_h_boq};
pub use totals::{DEFAULT_SURCHARGE_RATE, sub_material, totals};
pub use types::{
    BoqReport, BoqRequest, ColumnItem, PlateItem, RolledHGroup, SubMaterialItem,
    ThicknessMergeRules, Totals, UnitPrices,
};

use thiserror::Error;

/// kg/m³
pub const STEEL_DENSITY: f64 = 7850.0;

/// Ceiling on the summed `count` of one request, so grouped column and
/// rolled-H counts stay within `u32`. Plate counts are `u64`.
pub const MAX_TOTAL_COUNT: u32 = u32::MAX;

#[derive(Debug, Error, PartialEq)]
pub enum BoqError {
    #[error("item {index}: {field} must be a finite, non-negative number")]
    InvalidItem { index: usize, field: &'static str },
    #[error("unit price {0} must be a finite, non-negative number")]
    InvalidPrice(&'static str),
    #[error("surcharge rate must be between 0 and 1")]
    InvalidSurchargeRate,
    #[error("item {index}: count takes the request total above {max}", max = MAX_TOTAL_COUNT)]
    CountTooLarge { index: usize },
}

fn valid(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn validate(request: &BoqRequest) -> Result<(), BoqError> {
    let mut total_count: u64 = 0;
    for (index, item) in request.items.iter().enumerate() {
        total_count += u64::from(item.count);
        if total_count > u64::from(MAX_TOTAL_COUNT) {
            return Err(BoqError::CountTooLarge { index });
        }

        let fields = [
            ("h", Some(item.h)),
            ("b", Some(item.b)),
            ("tw", Some(item.tw)),
            ("tf", Some(item.tf)),
            ("area", Some(item.area)),
            ("unitWeight", Some(item.unit_weight)),
            ("length", Some(item.length)),
            ("H1", item.h1),
            ("H2", item.h2),
            ("B1", item.b1),
            ("B2", item.b2),
        ];
        if let Some((field, _)) = fields
            .into_iter()
            .find(|(_, v)| v.is_some_and(|v| !valid(v)))
        {
            return Err(BoqError::InvalidItem { index, field });
        }
    }

    let prices = &request.unit_prices;
    for (name, value) in [
        ("mainMaterialSM420", prices.main_material_sm420),
        ("mainMaterialSM355", prices.main_material_sm355),
        ("subMaterial", prices.sub_material),
    ] {
        if !valid(value) {
            return Err(BoqError::InvalidPrice(name));
        }
    }

    if let Some(rate) = request.surcharge_rate
        && !(valid(rate) && rate <= 1.0)
    {
        return Err(BoqError::InvalidSurchargeRate);
    }
    Ok(())
}

/// Build the full report for one calculator submission.
pub fn report(request: BoqRequest) -> Result<BoqReport, BoqError> {
    validate(&request)?;

    let rules = &request.thickness_merge_rules;
    let totals = totals(&request.items, &request.unit_prices);
    let plates = group_plates_by_quantity(plate_boq(&request.items, rules), rules);
    let rolled_h = group_rolled_h_by_quantity(rolled_h_boq(&request.items));
    let sub_material = sub_material(
        totals.total_weight,
        &request.unit_prices,
        request.surcharge_rate.unwrap_or(DEFAULT_SURCHARGE_RATE),
    );
    let columns = group_by_quantity(request.items);

    Ok(BoqReport {
        columns,
        plates,
        rolled_h,
        totals,
        sub_material,
    })
}
