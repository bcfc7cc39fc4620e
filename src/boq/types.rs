//! BOQ wire types. JSON field names follow the calculator front end.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One column section line from the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnItem {
    pub names: Vec<String>,
    pub combination: String,
    pub h: f64,
    pub b: f64,
    pub tw: f64,
    pub tf: f64,
    pub area: f64,
    /// kg/m
    pub unit_weight: f64,
    /// Length of one column, m.
    pub length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_type: Option<String>,
    pub count: u32,
    pub steel_grade: String,

    #[serde(rename = "H1", default, skip_serializing_if = "Option::is_none")]
    pub h1: Option<f64>,
    #[serde(rename = "H2", default, skip_serializing_if = "Option::is_none")]
    pub h2: Option<f64>,
    #[serde(rename = "B1", default, skip_serializing_if = "Option::is_none")]
    pub b1: Option<f64>,
    #[serde(rename = "B2", default, skip_serializing_if = "Option::is_none")]
    pub b2: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_grouped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_count: Option<usize>,
}

impl ColumnItem {
    /// unit weight × length × count, kg.
    pub fn weight(&self) -> f64 {
        self.unit_weight * self.length * f64::from(self.count)
    }
}

/// Plate tonnage aggregated by thickness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateItem {
    #[serde(rename = "thickness_mm")]
    pub thickness_mm: f64,
    pub avg_width: f64,
    pub unit_weight: f64,
    pub total_length: f64,
    pub total_count: u64,
    pub total_weight: f64,
    pub usage_parts: String,
    pub steel_grade: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
}

/// Rolled H sections of one combination and length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolledHGroup {
    pub combination: String,
    pub length: f64,
    pub count: u32,
    pub unit_weight: f64,
    pub total_weight: f64,
    pub names: Vec<String>,
    pub steel_grade: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_grouped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_count: Option<usize>,
}

/// Price per ton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitPrices {
    #[serde(rename = "mainMaterialSM420")]
    pub main_material_sm420: f64,
    #[serde(rename = "mainMaterialSM355")]
    pub main_material_sm355: f64,
    #[serde(rename = "subMaterial")]
    pub sub_material: f64,
}

/// Plate thickness substitutions, mm → mm. A zero target means no rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThicknessMergeRules(pub BTreeMap<u32, f64>);

impl ThicknessMergeRules {
    /// Thickness after applying the rule for `thickness`, if any.
    pub fn apply(&self, thickness: f64) -> f64 {
        if thickness <= 0.0 || thickness.fract() != 0.0 || thickness > f64::from(u32::MAX) {
            return thickness;
        }
        self.0
            .get(&(thickness as u32))
            .copied()
            .filter(|target| *target != 0.0)
            .unwrap_or(thickness)
    }
}

impl FromIterator<(u32, f64)> for ThicknessMergeRules {
    fn from_iter<I: IntoIterator<Item = (u32, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_count: u64,
    pub total_area: f64,
    pub total_weight: f64,
    pub total_column_amount: f64,
}

/// Connection-plate allowance line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMaterialItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub spec: String,
    pub unit: String,
    pub quantity: Option<f64>,
    pub steel_grade: String,
    pub main_material_weight: f64,
    pub surcharge: f64,
    pub unit_price: f64,
    pub amount: f64,
    pub remark: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqRequest {
    pub items: Vec<ColumnItem>,
    pub unit_prices: UnitPrices,
    #[serde(default)]
    pub thickness_merge_rules: ThicknessMergeRules,
    #[serde(default)]
    pub surcharge_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoqReport {
    pub columns: Vec<ColumnItem>,
    pub plates: Vec<PlateItem>,
    pub rolled_h: Vec<RolledHGroup>,
    pub totals: Totals,
    pub sub_material: Vec<SubMaterialItem>,
}
