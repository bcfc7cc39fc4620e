//! Small-quantity grouping.
//!
//! Lines below [`SMALL_SHARE`] of the total weight are folded into groups of
//! similar lines; everything else is reported as is. Used for column items,
//! rolled H groups and plates, each with its own similarity rule.

use super::types::{ColumnItem, RolledHGroup};

pub const SMALL_SHARE: f64 = 0.05;
pub const SIMILARITY_TOLERANCE: f64 = 0.15;

pub(crate) fn relative_diff(value: f64, reference: f64) -> f64 {
    (value - reference).abs() / reference
}

pub(crate) fn within_tolerance(value: f64, reference: f64) -> bool {
    relative_diff(value, reference) <= SIMILARITY_TOLERANCE
}

/// Sort by weight descending, then split into (large, small).
pub(crate) fn split_small<T>(mut items: Vec<T>, weight: impl Fn(&T) -> f64) -> (Vec<T>, Vec<T>) {
    items.sort_by(|a, b| weight(b).total_cmp(&weight(a)));
    let total: f64 = items.iter().map(&weight).sum();
    let threshold = total * SMALL_SHARE;
    items.into_iter().partition(|item| weight(item) >= threshold)
}

/// Greedy clustering: each item joins the first group whose first member
/// it is similar to, or starts a new group.
pub(crate) fn cluster<T>(items: Vec<T>, similar: impl Fn(&T, &T) -> bool) -> Vec<Vec<T>> {
    let mut groups: Vec<Vec<T>> = Vec::new();
    for item in items {
        match groups.iter().position(|g| similar(&item, &g[0])) {
            Some(i) => groups[i].push(item),
            None => groups.push(vec![item]),
        }
    }
    groups
}

pub(crate) fn summary_names(names: &[String]) -> Vec<String> {
    match names {
        [first, _, ..] => vec![format!("{first} and {} more", names.len() - 1)],
        _ => names.to_vec(),
    }
}

fn sort_by_weight_desc<T>(items: &mut [T], weight: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| weight(b).total_cmp(&weight(a)));
}

fn has_section_dims(item: &ColumnItem) -> bool {
    item.h != 0.0 && item.b != 0.0 && item.tw != 0.0 && item.tf != 0.0
}

/// Group column items by quantity (unit weight × length × count).
///
/// Small items are similar when h, b, tw and tf are each within 15% of the
/// group's first item and combination and steel grade match. Small items
/// missing a dimension stay ungrouped.
pub fn group_by_quantity(items: Vec<ColumnItem>) -> Vec<ColumnItem> {
    if items.is_empty() {
        return items;
    }

    let items: Vec<ColumnItem> = items
        .into_iter()
        .map(|mut item| {
            item.quantity = Some(item.weight());
            item
        })
        .collect();
    let quantity = |item: &ColumnItem| item.quantity.unwrap_or(0.0);

    let (mut large, small) = split_small(items, quantity);
    let (groupable, ungroupable): (Vec<_>, Vec<_>) = small.into_iter().partition(has_section_dims);
    large.extend(ungroupable);

    let groups = cluster(groupable, |item, head| {
        within_tolerance(item.h, head.h)
            && within_tolerance(item.b, head.b)
            && within_tolerance(item.tw, head.tw)
            && within_tolerance(item.tf, head.tf)
            && item.combination == head.combination
            && item.steel_grade == head.steel_grade
    });

    let mut grouped: Vec<ColumnItem> = groups
        .into_iter()
        .filter_map(|members| {
            let total_quantity: f64 = members.iter().map(quantity).sum();
            let total_count: u32 = members.iter().map(|m| m.count).sum();
            let total_length: f64 = members.iter().map(|m| m.length * f64::from(m.count)).sum();
            let names: Vec<String> = members.iter().flat_map(|m| m.names.clone()).collect();
            let member_count = members.len();

            let mut rep = members.into_iter().next()?;
            let avg_length = if total_count > 0 {
                total_length / f64::from(total_count)
            } else {
                rep.length
            };
            rep.names = summary_names(&names);
            rep.quantity = Some(total_quantity);
            rep.count = total_count;
            rep.length = avg_length;
            rep.is_grouped = true;
            rep.original_names = Some(names);
            rep.original_count = Some(member_count);
            Some(rep)
        })
        .collect();
    sort_by_weight_desc(&mut grouped, quantity);

    large.extend(grouped);
    large
}

/// Group rolled H lines by total weight. Small lines are similar when the
/// combination matches and the length is within 15%.
pub fn group_rolled_h_by_quantity(groups: Vec<RolledHGroup>) -> Vec<RolledHGroup> {
    if groups.is_empty() {
        return groups;
    }

    let (mut large, small) = split_small(groups, |g| g.total_weight);
    let (groupable, ungroupable): (Vec<_>, Vec<_>) = small
        .into_iter()
        .partition(|g| !g.combination.is_empty() && g.length != 0.0);
    large.extend(ungroupable);

    let clusters = cluster(groupable, |group, head| {
        group.combination == head.combination && within_tolerance(group.length, head.length)
    });

    let mut grouped: Vec<RolledHGroup> = clusters
        .into_iter()
        .filter_map(|members| {
            let total_weight: f64 = members.iter().map(|m| m.total_weight).sum();
            let total_count: u32 = members.iter().map(|m| m.count).sum();
            let mut names: Vec<String> = Vec::new();
            for name in members.iter().flat_map(|m| m.names.iter()) {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            let member_count = members.len();

            let mut rep = members.into_iter().next()?;
            rep.names = summary_names(&names);
            rep.total_weight = total_weight;
            rep.count = total_count;
            rep.is_grouped = true;
            rep.original_names = Some(names);
            rep.original_count = Some(member_count);
            Some(rep)
        })
        .collect();
    sort_by_weight_desc(&mut grouped, |g| g.total_weight);

    large.extend(grouped);
    large
}
