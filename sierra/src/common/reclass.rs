//! LCC reclassification of LPA reference items and their bib records.
//!
//! Call numbers are compared by their normalized form throughout.  The
//! original strings are only retained for output.
use crate::common::callnumber::{self, is_call_number_field, is_lpa_ref_location};
use crate::record::Item;
use crate::result::{SierraError, SierraResult};
use crate::varfield::VarField;
use chrono::{Local, NaiveDate};
use std::collections::BTreeSet;

/// Normalized call numbers of every item matching `filter`.
fn item_call_numbers<F>(items: &[Item], filter: F) -> BTreeSet<String>
where
    F: Fn(&Item) -> bool,
{
    items
        .iter()
        .filter(|i| filter(*i))
        .flat_map(|i| callnumber::call_numbers(i.var_fields()))
        .collect()
}

/// Call numbers held by LPA reference items.
pub fn reference_call_numbers(items: &[Item]) -> BTreeSet<String> {
    item_call_numbers(items, is_lpa_ref_location)
}

/// Call numbers held by items in any other location.
pub fn other_location_call_numbers(items: &[Item]) -> BTreeSet<String> {
    item_call_numbers(items, |i| !is_lpa_ref_location(i))
}

/// Reference call numbers which no other-location item shares.
///
/// These may be removed from the bib without losing a call number
/// still in active use elsewhere.
pub fn safe_to_delete_call_numbers(items: &[Item]) -> BTreeSet<String> {
    let other = other_location_call_numbers(items);
    log::debug!("Other location call numbers: {other:?}");

    let reference = reference_call_numbers(items);
    log::debug!("Reference call numbers: {reference:?}");

    reference.difference(&other).cloned().collect()
}

/// True if the item should receive the new call number on this run.
pub fn item_needs_reclass(item: &Item) -> bool {
    is_lpa_ref_location(item) && !callnumber::item_is_updated(item)
}

/// Replace the item's call number field with `new_field` and append an
/// internal note naming the former call number.
///
/// Returns Err(MultiCallNum) if the item has more than one call number
/// field.  The item itself is never modified.
pub fn change_item_call_number(item: &Item, new_field: &VarField) -> SierraResult<Vec<VarField>> {
    change_item_call_number_on(item, new_field, Local::now().date_naive())
}

/// Same as change_item_call_number() with the note date supplied.
pub fn change_item_call_number_on(
    item: &Item,
    new_field: &VarField,
    date: NaiveDate,
) -> SierraResult<Vec<VarField>> {
    let mut new_fields = Vec::new();
    let mut former: Option<String> = None;

    for field in item.var_fields() {
        if !is_call_number_field(field) {
            new_fields.push(field.clone());
            continue;
        }

        if former.is_some() {
            return Err(SierraError::MultiCallNum {
                item_id: item.id().to_string(),
            });
        }

        former = Some(callnumber::extract_call_number(field));
    }

    let former = former.unwrap_or_else(|| callnumber::MISSING_CALL_NUMBER.to_string());

    new_fields.push(new_field.clone());
    new_fields.push(callnumber::item_internal_note(&former, date)?);

    Ok(new_fields)
}

/// Collapse call numbers which normalize to the same value.
///
/// Which of the colliding originals survives is not significant, but
/// it is stable: the first in sort order wins.
pub fn dedup_orphan_call_numbers(call_numbers: &BTreeSet<String>) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut deduped = BTreeSet::new();

    for cn in call_numbers {
        if seen.insert(callnumber::normalize(cn)) {
            deduped.insert(cn.clone());
        }
    }

    deduped
}

/// Drop bib call number fields which are safe to delete and append a
/// salvage note for each distinct call number dropped.
///
/// The new bib call number field is appended by the caller.
pub fn rewrite_bib_fields(
    var_fields: &[VarField],
    for_deletion: &BTreeSet<String>,
    other_location: &BTreeSet<String>,
) -> SierraResult<Vec<VarField>> {
    let mut new_fields = Vec::new();
    let mut orphans = BTreeSet::new();

    for field in var_fields {
        if is_call_number_field(field) {
            let cn = callnumber::extract_call_number(field);
            let norm = callnumber::normalize(&cn);
            if !norm.is_empty() && for_deletion.contains(&norm) {
                orphans.insert(cn);
                continue;
            }
        }
        new_fields.push(field.clone());
    }

    log::debug!("Orphan call numbers: {orphans:?} other locations: {other_location:?}");

    for cn in dedup_orphan_call_numbers(&orphans) {
        new_fields.push(callnumber::salvage_note_field(&cn)?);
    }

    Ok(new_fields)
}

/// Bib call numbers which are neither safe to delete nor held by an
/// item in another location.
///
/// Nothing can be said about where these belong, so they are left in
/// place and reported.
pub fn unconfirmed_call_numbers(
    var_fields: &[VarField],
    for_deletion: &BTreeSet<String>,
    other_location: &BTreeSet<String>,
) -> Vec<String> {
    var_fields
        .iter()
        .filter(|f| is_call_number_field(f))
        .map(callnumber::extract_call_number)
        .filter(|cn| {
            let norm = callnumber::normalize(cn);
            !norm.is_empty() && !for_deletion.contains(&norm) && !other_location.contains(&norm)
        })
        .collect()
}
