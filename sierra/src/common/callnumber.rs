//! Call number (852) field helpers.
use crate::record::Item;
use crate::result::{SierraError, SierraResult};
use crate::varfield::VarField;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const CALL_NUMBER_MARC_TAG: &str = "852";

/// Sierra field tag for item level call numbers.
pub const ITEM_CALL_NUMBER_TAG: &str = "c";

/// Sierra field tag for bib level call numbers.
pub const BIB_CALL_NUMBER_TAG: &str = "q";

/// First indicator applied to call numbers created by the reclass
/// process.  Its presence on an item means the item was already done.
pub const RECLASS_IND1: &str = "0";
pub const RECLASS_IND2: &str = "1";

/// Subfields holding copy/volume notes which are not part of the
/// call number proper.
const NON_CALL_NUMBER_CODES: &[&str] = &["m", "z"];

/// LPA reference locations
pub const LPA_REF_LOCATIONS: &[&str] = &["pam11", "pah11"];

pub const SALVAGE_NOTE_FIELD_TAG: &str = "l";
pub const SALVAGE_NOTE_MARC_TAG: &str = "947";

pub const INTERNAL_NOTE_FIELD_TAG: &str = "x";
pub const INTERNAL_NOTE_UNIT: &str = "CAT/mus";
pub const MISSING_CALL_NUMBER: &str = "MISSING on item";

const LCC_PATTERN: &str = r"^(.*\.\d+)(\..*)";
const NORMALIZE_PATTERN: &str = r#"[.,()"-]"#;

static LCC_REGEX: OnceLock<Regex> = OnceLock::new();
static NORMALIZE_REGEX: OnceLock<Regex> = OnceLock::new();

fn lcc_regex() -> &'static Regex {
    LCC_REGEX.get_or_init(|| Regex::new(LCC_PATTERN).expect("valid LCC regex"))
}

fn normalize_regex() -> &'static Regex {
    NORMALIZE_REGEX.get_or_init(|| Regex::new(NORMALIZE_PATTERN).expect("valid normalize regex"))
}

/// True if the field is an item ("c") or bib ("q") level 852.
///
/// ```
/// use sierra::varfield::VarField;
/// use sierra::common::callnumber::is_call_number_field;
///
/// assert!(is_call_number_field(&VarField::new("c", "852").unwrap()));
/// assert!(is_call_number_field(&VarField::new("q", "852").unwrap()));
/// assert!(!is_call_number_field(&VarField::new("y", "852").unwrap()));
/// assert!(!is_call_number_field(&VarField::new("c", "245").unwrap()));
/// assert!(!is_call_number_field(&VarField::new_content("c", "852").unwrap()));
/// ```
pub fn is_call_number_field(field: &VarField) -> bool {
    field.marc_tag() == Some(CALL_NUMBER_MARC_TAG)
        && (field.field_tag() == ITEM_CALL_NUMBER_TAG || field.field_tag() == BIB_CALL_NUMBER_TAG)
}

/// Join the trimmed subfield values of a call number field with
/// single spaces, skipping the $m and $z notes.
pub fn extract_call_number(field: &VarField) -> String {
    field
        .subfields()
        .iter()
        .filter(|sf| !NON_CALL_NUMBER_CODES.contains(&sf.code()))
        .map(|sf| sf.content().trim())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Comparison key for call numbers.
///
/// ```
/// use sierra::common::callnumber::normalize;
///
/// assert_eq!(normalize(" *ZP-*PYO+ n.c. 2, no. 7 "), "*ZP*PYO+ nc 2 no 7");
/// assert_eq!(normalize("FOO, BAR"), "FOO BAR");
/// ```
pub fn normalize(value: &str) -> String {
    normalize_regex().replace_all(value, "").trim().to_string()
}

/// True if the special cutter cell says "yes" in any form.
pub fn has_special_cutter(value: &str) -> bool {
    value.to_uppercase().contains("YES")
}

fn split_at_char(value: &str, c: char) -> Option<(String, String)> {
    value
        .find(c)
        .map(|idx| (value[..idx].trim().to_string(), value[idx..].trim().to_string()))
}

/// Split a classification into its class part (852 $h) and its
/// cutter part (852 $i).
///
/// Standard LCC values cutter at the period following the class
/// digits.  Special cutters have no such period and split at the
/// first space instead.
///
/// ```
/// use sierra::common::callnumber::split_classification;
///
/// assert_eq!(
///     split_classification("ML100.G13 2019", false).unwrap(),
///     ("ML100".to_string(), ".G13 2019".to_string())
/// );
/// assert_eq!(
///     split_classification("ML1733.8.M5 T45", false).unwrap(),
///     ("ML1733.8".to_string(), ".M5 T45".to_string())
/// );
/// assert_eq!(
///     split_classification("ML101.G7 S64 1984", true).unwrap(),
///     ("ML101.G7".to_string(), "S64 1984".to_string())
/// );
/// ```
pub fn split_classification(value: &str, special_cutter: bool) -> SierraResult<(String, String)> {
    let split = if special_cutter {
        split_at_char(value, ' ')
    } else if let Some(caps) = lcc_regex().captures(value) {
        Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
    } else {
        split_at_char(value, '.').or_else(|| split_at_char(value, ' '))
    };

    split.ok_or_else(|| {
        SierraError::invalid(format!(
            "Cannot split classification '{value}' special_cutter={special_cutter}"
        ))
    })
}

/// Build the 852 call number field applied by the reclass process.
///
/// * `field_tag` - "c" for items, "q" for bibs.
pub fn call_number_field(
    class_part: &str,
    cutter_part: &str,
    field_tag: &str,
) -> SierraResult<VarField> {
    if field_tag != ITEM_CALL_NUMBER_TAG && field_tag != BIB_CALL_NUMBER_TAG {
        return Err(SierraError::invalid(format!(
            "Invalid call number field tag: '{field_tag}'"
        )));
    }

    let mut field = VarField::new(field_tag, CALL_NUMBER_MARC_TAG)?;
    field.set_ind1(RECLASS_IND1)?;
    field.set_ind2(RECLASS_IND2)?;
    field.add_subfield("h", class_part)?;
    field.add_subfield("i", cutter_part)?;

    Ok(field)
}

/// 947 note preserving a removed call number for searching.
pub fn salvage_note_field(value: &str) -> SierraResult<VarField> {
    let mut field = VarField::new(SALVAGE_NOTE_FIELD_TAG, SALVAGE_NOTE_MARC_TAG)?;
    field.set_ind1(" ")?;
    field.set_ind2(" ")?;
    field.add_subfield("a", value)?;
    Ok(field)
}

/// Item internal note recording the former call number.
///
/// ```
/// use chrono::NaiveDate;
/// use sierra::common::callnumber::item_internal_note;
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// let note = item_internal_note("FOO", date).unwrap();
///
/// assert_eq!(note.field_tag(), "x");
/// assert_eq!(
///     note.content(),
///     Some("Reclassified by CAT/mus, 2024-03-09 (former classmark: FOO)")
/// );
/// ```
pub fn item_internal_note(former: &str, date: NaiveDate) -> SierraResult<VarField> {
    VarField::new_content(
        INTERNAL_NOTE_FIELD_TAG,
        format!(
            "Reclassified by {INTERNAL_NOTE_UNIT}, {} (former classmark: {former})",
            date.format("%Y-%m-%d")
        ),
    )
}

pub fn is_lpa_ref_location(item: &Item) -> bool {
    item.location_code()
        .map(|code| LPA_REF_LOCATIONS.contains(&code))
        .unwrap_or(false)
}

/// True if a previous reclass run already stamped this item.
pub fn item_is_updated(item: &Item) -> bool {
    item.var_fields()
        .iter()
        .any(|f| f.marc_tag() == Some(CALL_NUMBER_MARC_TAG) && f.ind1() == RECLASS_IND1)
}

/// Normalized call numbers found in a list of fields.
pub fn call_numbers(fields: &[VarField]) -> BTreeSet<String> {
    fields
        .iter()
        .filter(|f| is_call_number_field(f))
        .map(|f| normalize(&extract_call_number(f)))
        .collect()
}
