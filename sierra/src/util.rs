use crate::result::SierraResult;
use chrono::Local;
use json::JsonValue;

/// Timestamp format used in log and audit output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Translate a json value into a String.
///
/// Will coerce numeric values into strings.  Return Err if the
/// value is not a string or number.
///
/// ```
/// assert_eq!(sierra::util::json_string(&json::from(1000001)).unwrap(), "1000001");
/// assert_eq!(sierra::util::json_string(&json::from("3159578")).unwrap(), "3159578");
/// assert!(sierra::util::json_string(&json::JsonValue::Null).is_err());
/// ```
pub fn json_string(value: &JsonValue) -> SierraResult<String> {
    if let Some(s) = value.as_str() {
        Ok(s.to_string())
    } else if value.is_number() {
        Ok(format!("{value}"))
    } else {
        Err(format!("Cannot extract value as a string: {value}").into())
    }
}

/// Sierra item links end with the item ID.
///
/// ```
/// let link = "https://example.org/iii/sierra-api/v6/items/14381985";
/// assert_eq!(sierra::util::item_id_from_link(link), "14381985");
/// assert_eq!(sierra::util::item_id_from_link("14381985"), "14381985");
/// ```
pub fn item_id_from_link(link: &str) -> String {
    link.rsplit('/').next().unwrap_or(link).to_string()
}

/// Split a list into batches of at most `batch_size` values, retaining
/// the original order.
///
/// ```
/// let list = ["a", "b", "c", "d", "e"];
/// let batches = sierra::util::split_into_batches(&list, 2);
/// assert_eq!(batches, vec![vec!["a", "b"], vec!["c", "d"], vec!["e"]]);
/// ```
pub fn split_into_batches<T: Clone>(list: &[T], batch_size: usize) -> Vec<Vec<T>> {
    // chunks() panics on 0
    list.chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Current local time formatted for log output.
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}
