//! Change detection between two icon state documents.
//!
//! Compares page by page, then row by row (format 1) or item by item
//! (format 2).  Occupied slots are compared by `displayIdentifier` only, so
//! folder renames and folder membership edits do not count as changes.
//!
//! When the documents cannot be compared slot for slot (wrong node types, or
//! format 1 rows of different widths) the detector reports **no change** and
//! logs a warning: skipping a write is safer than pushing a document whose
//! shape the device did not expect.

use plist::Value;
use tracing::warn;

use crate::domain::config::FormatVersion;
use crate::iconstate::KEY_DISPLAY_IDENTIFIER;

/// Outcome of comparing two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Same,
    Changed,
    NotComparable,
}

/// Returns `true` if `proposed` differs meaningfully from `current`.
pub fn document_changed(current: &Value, proposed: &Value, format: FormatVersion) -> bool {
    match compare_documents(current, proposed, format) {
        Comparison::Changed => true,
        Comparison::Same => false,
        Comparison::NotComparable => {
            warn!(format = format.as_u8(), "icon state documents are not comparable; assuming no change");
            false
        }
    }
}

fn compare_documents(current: &Value, proposed: &Value, format: FormatVersion) -> Comparison {
    let (Some(a), Some(b)) = (current.as_array(), proposed.as_array()) else {
        return Comparison::NotComparable;
    };
    if a.len() != b.len() {
        return Comparison::Changed;
    }
    for (page_a, page_b) in a.iter().zip(b) {
        let result = match format {
            FormatVersion::V1 => compare_rows(page_a, page_b),
            FormatVersion::V2 => compare_items(page_a, page_b),
        };
        if result != Comparison::Same {
            return result;
        }
    }
    Comparison::Same
}

fn compare_rows(a: &Value, b: &Value) -> Comparison {
    let (Some(rows_a), Some(rows_b)) = (a.as_array(), b.as_array()) else {
        return Comparison::NotComparable;
    };
    if rows_a.len() != rows_b.len() {
        return Comparison::Changed;
    }
    for (row_a, row_b) in rows_a.iter().zip(rows_b) {
        let (Some(slots_a), Some(slots_b)) = (row_a.as_array(), row_b.as_array()) else {
            return Comparison::NotComparable;
        };
        // Format 1 rows are padded to a fixed width.
        if slots_a.len() != slots_b.len() {
            return Comparison::NotComparable;
        }
        let result = compare_slots(slots_a, slots_b);
        if result != Comparison::Same {
            return result;
        }
    }
    Comparison::Same
}

fn compare_items(a: &Value, b: &Value) -> Comparison {
    let (Some(items_a), Some(items_b)) = (a.as_array(), b.as_array()) else {
        return Comparison::NotComparable;
    };
    if items_a.len() != items_b.len() {
        return Comparison::Changed;
    }
    compare_slots(items_a, items_b)
}

fn compare_slots(a: &[Value], b: &[Value]) -> Comparison {
    for (slot_a, slot_b) in a.iter().zip(b) {
        match (slot_a.as_dictionary(), slot_b.as_dictionary()) {
            (Some(x), Some(y)) => {
                let id_a = x.get(KEY_DISPLAY_IDENTIFIER).and_then(Value::as_string);
                let id_b = y.get(KEY_DISPLAY_IDENTIFIER).and_then(Value::as_string);
                if id_a != id_b {
                    return Comparison::Changed;
                }
            }
            (None, None) => {}
            _ => return Comparison::Changed,
        }
    }
    Comparison::Same
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iconstate::{KEY_DISPLAY_NAME, KEY_ICON_LISTS};
    use plist::Dictionary;

    fn app(id: &str) -> Value {
        let mut dict = Dictionary::new();
        dict.insert(KEY_DISPLAY_IDENTIFIER.to_string(), Value::String(id.to_string()));
        Value::Dictionary(dict)
    }

    fn folder(name: &str, members: &[&str]) -> Value {
        let mut dict = Dictionary::new();
        dict.insert(KEY_DISPLAY_NAME.to_string(), Value::String(name.to_string()));
        dict.insert(
            KEY_ICON_LISTS.to_string(),
            Value::Array(vec![Value::Array(members.iter().map(|m| app(m)).collect())]),
        );
        Value::Dictionary(dict)
    }

    fn zero() -> Value {
        Value::Integer(0i64.into())
    }

    fn arr(items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    fn v1(page: Vec<Value>) -> Value {
        arr(vec![arr(vec![arr(vec![app("phone"), zero()])]), arr(vec![arr(page)])])
    }

    fn v2(page: Vec<Value>) -> Value {
        arr(vec![arr(vec![app("phone")]), arr(page)])
    }

    #[test]
    fn test_identical_documents_are_unchanged() {
        let doc = v1(vec![app("a"), app("b"), zero(), zero()]);
        assert!(!document_changed(&doc, &doc, FormatVersion::V1));
        let doc = v2(vec![app("a"), folder("F", &["x"])]);
        assert!(!document_changed(&doc, &doc, FormatVersion::V2));
    }

    #[test]
    fn test_identifier_substitution_is_a_change() {
        let a = v2(vec![app("a"), app("b")]);
        let b = v2(vec![app("a"), app("c")]);
        assert!(document_changed(&a, &b, FormatVersion::V2));
    }

    #[test]
    fn test_empty_to_occupied_toggle_is_a_change() {
        let a = v1(vec![app("a"), zero(), zero(), zero()]);
        let b = v1(vec![app("a"), app("b"), zero(), zero()]);
        assert!(document_changed(&a, &b, FormatVersion::V1));
    }

    #[test]
    fn test_folder_rename_alone_is_not_a_change() {
        let a = v2(vec![folder("Games", &["chess"])]);
        let b = v2(vec![folder("Play", &["chess", "go"])]);
        assert!(!document_changed(&a, &b, FormatVersion::V2));
    }

    #[test]
    fn test_page_count_difference_is_a_change() {
        let a = v2(vec![app("a")]);
        let mut b_pages = a.as_array().unwrap().clone();
        b_pages.push(arr(vec![app("z")]));
        assert!(document_changed(&a, &arr(b_pages), FormatVersion::V2));
    }

    #[test]
    fn test_v2_item_count_difference_is_a_change() {
        let a = v2(vec![app("a")]);
        let b = v2(vec![app("a"), app("b")]);
        assert!(document_changed(&a, &b, FormatVersion::V2));
    }

    #[test]
    fn test_v1_row_width_mismatch_is_not_comparable() {
        let a = v1(vec![app("a"), zero(), zero(), zero()]);
        let b = v1(vec![app("b"), zero()]);
        assert!(!document_changed(&a, &b, FormatVersion::V1));
    }

    #[test]
    fn test_non_array_root_is_not_comparable() {
        let a = Value::String("garbage".into());
        let b = v2(vec![app("a")]);
        assert!(!document_changed(&a, &b, FormatVersion::V2));
    }
}
