//! Migration of deprecated filter fields into adhoc filters.

use serde_json::Value;

use crate::core::adhoc::{Clause, simple_filter_to_adhoc, sql_clause_to_adhoc};
use crate::core::types::{FormData, is_truthy};
use crate::error::MalformedInput;

/// Legacy fields per clause: (clause, free-form SQL key, structured filter list key).
const LEGACY_CLAUSES: [(Clause, &str, &str); 2] = [
    (Clause::Having, "having", "having_filters"),
    (Clause::Where, "where", "filters"),
];

const LEGACY_KEYS: [&str; 4] = ["filters", "having", "having_filters", "where"];

/// Rewrite `where`/`having`/`filters`/`having_filters` into `adhoc_filters`.
///
/// Conversion only happens when `adhoc_filters` is missing or empty; the
/// legacy keys are dropped either way, so a second pass is a no-op.
pub fn convert_legacy_filters_into_adhoc(
    mut form_data: FormData,
) -> Result<FormData, MalformedInput> {
    let has_adhoc = form_data.get("adhoc_filters").is_some_and(is_truthy);
    if !has_adhoc {
        let mut adhoc_filters = Vec::new();
        for (clause, sql_key, filters_key) in LEGACY_CLAUSES {
            match form_data.get(sql_key) {
                None | Some(Value::Null) => {}
                Some(Value::String(expression)) if expression.is_empty() => {}
                Some(Value::String(expression)) => {
                    adhoc_filters.push(sql_clause_to_adhoc(clause, expression));
                }
                Some(_) => return Err(MalformedInput::field_type(sql_key, "a string")),
            }

            match form_data.get(filters_key) {
                None | Some(Value::Null) => {}
                Some(Value::Array(filters)) => {
                    for filter in filters.iter().filter(|filter| !filter.is_null()) {
                        adhoc_filters.push(simple_filter_to_adhoc(filters_key, filter, clause)?);
                    }
                }
                Some(_) => return Err(MalformedInput::filter(filters_key, "expected a list")),
            }
        }
        form_data.insert("adhoc_filters".into(), Value::Array(adhoc_filters));
    }

    for key in LEGACY_KEYS {
        form_data.shift_remove(key);
    }
    Ok(form_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::form_data as form;
    use serde_json::json;

    #[test]
    fn converts_sql_clauses_and_simple_filters() {
        let form_data = form(json!({
            "viz_type": "table",
            "where": "a > 1",
            "having": "",
            "filters": [{"col": "country", "op": "==", "val": "FR"}, null],
            "having_filters": [{"col": "SUM(x)", "op": ">", "val": 10}],
        }));

        let migrated = convert_legacy_filters_into_adhoc(form_data).expect("migrate");

        let adhoc = migrated["adhoc_filters"].as_array().expect("list");
        assert_eq!(adhoc.len(), 3);
        assert_eq!(adhoc[0]["clause"], "HAVING");
        assert_eq!(adhoc[0]["subject"], "SUM(x)");
        assert_eq!(adhoc[1]["expressionType"], "SQL");
        assert_eq!(adhoc[1]["sqlExpression"], "a > 1");
        assert_eq!(adhoc[2]["clause"], "WHERE");
        assert_eq!(adhoc[2]["comparator"], "FR");
        for key in LEGACY_KEYS {
            assert!(!migrated.contains_key(key), "{key} should be removed");
        }
        assert_eq!(migrated["viz_type"], "table");
    }

    #[test]
    fn existing_adhoc_filters_are_kept_and_legacy_keys_dropped() {
        let existing = json!([
            {"expressionType": "SQL", "clause": "WHERE", "sqlExpression": "1 = 1"}
        ]);
        let form_data = form(json!({
            "adhoc_filters": existing.clone(),
            "where": "b < 2",
            "filters": [{"col": "c", "op": "==", "val": 1}],
        }));

        let migrated = convert_legacy_filters_into_adhoc(form_data).expect("migrate");

        assert_eq!(migrated["adhoc_filters"], existing);
        assert!(!migrated.contains_key("where"));
        assert!(!migrated.contains_key("filters"));
    }

    #[test]
    fn migration_is_idempotent() {
        let form_data = form(json!({
            "where": "a > 1",
            "filters": [{"col": "country", "op": "in", "val": ["FR"]}],
        }));

        let once = convert_legacy_filters_into_adhoc(form_data).expect("first");
        let twice = convert_legacy_filters_into_adhoc(once.clone()).expect("second");
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_form_data_gets_empty_adhoc_list() {
        let migrated = convert_legacy_filters_into_adhoc(FormData::new()).expect("migrate");
        assert_eq!(migrated["adhoc_filters"], json!([]));
    }

    #[test]
    fn malformed_filter_fails_fast() {
        let form_data = form(json!({"filters": [{"op": "=="}]}));
        let err = convert_legacy_filters_into_adhoc(form_data).expect_err("malformed");
        assert!(matches!(err, MalformedInput::Filter { .. }));
    }

    #[test]
    fn non_list_filters_fail_fast() {
        let form_data = form(json!({"filters": "country = 'FR'"}));
        assert!(convert_legacy_filters_into_adhoc(form_data).is_err());
    }
}
