//! Validation dispatch: connects declared entity columns to the validator
//! registry.
//!
//! Every entity declares which of its columns require validation
//! (`Record::VALIDATED_COLUMNS`, entries bare or `table.column`-qualified)
//! and routes every field assignment through [`validated`]. The declared
//! list decides *whether* a column is validated; the registry lookup in
//! [`crate::validators::resolve`] decides *which* validator runs, with
//! qualified keys winning over bare ones. A failure comes back tagged with
//! the offending column name, so callers can report the field without
//! inspecting anything else.
//!
//! Dispatch keeps no state of its own; concurrent validation of unrelated
//! records never contends.

use crate::error::{ModelError, ModelResult};
use crate::validators;
use crate::value::Value;

/// True if `declared` lists `column`, either bare or qualified as
/// `table.column`.
fn declares(declared: &[&str], table: &str, column: &str) -> bool {
    declared.iter().any(|entry| match entry.split_once('.') {
        Some((t, c)) => t == table && c == column,
        None => *entry == column,
    })
}

/// Run the applicable validator for one assignment to `table`.`column`.
///
/// Undeclared columns pass through untouched. A declared column without a
/// registered validator is a schema bug, not a data error.
pub fn validated(
    table: &'static str,
    declared: &'static [&'static str],
    column: &str,
    value: Value,
) -> ModelResult<Value> {
    if !declares(declared, table, column) {
        return Ok(value);
    }
    let validator =
        validators::resolve(table, column).ok_or_else(|| ModelError::MissingValidator {
            entity: table,
            field: column.to_string(),
        })?;
    validator(value).map_err(|message| ModelError::Validation {
        field: column.to_string(),
        message,
    })
}

/// Upgrade a value-shape complaint (wrong `Value` variant for the column)
/// into a field-tagged validation error.
pub(crate) fn tag<T>(column: &str, result: Result<T, String>) -> ModelResult<T> {
    result.map_err(|message| ModelError::Validation {
        field: column.to_string(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undeclared_columns_pass_through() {
        let value = Value::from("anything at all \u{7}");
        let out = validated("org", &["org_id"], "actual_name", value.clone()).unwrap();
        assert_eq!(out, value);
    }

    #[test]
    fn failures_carry_the_field_name() {
        let err = validated("org", &["org_id"], "org_id", Value::from("BAD ID!")).unwrap_err();
        assert_eq!(err.invalid_field(), Some("org_id"));
    }

    #[test]
    fn qualified_declarations_match_their_table_only() {
        // `user.login` is declared for the user table; the same column name
        // on another table is not validated.
        assert!(validated("user", &["user.login"], "login", Value::from("x")).is_err());
        let out = validated("session", &["user.login"], "login", Value::from("x")).unwrap();
        assert_eq!(out, Value::from("x"));
    }

    #[test]
    fn declared_column_without_validator_is_a_schema_bug() {
        let err = validated("org", &["no_such_column"], "no_such_column", Value::Null).unwrap_err();
        assert!(matches!(err, ModelError::MissingValidator { .. }));
    }
}
