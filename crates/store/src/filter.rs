//! Metadata filters.
//!
//! Filters are JSON documents in the familiar document-store dialect:
//!
//! ```json
//! {"category": "P1", "page": {"$gt": 1}}
//! {"$or": [{"page": 1}, {"category": {"$in": ["P2", "P3"]}}]}
//! ```
//!
//! They compile to a parameterised SQL predicate over the item's JSON
//! metadata column. A record that lacks a field never satisfies a comparison
//! on it.

use imgsearch_core::{AppError, AppResult};
use rusqlite::types::Value as SqlValue;
use serde_json::{Map, Value};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// A scalar operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    fn from_json(value: &Value) -> AppResult<Self> {
        match value {
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float))
                .ok_or_else(|| AppError::InvalidFilter(format!("Unsupported number {}", n))),
            other => Err(AppError::InvalidFilter(format!(
                "Expected a string, number or boolean, got {}",
                other
            ))),
        }
    }

    fn to_sql(&self) -> SqlValue {
        match self {
            Scalar::Int(i) => SqlValue::Integer(*i),
            Scalar::Float(f) => SqlValue::Real(*f),
            Scalar::Text(s) => SqlValue::Text(s.clone()),
            // json_extract yields 1/0 for JSON booleans
            Scalar::Bool(b) => SqlValue::Integer(i64::from(*b)),
        }
    }
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Compare {
        field: String,
        op: CompareOp,
        value: Scalar,
    },
    In {
        field: String,
        values: Vec<Scalar>,
        negated: bool,
    },
}

impl Filter {
    /// Parse a JSON filter document.
    pub fn parse(value: &Value) -> AppResult<Self> {
        match value {
            Value::Object(map) => parse_object(map),
            other => Err(AppError::InvalidFilter(format!(
                "A filter must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Parse a filter from JSON text.
    pub fn from_json_str(text: &str) -> AppResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AppError::InvalidFilter(format!("Filter is not valid JSON: {}", e)))?;
        Self::parse(&value)
    }

    /// Compile to a SQL predicate over `metadata_column`, appending bound
    /// values to `params` in placeholder order.
    pub fn to_sql(&self, metadata_column: &str, params: &mut Vec<SqlValue>) -> String {
        match self {
            Filter::And(clauses) => join_clauses(clauses, " AND ", metadata_column, params),
            Filter::Or(clauses) => join_clauses(clauses, " OR ", metadata_column, params),
            Filter::Compare { field, op, value } => {
                params.push(SqlValue::Text(json_path(field)));
                params.push(value.to_sql());
                format!("json_extract({}, ?) {} ?", metadata_column, op.sql())
            }
            Filter::In {
                field,
                values,
                negated,
            } => {
                if values.is_empty() {
                    // x IN () is false, x NOT IN () holds only where x exists
                    return if *negated {
                        params.push(SqlValue::Text(json_path(field)));
                        format!("json_extract({}, ?) IS NOT NULL", metadata_column)
                    } else {
                        "0".to_string()
                    };
                }
                params.push(SqlValue::Text(json_path(field)));
                params.extend(values.iter().map(Scalar::to_sql));
                let placeholders = vec!["?"; values.len()].join(", ");
                format!(
                    "json_extract({}, ?) {}IN ({})",
                    metadata_column,
                    if *negated { "NOT " } else { "" },
                    placeholders
                )
            }
        }
    }
}

fn join_clauses(
    clauses: &[Filter],
    separator: &str,
    metadata_column: &str,
    params: &mut Vec<SqlValue>,
) -> String {
    let parts: Vec<String> = clauses
        .iter()
        .map(|c| c.to_sql(metadata_column, params))
        .collect();
    format!("({})", parts.join(separator))
}

fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field)
}

fn parse_object(map: &Map<String, Value>) -> AppResult<Filter> {
    if map.is_empty() {
        return Err(AppError::InvalidFilter("Empty filter object".to_string()));
    }

    let mut clauses = Vec::with_capacity(map.len());
    for (key, value) in map {
        match key.as_str() {
            "$and" => clauses.push(Filter::And(parse_list(key, value)?)),
            "$or" => clauses.push(Filter::Or(parse_list(key, value)?)),
            k if k.starts_with('$') => {
                return Err(AppError::InvalidFilter(format!(
                    "Operator '{}' must be applied to a field",
                    k
                )))
            }
            field => clauses.extend(parse_field(field, value)?),
        }
    }

    Ok(if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        Filter::And(clauses)
    })
}

fn parse_list(op: &str, value: &Value) -> AppResult<Vec<Filter>> {
    let items = value.as_array().ok_or_else(|| {
        AppError::InvalidFilter(format!("'{}' expects an array of filters", op))
    })?;
    if items.is_empty() {
        return Err(AppError::InvalidFilter(format!(
            "'{}' expects at least one filter",
            op
        )));
    }
    items.iter().map(Filter::parse).collect()
}

fn parse_field(field: &str, value: &Value) -> AppResult<Vec<Filter>> {
    if field.is_empty() || field.contains(['"', '\\']) {
        return Err(AppError::InvalidFilter(format!(
            "Invalid field name '{}'",
            field
        )));
    }

    let ops = match value {
        Value::Object(ops) => ops,
        scalar => {
            return Ok(vec![Filter::Compare {
                field: field.to_string(),
                op: CompareOp::Eq,
                value: Scalar::from_json(scalar)?,
            }])
        }
    };

    if ops.is_empty() {
        return Err(AppError::InvalidFilter(format!(
            "No operator given for field '{}'",
            field
        )));
    }

    ops.iter()
        .map(|(op, operand)| {
            let compare = |op| -> AppResult<Filter> {
                Ok(Filter::Compare {
                    field: field.to_string(),
                    op,
                    value: Scalar::from_json(operand)?,
                })
            };
            match op.as_str() {
                "$eq" => compare(CompareOp::Eq),
                "$ne" => compare(CompareOp::Ne),
                "$gt" => compare(CompareOp::Gt),
                "$gte" => compare(CompareOp::Gte),
                "$lt" => compare(CompareOp::Lt),
                "$lte" => compare(CompareOp::Lte),
                "$in" | "$nin" => {
                    let values = operand
                        .as_array()
                        .ok_or_else(|| {
                            AppError::InvalidFilter(format!("'{}' expects an array", op))
                        })?
                        .iter()
                        .map(Scalar::from_json)
                        .collect::<AppResult<Vec<_>>>()?;
                    Ok(Filter::In {
                        field: field.to_string(),
                        values,
                        negated: op == "$nin",
                    })
                }
                other => Err(AppError::InvalidFilter(format!(
                    "Unknown operator '{}' on field '{}'",
                    other, field
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(value: Value) -> (String, Vec<SqlValue>) {
        let filter = Filter::parse(&value).unwrap();
        let mut params = Vec::new();
        let sql = filter.to_sql("m", &mut params);
        (sql, params)
    }

    #[test]
    fn test_implicit_equality() {
        let (sql, params) = compile(json!({"category": "P1"}));
        assert_eq!(sql, "json_extract(m, ?) = ?");
        assert_eq!(
            params,
            vec![
                SqlValue::Text("$.\"category\"".into()),
                SqlValue::Text("P1".into())
            ]
        );
    }

    #[test]
    fn test_multiple_keys_are_anded() {
        let (sql, params) = compile(json!({"page": {"$gt": 1}, "category": {"$ne": "P2"}}));
        assert!(sql.starts_with('(') && sql.contains(" AND "));
        assert!(sql.contains("json_extract(m, ?) != ?"));
        assert!(sql.contains("json_extract(m, ?) > ?"));
        assert_eq!(params.len(), 4);
        assert!(params.contains(&SqlValue::Integer(1)));
    }

    #[test]
    fn test_in_and_nin() {
        let (sql, params) = compile(json!({"page": {"$in": [2, 3]}}));
        assert_eq!(sql, "json_extract(m, ?) IN (?, ?)");
        assert_eq!(params[1], SqlValue::Integer(2));

        let (sql, _) = compile(json!({"page": {"$nin": [2]}}));
        assert_eq!(sql, "json_extract(m, ?) NOT IN (?)");

        let (sql, params) = compile(json!({"page": {"$in": []}}));
        assert_eq!(sql, "0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_nested_logic() {
        let (sql, _) = compile(json!({
            "$or": [
                {"$and": [{"page": {"$gt": 1}}, {"page": {"$lt": 3}}], "category": "P2"},
                {"category": "P2"}
            ]
        }));
        assert_eq!(
            sql,
            "(((json_extract(m, ?) > ? AND json_extract(m, ?) < ?) AND json_extract(m, ?) = ?) OR json_extract(m, ?) = ?)"
        );
    }

    #[test]
    fn test_invalid_filters() {
        let cases = [
            json!({"$and": [{"$gt": 1}]}),
            json!({"$and": []}),
            json!({"$or": {"page": 1}}),
            json!({"page": {"$like": "x"}}),
            json!({"page": {}}),
            json!({"page": {"$in": 3}}),
            json!({"page": [1, 2]}),
            json!({"page": null}),
            json!({"bad\"field": 1}),
            json!({}),
            json!([1, 2]),
        ];
        for case in cases {
            let result = Filter::parse(&case);
            assert!(
                matches!(result, Err(AppError::InvalidFilter(_))),
                "expected InvalidFilter for {}",
                case
            );
        }
    }

    #[test]
    fn test_from_json_str() {
        assert!(Filter::from_json_str(r#"{"page": 1}"#).is_ok());
        assert!(matches!(
            Filter::from_json_str("{page: 1"),
            Err(AppError::InvalidFilter(_))
        ));
    }
}
