//! Row-level evaluation of WHERE and ON expressions with SQL three-valued logic.

use crate::database::table::Row;
use crate::database::value::Value;
use crate::engine::EvaluationError;
use crate::sql::ast::BinaryOperator;
use crate::sql::ast::ColumnRef;
use crate::sql::ast::Expr;
use regex::Regex;
use std::cmp::Ordering;

type Result<T> = std::result::Result<T, EvaluationError>;

/// Whether `expr` holds for `row`. Unknown (null) counts as false.
pub fn matches(expr: &Expr, row: &Row) -> Result<bool> {
    Ok(evaluate(expr, row)?.is_truthy())
}

pub fn evaluate(expr: &Expr, row: &Row) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.to_owned()),
        Expr::Column(column) => lookup(row, column).cloned(),
        Expr::Not(expr) => Ok(match truth(&evaluate(expr, row)?) {
            Some(value) => Value::Bool(!value),
            None => Value::Null,
        }),
        Expr::Negate(expr) => match evaluate(expr, row)? {
            Value::Null => Ok(Value::Null),
            Value::Int(value) => Ok(value.checked_neg().map(Value::Int).unwrap_or(Value::Float(-(value as f64)))),
            Value::Float(value) => Ok(Value::Float(-value)),
            value => value
                .as_f64()
                .map(|value| Value::Float(-value))
                .ok_or_else(|| mismatch("-", &Value::Null, &value)),
        },
        Expr::Binary { left, op: BinaryOperator::And, right } => {
            let left = truth(&evaluate(left, row)?);
            if left == Some(false) {
                return Ok(Value::Bool(false));
            }
            Ok(match (left, truth(&evaluate(right, row)?)) {
                (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Null,
            })
        }
        Expr::Binary { left, op: BinaryOperator::Or, right } => {
            let left = truth(&evaluate(left, row)?);
            if left == Some(true) {
                return Ok(Value::Bool(true));
            }
            Ok(match (left, truth(&evaluate(right, row)?)) {
                (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            })
        }
        Expr::Binary { left, op, right } => {
            let left = evaluate(left, row)?;
            let right = evaluate(right, row)?;
            binary(&left, *op, &right)
        }
        Expr::IsNull { expr, negated } => Ok(Value::Bool(evaluate(expr, row)?.is_null() != *negated)),
        Expr::Like { expr, pattern, negated } => {
            let value = evaluate(expr, row)?;
            let pattern = evaluate(pattern, row)?;
            if value.is_null() || pattern.is_null() {
                return Ok(Value::Null);
            }
            let matched = like_regex(&pattern.to_string())?.is_match(&value.to_string());
            Ok(Value::Bool(matched != *negated))
        }
        Expr::InList { expr, list, negated } => {
            let value = evaluate(expr, row)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let mut unknown = false;
            for item in list {
                let item = evaluate(item, row)?;
                match compare(&value, &item, "IN")? {
                    Some(Ordering::Equal) => return Ok(Value::Bool(!*negated)),
                    Some(_) => (),
                    None => unknown = true,
                }
            }
            Ok(if unknown { Value::Null } else { Value::Bool(*negated) })
        }
    }
}

/// Finds a column in a row. Qualified names match their prefixed key first,
/// then the bare name, which is how the left table of a join stores its fields.
pub fn lookup<'a>(row: &'a Row, column: &ColumnRef) -> Result<&'a Value> {
    let find = move |key: &str| {
        row.get(key).or_else(|| {
            row.iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| value)
        })
    };
    let found = match &column.table {
        Some(_) => find(&column.key()).or_else(|| find(&column.name)),
        None => find(&column.name).or_else(|| {
            let suffix = format!(".{}", column.name.to_lowercase());
            row.iter()
                .find(|(name, _)| name.to_lowercase().ends_with(&suffix))
                .map(|(_, value)| value)
        }),
    };
    found.ok_or_else(|| EvaluationError::UnknownColumn(column.key()))
}

/// LIKE pattern as an anchored regex: `%` is any run, `_` any one character.
pub fn like_regex(pattern: &str) -> Result<Regex> {
    let mut expression = String::from("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            c => expression.push_str(&regex::escape(&c.to_string())),
        }
    }
    expression.push('$');
    Regex::new(&expression).map_err(|_| EvaluationError::InvalidPattern(pattern.to_owned()))
}

fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        value => Some(value.is_truthy()),
    }
}

fn mismatch(operator: &str, left: &Value, right: &Value) -> EvaluationError {
    EvaluationError::TypeMismatch {
        operator: operator.to_owned(),
        left: describe(left),
        right: describe(right),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Text(text) => format!("'{text}'"),
        value => value.to_string(),
    }
}

/// Ordering of two values; `None` when either is null.
fn compare(left: &Value, right: &Value, operator: &str) -> Result<Option<Ordering>> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    left.compare(right)
        .map(Some)
        .ok_or_else(|| mismatch(operator, left, right))
}

fn binary(left: &Value, op: BinaryOperator, right: &Value) -> Result<Value> {
    let comparison = |accept: fn(Ordering) -> bool| -> Result<Value> {
        Ok(match compare(left, right, op.as_str())? {
            Some(ordering) => Value::Bool(accept(ordering)),
            None => Value::Null,
        })
    };
    match op {
        BinaryOperator::Equal => comparison(|ordering| ordering == Ordering::Equal),
        BinaryOperator::NotEqual => comparison(|ordering| ordering != Ordering::Equal),
        BinaryOperator::LessThan => comparison(|ordering| ordering == Ordering::Less),
        BinaryOperator::LessOrEqual => comparison(|ordering| ordering != Ordering::Greater),
        BinaryOperator::GreaterThan => comparison(|ordering| ordering == Ordering::Greater),
        BinaryOperator::GreaterOrEqual => comparison(|ordering| ordering != Ordering::Less),
        BinaryOperator::And | BinaryOperator::Or => Err(mismatch(op.as_str(), left, right)),
        _ => arithmetic(left, op, right),
    }
}

fn arithmetic(left: &Value, op: BinaryOperator, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if let (Value::Int(l), Value::Int(r)) = (left, right) {
        let exact = match op {
            BinaryOperator::Plus => l.checked_add(*r),
            BinaryOperator::Minus => l.checked_sub(*r),
            BinaryOperator::Multiply => l.checked_mul(*r),
            BinaryOperator::Modulo if *r == 0 => return Err(EvaluationError::DivisionByZero),
            BinaryOperator::Modulo => l.checked_rem(*r),
            _ => None,
        };
        if let Some(value) = exact {
            return Ok(Value::Int(value));
        }
    }
    let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) else {
        return Err(mismatch(op.as_str(), left, right));
    };
    let value = match op {
        BinaryOperator::Plus => l + r,
        BinaryOperator::Minus => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide | BinaryOperator::Modulo if r == 0.0 => return Err(EvaluationError::DivisionByZero),
        BinaryOperator::Divide => l / r,
        BinaryOperator::Modulo => l % r,
        _ => return Err(mismatch(op.as_str(), left, right)),
    };
    Ok(Value::Float(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::parse_select;

    fn condition(text: &str) -> Expr {
        parse_select(&format!("SELECT * FROM t WHERE {text}"))
            .unwrap()
            .where_clause
            .unwrap()
    }

    fn row() -> Row {
        Row::from_iter([
            ("id".to_owned(), Value::Int(1)),
            ("name".to_owned(), Value::Text("Widget".to_owned())),
            ("price".to_owned(), Value::Float(9.99)),
            ("note".to_owned(), Value::Null),
            ("Users.id".to_owned(), Value::Int(7)),
        ])
    }

    #[test]
    fn comparisons_and_connectives() {
        let row = row();
        assert!(matches(&condition("id = 1"), &row).unwrap());
        assert!(matches(&condition("id == 1 AND name = 'Widget'"), &row).unwrap());
        assert!(matches(&condition("id != 1 OR price < 10"), &row).unwrap());
        assert!(!matches(&condition("NOT price >= 9.99"), &row).unwrap());
        assert!(matches(&condition("id = '1'"), &row).unwrap());
    }

    #[test]
    fn nulls_are_unknown() {
        let row = row();
        assert!(!matches(&condition("note = 1"), &row).unwrap());
        assert!(!matches(&condition("NOT note = 1"), &row).unwrap());
        assert!(matches(&condition("note IS NULL"), &row).unwrap());
        assert!(matches(&condition("name IS NOT NULL"), &row).unwrap());
        assert!(matches(&condition("note = 1 OR id = 1"), &row).unwrap());
    }

    #[test]
    fn arithmetic_values() {
        let row = row();
        assert!(matches(&condition("id + 1 = 2"), &row).unwrap());
        assert!(matches(&condition("price * 2 > 19"), &row).unwrap());
        assert!(matches(&condition("7 % 4 = 3"), &row).unwrap());
        assert!(matches(&condition("id / 2 = 0.5"), &row).unwrap());
        assert_eq!(evaluate(&condition("id / 0"), &row), Err(EvaluationError::DivisionByZero));
        assert!(matches!(evaluate(&condition("name + 1"), &row), Err(EvaluationError::TypeMismatch { .. })));
    }

    #[test]
    fn like_and_in() {
        let row = row();
        assert!(matches(&condition("name LIKE 'Wid%'"), &row).unwrap());
        assert!(matches(&condition("name LIKE '_idget'"), &row).unwrap());
        assert!(!matches(&condition("name LIKE 'wid%'"), &row).unwrap());
        assert!(matches(&condition("name NOT LIKE '%.%'"), &row).unwrap());
        assert!(matches(&condition("id IN (3, 2, 1)"), &row).unwrap());
        assert!(matches(&condition("name NOT IN ('Gadget')"), &row).unwrap());
    }

    #[test]
    fn qualified_lookup() {
        let row = row();
        assert_eq!(lookup(&row, &ColumnRef::new(Some("Users"), "id")).unwrap(), &Value::Int(7));
        assert_eq!(lookup(&row, &ColumnRef::new(Some("Orders"), "id")).unwrap(), &Value::Int(1));
        assert_eq!(lookup(&row, &ColumnRef::new(None, "NAME")).unwrap(), &Value::Text("Widget".to_owned()));
        assert_eq!(
            lookup(&row, &ColumnRef::new(None, "missing")),
            Err(EvaluationError::UnknownColumn("missing".to_owned()))
        );
    }
}
