//! Statement AST and its rendering back to store SQL with quoted identifiers.

use crate::database::value::Value;
use crate::database::value::DATE_FORMAT;
use crate::sql::lexer::Token;
use crate::sql::quote_identifier;
use crate::sql::quote_literal;
use crate::sql::StatementKind;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    ShowTables,
    ShowCreateTable(String),
    Refresh,
    /// Statements the store runs verbatim (INSERT, CREATE TABLE, ALTER TABLE, others)
    Passthrough {
        kind: StatementKind,
        table: Option<String>,
        text: String,
    },
}

/// A possibly table-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn new(table: Option<&str>, name: &str) -> Self {
        Self {
            table: table.map(str::to_owned),
            name: name.to_owned(),
        }
    }

    /// `Table.column` when qualified, else `column`.
    pub fn key(&self) -> String {
        match &self.table {
            Some(table) => format!("{table}.{}", self.name),
            None => self.name.to_owned(),
        }
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", quote_identifier(table), quote_identifier(&self.name)),
            None => f.write_str(&quote_identifier(&self.name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard,
    /// `Table.*`
    QualifiedWildcard(String),
    Column { column: ColumnRef, alias: Option<String> },
    /// `COUNT(*)`
    CountAll { alias: Option<String> },
    /// Any other projection; only the store evaluates these
    Expression { tokens: Vec<Token>, alias: Option<String> },
}

impl SelectItem {
    /// Name of the produced field.
    pub fn output_name(&self) -> Option<String> {
        match self {
            SelectItem::Wildcard | SelectItem::QualifiedWildcard(_) => None,
            SelectItem::Column { column, alias } => Some(alias.to_owned().unwrap_or_else(|| column.key())),
            SelectItem::CountAll { alias } => Some(alias.to_owned().unwrap_or_else(|| "COUNT(*)".to_owned())),
            SelectItem::Expression { tokens, alias } => Some(alias.to_owned().unwrap_or_else(|| render_tokens(tokens))),
        }
    }
}

impl Display for SelectItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectItem::Wildcard => f.write_str("*"),
            SelectItem::QualifiedWildcard(table) => write!(f, "{}.*", quote_identifier(table)),
            SelectItem::Column { column, alias: Some(alias) } => write!(f, "{} AS {}", column, quote_identifier(alias)),
            SelectItem::Column { column, alias: None } if column.table.is_some() => {
                write!(f, "{} AS {}", column, quote_identifier(&column.key()))
            }
            SelectItem::Column { column, alias: None } => write!(f, "{column}"),
            SelectItem::CountAll { .. } | SelectItem::Expression { .. } => write!(
                f,
                "{} AS {}",
                match self {
                    SelectItem::Expression { tokens, .. } => render_tokens(tokens),
                    _ => "COUNT(*)".to_owned(),
                },
                quote_identifier(&self.output_name().unwrap_or_default())
            ),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub columns: Vec<SelectItem>,
    pub table_name: String,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    /// Kept for the store; the fallback evaluator does not group
    pub group_by: Vec<Token>,
    pub having: Vec<Token>,
    /// Kept for the store; the fallback evaluator does not sort
    pub order_by: Vec<Token>,
    pub limit: Option<usize>,
}

impl SelectStatement {
    pub fn is_count_all(&self) -> bool {
        matches!(self.columns.as_slice(), [SelectItem::CountAll { .. }])
    }

    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.columns.iter().map(|item| item.to_string()).collect::<Vec<_>>().join(", "));
        sql.push_str(" FROM ");
        sql.push_str(&quote_identifier(&self.table_name));
        for join in &self.joins {
            sql.push_str(&format!(" {} {} ON {}", join.kind.as_str(), quote_identifier(&join.table), join.condition));
        }
        if let Some(condition) = &self.where_clause {
            sql.push_str(&format!(" WHERE {condition}"));
        }
        if !self.group_by.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", render_tokens(&self.group_by)));
        }
        if !self.having.is_empty() {
            sql.push_str(&format!(" HAVING {}", render_tokens(&self.having)));
        }
        if !self.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", render_tokens(&self.order_by)));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table_name: String,
    /// Column names with their literal values
    pub assignments: Vec<(String, Value)>,
    pub where_clause: Option<Expr>,
}

impl UpdateStatement {
    /// Renders with the given values in place of the parsed literals.
    pub fn to_sql(&self, values: &[Value]) -> String {
        let assignments = self
            .assignments
            .iter()
            .zip(values)
            .map(|((column, _), value)| format!("{} = {}", quote_identifier(column), render_literal(value)))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE {} SET {}", quote_identifier(&self.table_name), assignments);
        if let Some(condition) = &self.where_clause {
            sql.push_str(&format!(" WHERE {condition}"));
        }
        sql
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table_name: String,
    pub where_clause: Option<Expr>,
}

impl DeleteStatement {
    pub fn to_sql(&self) -> String {
        let mut sql = format!("DELETE FROM {}", quote_identifier(&self.table_name));
        if let Some(condition) = &self.where_clause {
            sql.push_str(&format!(" WHERE {condition}"));
        }
        sql
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinaryOperator {
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

/// Condition and value expressions of WHERE and ON clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(ColumnRef),
    Not(Box<Expr>),
    Negate(Box<Expr>),
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Flattens nested ANDs into their operands.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::Binary { left, op: BinaryOperator::And, right } => {
                let mut conjuncts = left.conjuncts();
                conjuncts.extend(right.conjuncts());
                conjuncts
            }
            expr => vec![expr],
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(value) => f.write_str(&render_literal(value)),
            Expr::Column(column) => write!(f, "{column}"),
            Expr::Not(expr) => write!(f, "(NOT {expr})"),
            Expr::Negate(expr) => write!(f, "(-{expr})"),
            Expr::Binary { left, op, right } => write!(f, "({left} {} {right})", op.as_str()),
            Expr::IsNull { expr, negated } => write!(f, "({expr} IS {}NULL)", if *negated { "NOT " } else { "" }),
            Expr::Like { expr, pattern, negated } => {
                write!(f, "({expr} {}LIKE {pattern})", if *negated { "NOT " } else { "" })
            }
            Expr::InList { expr, list, negated } => write!(
                f,
                "({expr} {}IN ({}))",
                if *negated { "NOT " } else { "" },
                list.iter().map(|item| item.to_string()).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

/// Store SQL form of a literal value.
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Int(value) => value.to_string(),
        Value::Float(value) if value.is_finite() => format!("{value:?}"),
        Value::Float(_) => "NULL".to_owned(),
        Value::Text(text) => quote_literal(text),
        Value::Bool(value) => if *value { "TRUE" } else { "FALSE" }.to_owned(),
        Value::Date(value) => quote_literal(&value.format(DATE_FORMAT).to_string()),
    }
}

/// Renders raw clause tokens; identifiers directly before `(` are function names and stay bare.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut sql = String::new();
    for (index, token) in tokens.iter().enumerate() {
        let next = tokens.get(index + 1);
        let previous = index.checked_sub(1).and_then(|index| tokens.get(index));
        let is_function = matches!((token, next), (Token::Ident(_), Some(Token::OpenParen)));
        let is_call = matches!((previous, token), (Some(Token::Ident(_)), Token::OpenParen));
        let glued = matches!(previous, None | Some(Token::Period) | Some(Token::OpenParen))
            || matches!(token, Token::Period | Token::CloseParen | Token::Comma)
            || is_call;
        if !glued {
            sql.push(' ');
        }
        match token {
            Token::Ident(name) if is_function => sql.push_str(name),
            token => sql.push_str(&token.to_string()),
        }
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_select_with_join() {
        let statement = SelectStatement {
            distinct: false,
            columns: vec![
                SelectItem::Column { column: ColumnRef::new(Some("Orders"), "id"), alias: None },
                SelectItem::Column { column: ColumnRef::new(None, "name"), alias: Some("who".to_owned()) },
            ],
            table_name: "Orders".to_owned(),
            joins: vec![Join {
                kind: JoinKind::Left,
                table: "Users".to_owned(),
                condition: Expr::binary(
                    Expr::Column(ColumnRef::new(Some("Orders"), "user_id")),
                    BinaryOperator::Equal,
                    Expr::Column(ColumnRef::new(Some("Users"), "id")),
                ),
            }],
            where_clause: Some(Expr::binary(
                Expr::Column(ColumnRef::new(None, "name")),
                BinaryOperator::Equal,
                Expr::Literal("O'Neil".into()),
            )),
            group_by: vec![],
            having: vec![],
            order_by: vec![],
            limit: Some(5),
        };
        assert_eq!(
            statement.to_sql(),
            "SELECT \"Orders\".\"id\" AS \"Orders.id\", \"name\" AS \"who\" FROM \"Orders\" \
             LEFT JOIN \"Users\" ON (\"Orders\".\"user_id\" = \"Users\".\"id\") \
             WHERE (\"name\" = 'O''Neil') LIMIT 5"
        );
    }

    #[test]
    fn render_function_tokens() {
        let tokens = vec![
            Token::Ident("SUM".to_owned()),
            Token::OpenParen,
            Token::Ident("Price".to_owned()),
            Token::CloseParen,
        ];
        assert_eq!(render_tokens(&tokens), "SUM(\"Price\")");
        let order = vec![Token::Ident("Price".to_owned()), Token::Keyword(crate::sql::lexer::Keyword::Desc), Token::Comma, Token::Ident("ID".to_owned())];
        assert_eq!(render_tokens(&order), "\"Price\" DESC, \"ID\"");
    }

    #[test]
    fn render_literals() {
        assert_eq!(render_literal(&Value::Float(12.5)), "12.5");
        assert_eq!(render_literal(&Value::Float(3.0)), "3.0");
        assert_eq!(render_literal(&Value::Bool(false)), "FALSE");
        assert_eq!(render_literal(&Value::Null), "NULL");
    }

    #[test]
    fn conjuncts_flatten() {
        let a = Expr::Literal(Value::Int(1));
        let expr = Expr::binary(Expr::binary(a.clone(), BinaryOperator::And, a.clone()), BinaryOperator::And, a.clone());
        assert_eq!(expr.conjuncts().len(), 3);
    }
}
