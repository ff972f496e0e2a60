//! Recursive-descent parser over lexer tokens.

use crate::database::value::Value;
use crate::sql::ast::BinaryOperator;
use crate::sql::ast::ColumnRef;
use crate::sql::ast::DeleteStatement;
use crate::sql::ast::Expr;
use crate::sql::ast::Join;
use crate::sql::ast::JoinKind;
use crate::sql::ast::SelectItem;
use crate::sql::ast::SelectStatement;
use crate::sql::ast::Statement;
use crate::sql::ast::UpdateStatement;
use crate::sql::lexer::Keyword;
use crate::sql::lexer::Lexer;
use crate::sql::lexer::Token;
use crate::sql::statement_type;
use crate::sql::ParseError;
use crate::sql::StatementKind;

type Result<T> = std::result::Result<T, ParseError>;

/// Parses any statement into its AST.
pub fn parse(text: &str) -> Result<Statement> {
    match statement_type(text) {
        StatementKind::Select => parse_select(text).map(Statement::Select),
        StatementKind::Update => parse_update(text).map(Statement::Update),
        StatementKind::Delete => parse_delete(text).map(Statement::Delete),
        StatementKind::ShowTables => {
            let mut parser = Parser::new(text)?;
            parser.expect_keyword(Keyword::Show)?;
            parser.expect_keyword(Keyword::Tables)?;
            parser.expect_end()?;
            Ok(Statement::ShowTables)
        }
        StatementKind::ShowCreateTable => parse_show_create_table(text).map(Statement::ShowCreateTable),
        StatementKind::Refresh => Ok(Statement::Refresh),
        kind => Ok(Statement::Passthrough {
            kind,
            table: target_table(text, kind),
            text: text.trim().to_owned(),
        }),
    }
}

pub fn parse_select(text: &str) -> Result<SelectStatement> {
    Parser::new(text)?.select()
}

pub fn parse_update(text: &str) -> Result<UpdateStatement> {
    Parser::new(text)?.update()
}

pub fn parse_delete(text: &str) -> Result<DeleteStatement> {
    Parser::new(text)?.delete()
}

/// Table name of `SHOW CREATE TABLE <name>`.
pub fn parse_show_create_table(text: &str) -> Result<String> {
    let mut parser = Parser::new(text)?;
    parser.expect_keyword(Keyword::Show)?;
    parser.expect_keyword(Keyword::Create)?;
    parser.expect_keyword(Keyword::Table)?;
    let name = parser.identifier("table name")?;
    parser.expect_end()?;
    Ok(name)
}

/// Best-effort target of INSERT INTO / CREATE TABLE / ALTER TABLE.
fn target_table(text: &str, kind: StatementKind) -> Option<String> {
    let tokens = Lexer::tokenize(text).ok()?;
    match kind {
        StatementKind::Insert | StatementKind::CreateTable | StatementKind::AlterTable => {
            tokens.get(2).and_then(Token::ident).map(str::to_owned)
        }
        _ => None,
    }
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Result<Self> {
        Ok(Self {
            text,
            tokens: Lexer::tokenize(text)?,
            position: 0,
        })
    }

    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.text, reason)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn next_if_token(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn next_if_keyword(&mut self, keyword: Keyword) -> bool {
        self.next_if_token(&Token::Keyword(keyword))
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        match self.next() {
            Some(Token::Keyword(found)) if found == keyword => Ok(()),
            Some(token) => Err(self.error(format!("expected {}, found {}", keyword.as_str(), token))),
            None => Err(self.error(format!("expected {}, found end of statement", keyword.as_str()))),
        }
    }

    fn expect_token(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {expected}, found {token}"))),
            None => Err(self.error(format!("expected {expected}, found end of statement"))),
        }
    }

    /// Accepts an optional trailing semicolon, then requires the end.
    fn expect_end(&mut self) -> Result<()> {
        self.next_if_token(&Token::Semicolon);
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected {token}"))),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String> {
        match self.next() {
            Some(Token::Ident(name)) | Some(Token::QuotedIdent(name)) => Ok(name),
            Some(token) => Err(self.error(format!("expected {what}, found {token}"))),
            None => Err(self.error(format!("expected {what}, found end of statement"))),
        }
    }

    fn select(&mut self) -> Result<SelectStatement> {
        self.expect_keyword(Keyword::Select)?;
        let distinct = self.next_if_keyword(Keyword::Distinct);

        let mut columns = vec![self.select_item()?];
        while self.next_if_token(&Token::Comma) {
            columns.push(self.select_item()?);
        }
        self.expect_keyword(Keyword::From)?;
        let table_name = self.identifier("table name")?;

        let mut statement = SelectStatement {
            distinct,
            columns,
            table_name,
            joins: vec![],
            where_clause: None,
            group_by: vec![],
            having: vec![],
            order_by: vec![],
            limit: None,
        };

        while let Some(token) = self.next() {
            match token {
                Token::Semicolon => break,
                Token::Keyword(Keyword::Where) if statement.where_clause.is_none() => {
                    statement.where_clause = Some(self.expression()?);
                }
                Token::Keyword(Keyword::Join) => statement.joins.push(self.join(JoinKind::Inner)?),
                Token::Keyword(keyword @ (Keyword::Inner | Keyword::Left | Keyword::Right | Keyword::Full)) => {
                    let kind = match keyword {
                        Keyword::Left => JoinKind::Left,
                        Keyword::Right => JoinKind::Right,
                        Keyword::Full => JoinKind::Full,
                        _ => JoinKind::Inner,
                    };
                    if keyword != Keyword::Inner {
                        self.next_if_keyword(Keyword::Outer);
                    }
                    self.expect_keyword(Keyword::Join)?;
                    statement.joins.push(self.join(kind)?);
                }
                Token::Keyword(Keyword::Limit) => statement.limit = Some(self.limit()?),
                Token::Keyword(Keyword::Order) => {
                    self.expect_keyword(Keyword::By)?;
                    statement.order_by = self.clause_tokens();
                }
                Token::Keyword(Keyword::Group) => {
                    self.expect_keyword(Keyword::By)?;
                    statement.group_by = self.clause_tokens();
                }
                Token::Keyword(Keyword::Having) => statement.having = self.clause_tokens(),
                token => Err(self.error(format!("unexpected {token}")))?,
            }
        }
        self.expect_end()?;
        Ok(statement)
    }

    /// Raw tokens of one projection item, classified into a [`SelectItem`].
    fn select_item(&mut self) -> Result<SelectItem> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::Comma | Token::Keyword(Keyword::From) if depth == 0 => break,
                Token::OpenParen => depth += 1,
                Token::CloseParen => depth = depth.saturating_sub(1),
                _ => (),
            }
            if let Some(token) = self.next() {
                tokens.push(token);
            }
        }

        let (tokens, alias) = match tokens.as_slice() {
            [rest @ .., Token::Keyword(Keyword::As), alias] if !rest.is_empty() => match alias.ident() {
                Some(name) => (rest.to_vec(), Some(name.to_owned())),
                None => match alias {
                    Token::String(name) => (rest.to_vec(), Some(name.to_owned())),
                    _ => Err(self.error(format!("invalid alias {alias}")))?,
                },
            },
            _ => (tokens, None),
        };

        Ok(match tokens.as_slice() {
            [] => Err(self.error("expected column"))?,
            [Token::Asterisk] if alias.is_none() => SelectItem::Wildcard,
            [table, Token::Period, Token::Asterisk] if alias.is_none() && table.ident().is_some() => {
                SelectItem::QualifiedWildcard(table.ident().unwrap_or_default().to_owned())
            }
            [column] if column.ident().is_some() => SelectItem::Column {
                column: ColumnRef::new(None, column.ident().unwrap_or_default()),
                alias,
            },
            [table, Token::Period, column] if table.ident().is_some() && column.ident().is_some() => SelectItem::Column {
                column: ColumnRef::new(table.ident(), column.ident().unwrap_or_default()),
                alias,
            },
            [Token::Ident(function), Token::OpenParen, Token::Asterisk, Token::CloseParen]
                if function.eq_ignore_ascii_case("COUNT") =>
            {
                SelectItem::CountAll { alias }
            }
            _ => SelectItem::Expression { tokens, alias },
        })
    }

    fn join(&mut self, kind: JoinKind) -> Result<Join> {
        let table = self.identifier("joined table name")?;
        self.expect_keyword(Keyword::On)?;
        let condition = self.expression()?;
        Ok(Join { kind, table, condition })
    }

    fn limit(&mut self) -> Result<usize> {
        match self.next() {
            Some(Token::Number(number)) => number
                .parse::<usize>()
                .map_err(|_| self.error(format!("invalid LIMIT {number}"))),
            Some(token) => Err(self.error(format!("expected LIMIT count, found {token}"))),
            None => Err(self.error("expected LIMIT count")),
        }
    }

    /// Tokens up to the next top-level clause keyword.
    fn clause_tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::Keyword(Keyword::Limit | Keyword::Order | Keyword::Group | Keyword::Having | Keyword::Where)
                | Token::Semicolon
                    if depth == 0 =>
                {
                    break
                }
                Token::OpenParen => depth += 1,
                Token::CloseParen => depth = depth.saturating_sub(1),
                _ => (),
            }
            if let Some(token) = self.next() {
                tokens.push(token);
            }
        }
        tokens
    }

    fn update(&mut self) -> Result<UpdateStatement> {
        self.expect_keyword(Keyword::Update)?;
        let table_name = self.identifier("table name")?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let mut column = self.identifier("column name")?;
            if self.next_if_token(&Token::Period) {
                column = self.identifier("column name")?;
            }
            self.expect_token(Token::Equal)?;
            let value = self.literal()?;
            assignments.push((column, value));
            if !self.next_if_token(&Token::Comma) {
                break;
            }
        }

        let where_clause = match self.next_if_keyword(Keyword::Where) {
            true => Some(self.expression()?),
            false => None,
        };
        self.expect_end()?;
        Ok(UpdateStatement {
            table_name,
            assignments,
            where_clause,
        })
    }

    fn delete(&mut self) -> Result<DeleteStatement> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table_name = self.identifier("table name")?;
        let where_clause = match self.next_if_keyword(Keyword::Where) {
            true => Some(self.expression()?),
            false => None,
        };
        self.expect_end()?;
        Ok(DeleteStatement {
            table_name,
            where_clause,
        })
    }

    /// A constant: number (optionally negative), string, NULL, TRUE or FALSE.
    fn literal(&mut self) -> Result<Value> {
        let negative = self.next_if_token(&Token::Minus);
        match self.next() {
            Some(Token::Number(number)) => {
                let value = self.number(&number)?;
                Ok(match (negative, value) {
                    (true, Value::Int(value)) => Value::Int(-value),
                    (true, Value::Float(value)) => Value::Float(-value),
                    (_, value) => value,
                })
            }
            Some(Token::String(text)) if !negative => Ok(Value::Text(text)),
            Some(Token::Keyword(Keyword::Null)) if !negative => Ok(Value::Null),
            Some(Token::Keyword(Keyword::True)) if !negative => Ok(Value::Bool(true)),
            Some(Token::Keyword(Keyword::False)) if !negative => Ok(Value::Bool(false)),
            Some(token) => Err(self.error(format!("expected literal, found {token}"))),
            None => Err(self.error("expected literal, found end of statement")),
        }
    }

    fn number(&self, number: &str) -> Result<Value> {
        if let Ok(value) = number.parse::<i64>() {
            return Ok(Value::Int(value));
        }
        number
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| self.error(format!("invalid number {number}")))
    }

    fn expression(&mut self) -> Result<Expr> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr = self.and()?;
        while self.next_if_keyword(Keyword::Or) {
            expr = Expr::binary(expr, BinaryOperator::Or, self.and()?);
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr = self.not()?;
        while self.next_if_keyword(Keyword::And) {
            expr = Expr::binary(expr, BinaryOperator::And, self.not()?);
        }
        Ok(expr)
    }

    fn not(&mut self) -> Result<Expr> {
        if self.next_if_keyword(Keyword::Not) {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.additive()?;
        let op = match self.peek() {
            Some(Token::Equal) => Some(BinaryOperator::Equal),
            Some(Token::NotEqual) => Some(BinaryOperator::NotEqual),
            Some(Token::LessThan) => Some(BinaryOperator::LessThan),
            Some(Token::LessOrEqual) => Some(BinaryOperator::LessOrEqual),
            Some(Token::GreaterThan) => Some(BinaryOperator::GreaterThan),
            Some(Token::GreaterOrEqual) => Some(BinaryOperator::GreaterOrEqual),
            _ => None,
        };
        if let Some(op) = op {
            self.position += 1;
            return Ok(Expr::binary(left, op, self.additive()?));
        }

        if self.next_if_keyword(Keyword::Is) {
            let negated = self.next_if_keyword(Keyword::Not);
            self.expect_keyword(Keyword::Null)?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        let negated = match (self.peek(), self.peek_nth(1)) {
            (Some(Token::Keyword(Keyword::Not)), Some(Token::Keyword(Keyword::Like | Keyword::In))) => {
                self.position += 1;
                true
            }
            _ => false,
        };
        if self.next_if_keyword(Keyword::Like) {
            return Ok(Expr::Like {
                expr: Box::new(left),
                pattern: Box::new(self.additive()?),
                negated,
            });
        }
        if self.next_if_keyword(Keyword::In) {
            self.expect_token(Token::OpenParen)?;
            let mut list = vec![self.expression()?];
            while self.next_if_token(&Token::Comma) {
                list.push(self.expression()?);
            }
            self.expect_token(Token::CloseParen)?;
            return Ok(Expr::InList {
                expr: Box::new(left),
                list,
                negated,
            });
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut expr = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOperator::Plus,
                Some(Token::Minus) => BinaryOperator::Minus,
                _ => return Ok(expr),
            };
            self.position += 1;
            expr = Expr::binary(expr, op, self.multiplicative()?);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Asterisk) => BinaryOperator::Multiply,
                Some(Token::Slash) => BinaryOperator::Divide,
                Some(Token::Percent) => BinaryOperator::Modulo,
                _ => return Ok(expr),
            };
            self.position += 1;
            expr = Expr::binary(expr, op, self.unary()?);
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.next_if_token(&Token::Minus) {
            return Ok(match self.unary()? {
                Expr::Literal(Value::Int(value)) => Expr::Literal(Value::Int(-value)),
                Expr::Literal(Value::Float(value)) => Expr::Literal(Value::Float(-value)),
                expr => Expr::Negate(Box::new(expr)),
            });
        }
        if self.next_if_token(&Token::Plus) {
            return self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(number)) => Ok(Expr::Literal(self.number(&number)?)),
            Some(Token::String(text)) => Ok(Expr::Literal(Value::Text(text))),
            Some(Token::Keyword(Keyword::Null)) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Keyword(Keyword::True)) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::Keyword(Keyword::False)) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::OpenParen) => {
                let expr = self.expression()?;
                self.expect_token(Token::CloseParen)?;
                Ok(expr)
            }
            Some(Token::Ident(name)) | Some(Token::QuotedIdent(name)) => {
                if self.next_if_token(&Token::Period) {
                    let column = self.identifier("column name")?;
                    Ok(Expr::Column(ColumnRef::new(Some(&name), &column)))
                } else {
                    Ok(Expr::Column(ColumnRef::new(None, &name)))
                }
            }
            Some(token) => Err(self.error(format!("unexpected {token} in expression"))),
            None => Err(self.error("unexpected end of statement in expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Expr {
        Expr::Column(ColumnRef::new(None, name))
    }

    #[test]
    fn parse_simple_select() {
        let select = parse_select("SELECT * FROM Items WHERE Price > 10 LIMIT 5").unwrap();
        assert_eq!(select.columns, vec![SelectItem::Wildcard]);
        assert_eq!(select.table_name, "Items");
        assert_eq!(select.limit, Some(5));
        assert_eq!(
            select.where_clause,
            Some(Expr::binary(column("Price"), BinaryOperator::GreaterThan, Expr::Literal(Value::Int(10))))
        );
    }

    #[test]
    fn parse_clauses_in_any_order() {
        let select = parse_select("select name from Items limit 3 where id = 1;").unwrap();
        assert_eq!(select.limit, Some(3));
        assert!(select.where_clause.is_some());
    }

    #[test]
    fn parse_precedence() {
        let select = parse_select("SELECT * FROM t WHERE a = 1 OR b = 2 AND NOT c = 3").unwrap();
        let Some(Expr::Binary { op, right, .. }) = select.where_clause else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOperator::Or);
        assert!(matches!(*right, Expr::Binary { op: BinaryOperator::And, .. }));

        let select = parse_select("SELECT * FROM t WHERE a + 2 * 3 >= -4").unwrap();
        let Some(Expr::Binary { left, op, right }) = select.where_clause else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOperator::GreaterOrEqual);
        assert_eq!(*right, Expr::Literal(Value::Int(-4)));
        assert!(matches!(*left, Expr::Binary { op: BinaryOperator::Plus, .. }));
    }

    #[test]
    fn parse_predicates() {
        let select =
            parse_select("SELECT * FROM t WHERE name NOT LIKE 'a%' AND x IS NOT NULL AND y IN (1, 2) AND z NOT IN ('q')")
                .unwrap();
        let condition = select.where_clause.unwrap();
        let conjuncts = condition.conjuncts();
        assert!(matches!(conjuncts[0], Expr::Like { negated: true, .. }));
        assert!(matches!(conjuncts[1], Expr::IsNull { negated: true, .. }));
        assert!(matches!(conjuncts[2], Expr::InList { negated: false, list, .. } if list.len() == 2));
        assert!(matches!(conjuncts[3], Expr::InList { negated: true, .. }));
    }

    #[test]
    fn double_quotes_are_strings() {
        let select = parse_select("SELECT * FROM t WHERE Name = \"Widget\"").unwrap();
        assert_eq!(
            select.where_clause,
            Some(Expr::binary(column("Name"), BinaryOperator::Equal, Expr::Literal("Widget".into())))
        );
    }

    #[test]
    fn parse_projection_items() {
        let select = parse_select("SELECT DISTINCT a, t.b AS bee, COUNT(*), SUM(c) total, u.* FROM t").unwrap();
        assert!(select.distinct);
        assert_eq!(select.columns[0], SelectItem::Column { column: ColumnRef::new(None, "a"), alias: None });
        assert_eq!(
            select.columns[1],
            SelectItem::Column { column: ColumnRef::new(Some("t"), "b"), alias: Some("bee".to_owned()) }
        );
        assert_eq!(select.columns[2], SelectItem::CountAll { alias: None });
        assert!(matches!(select.columns[3], SelectItem::Expression { alias: None, .. }));
        assert_eq!(select.columns[4], SelectItem::QualifiedWildcard("u".to_owned()));
    }

    #[test]
    fn parse_joins() {
        let select = parse_select(
            "SELECT * FROM Orders o_unused JOIN Users ON Orders.user_id = Users.id",
        );
        assert!(select.is_err());

        let select = parse_select(
            "SELECT * FROM Orders LEFT OUTER JOIN Users ON Orders.user_id = Users.id JOIN Items ON Orders.item = Items.id",
        )
        .unwrap();
        assert_eq!(select.joins.len(), 2);
        assert_eq!(select.joins[0].kind, JoinKind::Left);
        assert_eq!(select.joins[0].table, "Users");
        assert_eq!(select.joins[1].kind, JoinKind::Inner);
    }

    #[test]
    fn keeps_order_and_group_tokens() {
        let select = parse_select("SELECT Name, COUNT(*) FROM t GROUP BY Name ORDER BY Name DESC LIMIT 2").unwrap();
        assert_eq!(select.group_by, vec![Token::Ident("Name".to_owned())]);
        assert_eq!(select.order_by.len(), 2);
        assert_eq!(select.limit, Some(2));
        assert_eq!(
            select.to_sql(),
            "SELECT \"Name\", COUNT(*) AS \"COUNT(*)\" FROM \"t\" GROUP BY \"Name\" ORDER BY \"Name\" DESC LIMIT 2"
        );
    }

    #[test]
    fn parse_update_and_delete() {
        let update = parse_update("UPDATE Items SET Price = 12.5, Name = 'New', Stock = -3 WHERE ID = 1").unwrap();
        assert_eq!(update.table_name, "Items");
        assert_eq!(update.assignments, vec![
            ("Price".to_owned(), Value::Float(12.5)),
            ("Name".to_owned(), Value::Text("New".to_owned())),
            ("Stock".to_owned(), Value::Int(-3)),
        ]);
        assert!(update.where_clause.is_some());

        let delete = parse_delete("DELETE FROM Items;").unwrap();
        assert_eq!(delete.table_name, "Items");
        assert_eq!(delete.where_clause, None);
    }

    #[test]
    fn parse_errors_name_the_statement() {
        let error = parse_select("SELECT * FROM").unwrap_err();
        assert_eq!(error.statement, "SELECT * FROM");
        assert!(parse_select("SELECT * FROM t WHERE (a = 1").is_err());
        assert!(parse_select("SELECT * FROM t LIMIT x").is_err());
        assert!(parse_update("UPDATE t SET a = b").is_err());
        assert!(parse_delete("DELETE t").is_err());
    }

    #[test]
    fn parse_dispatch() {
        assert_eq!(parse("show tables").unwrap(), Statement::ShowTables);
        assert_eq!(parse("SHOW CREATE TABLE Items;").unwrap(), Statement::ShowCreateTable("Items".to_owned()));
        assert_eq!(parse("REFRESH").unwrap(), Statement::Refresh);
        assert_eq!(
            parse("INSERT INTO Items VALUES (1)").unwrap(),
            Statement::Passthrough {
                kind: StatementKind::Insert,
                table: Some("Items".to_owned()),
                text: "INSERT INTO Items VALUES (1)".to_owned(),
            }
        );
    }
}
