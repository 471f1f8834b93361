//! Recursive-descent parser: token stream to abstract syntax tree.

pub mod ast;
#[cfg(test)]
mod tests;

use ast::*;
use common::{DbError, DbResult};
use expr::{BinaryOp, Expr};
use lexer::{Token, TokenKind, tokenize};
use types::{SqlType, Value};

/// Lex and parse `source` into a [`Program`] of statements.
pub fn parse(source: &str) -> DbResult<Program> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> DbError {
        let tok = self.current();
        DbError::Parser(tok.line, tok.column, msg.into())
    }

    fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn is_keyword(&self, kw: &str) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(k) if k == kw)
    }

    fn eat_keyword(&mut self, kw: &str) -> DbResult<()> {
        if self.is_keyword(kw) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{kw}'")))
        }
    }

    fn eat_optional_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> DbResult<()> {
        if &self.current().kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {kind:?}, found {:?}", self.current().kind)))
        }
    }

    fn eat_ident(&mut self) -> DbResult<String> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.err(format!("expected identifier, found {other:?}"))),
        }
    }

    // program := statement (';' statement)* ';'?
    fn parse_program(&mut self) -> DbResult<Program> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
            while matches!(self.current().kind, TokenKind::Semicolon) {
                self.advance();
            }
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> DbResult<Statement> {
        if self.is_keyword("CREATE") {
            self.parse_create_table()
        } else if self.is_keyword("INSERT") {
            self.parse_insert()
        } else if self.is_keyword("SELECT") {
            Ok(Statement::Select(self.parse_select()?))
        } else if self.is_keyword("DELETE") {
            self.parse_delete()
        } else if self.is_keyword("UPDATE") {
            self.parse_update()
        } else if self.is_keyword("DROP") {
            self.parse_drop_table()
        } else if self.is_keyword("BEGIN") {
            self.advance();
            self.eat_optional_keyword("TRANSACTION");
            Ok(Statement::Begin)
        } else if self.is_keyword("COMMIT") {
            self.advance();
            self.eat_optional_keyword("TRANSACTION");
            Ok(Statement::Commit)
        } else if self.is_keyword("ROLLBACK") {
            self.advance();
            self.eat_optional_keyword("TRANSACTION");
            Ok(Statement::Rollback)
        } else {
            Err(self.err(format!("unexpected token {:?}", self.current().kind)))
        }
    }

    // create_table := CREATE TABLE ident '(' col_def (',' col_def)* ')'
    fn parse_create_table(&mut self) -> DbResult<Statement> {
        self.eat_keyword("CREATE")?;
        self.eat_keyword("TABLE")?;
        let name = self.eat_ident()?;
        self.eat(&TokenKind::LParen)?;
        let mut columns = vec![self.parse_col_def()?];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.advance();
            columns.push(self.parse_col_def()?);
        }
        self.eat(&TokenKind::RParen)?;
        Ok(Statement::CreateTable { name, columns })
    }

    fn parse_col_def(&mut self) -> DbResult<ColumnDef> {
        let name = self.eat_ident()?;
        let ty = self.parse_type()?;
        Ok(ColumnDef { name, ty })
    }

    // type := INT | INTEGER | VARCHAR '(' integer ')' | CHAR '(' integer ')'
    //       | FLOAT | REAL | BOOLEAN   (superset; see DESIGN.md OQ-1)
    fn parse_type(&mut self) -> DbResult<SqlType> {
        let kw = match &self.current().kind {
            TokenKind::Keyword(k) => k.clone(),
            other => return Err(self.err(format!("expected a type name, found {other:?}"))),
        };
        self.advance();
        match kw.as_str() {
            "INT" | "INTEGER" => Ok(SqlType::Int),
            "FLOAT" | "REAL" => Ok(SqlType::Float),
            "BOOLEAN" => Ok(SqlType::Bool),
            "VARCHAR" | "CHAR" => {
                self.eat(&TokenKind::LParen)?;
                let n = self.eat_int()?;
                self.eat(&TokenKind::RParen)?;
                Ok(if kw == "CHAR" {
                    SqlType::Char(n as u32)
                } else {
                    SqlType::Varchar(n as u32)
                })
            }
            "TEXT" => Ok(SqlType::Varchar(u32::MAX)),
            other => Err(self.err(format!("unknown column type '{other}'"))),
        }
    }

    fn eat_int(&mut self) -> DbResult<i64> {
        match self.current().kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.err("expected an integer literal")),
        }
    }

    // insert := INSERT INTO ident ('(' ident (',' ident)* ')')? VALUES '(' literal (',' literal)* ')'
    fn parse_insert(&mut self) -> DbResult<Statement> {
        self.eat_keyword("INSERT")?;
        self.eat_keyword("INTO")?;
        let table = self.eat_ident()?;

        let columns = if matches!(self.current().kind, TokenKind::LParen) {
            self.advance();
            let mut cols = vec![self.eat_ident()?];
            while matches!(self.current().kind, TokenKind::Comma) {
                self.advance();
                cols.push(self.eat_ident()?);
            }
            self.eat(&TokenKind::RParen)?;
            Some(cols)
        } else {
            None
        };

        self.eat_keyword("VALUES")?;
        self.eat(&TokenKind::LParen)?;
        let mut values = vec![self.parse_literal()?];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.advance();
            values.push(self.parse_literal()?);
        }
        self.eat(&TokenKind::RParen)?;

        Ok(Statement::Insert {
            table,
            columns,
            values,
        })
    }

    fn parse_literal(&mut self) -> DbResult<Value> {
        match self.current().kind.clone() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Value::Int(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Value::Text(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Value::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Value::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Value::Null)
            }
            TokenKind::Minus => {
                self.advance();
                let n = self.eat_int()?;
                Ok(Value::Int(-n))
            }
            other => Err(self.err(format!("expected a literal, found {other:?}"))),
        }
    }

    // select := SELECT select_item (',' select_item)* FROM ident
    //           (join_clause)* (WHERE expr)? (ORDER BY sort_item (',' sort_item)*)?
    fn parse_select(&mut self) -> DbResult<SelectStmt> {
        self.eat_keyword("SELECT")?;
        let mut items = vec![self.parse_select_item()?];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.advance();
            items.push(self.parse_select_item()?);
        }
        self.eat_keyword("FROM")?;
        let from = self.eat_ident()?;

        let mut joins = Vec::new();
        while self.at_join_start() {
            joins.push(self.parse_join_clause()?);
        }

        let where_clause = if self.eat_optional_keyword("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.is_keyword("ORDER") {
            self.advance();
            self.eat_keyword("BY")?;
            order_by.push(self.parse_sort_item()?);
            while matches!(self.current().kind, TokenKind::Comma) {
                self.advance();
                order_by.push(self.parse_sort_item()?);
            }
        }

        Ok(SelectStmt {
            items,
            from,
            joins,
            where_clause,
            order_by,
        })
    }

    // select_item := '*' | ident | aggregate_call
    fn parse_select_item(&mut self) -> DbResult<SelectItem> {
        if matches!(self.current().kind, TokenKind::Star) {
            self.advance();
            return Ok(SelectItem::Star);
        }
        if self.at_aggregate_start() {
            return Ok(SelectItem::Aggregate(self.parse_aggregate_call()?));
        }
        let name = self.eat_ident()?;
        if matches!(self.current().kind, TokenKind::Dot) {
            self.advance();
            let field = self.eat_ident()?;
            return Ok(SelectItem::Column(format!("{name}.{field}")));
        }
        Ok(SelectItem::Column(name))
    }

    fn at_aggregate_start(&self) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(k)
            if matches!(k.as_str(), "COUNT" | "SUM" | "AVG" | "MAX" | "MIN"))
    }

    // aggregate_call := (COUNT|SUM|AVG|MAX|MIN) '(' (DISTINCT)? (expr | '*') ')'
    fn parse_aggregate_call(&mut self) -> DbResult<AggregateCall> {
        let func = match &self.current().kind {
            TokenKind::Keyword(k) => match k.as_str() {
                "COUNT" => AggregateFunc::Count,
                "SUM" => AggregateFunc::Sum,
                "AVG" => AggregateFunc::Avg,
                "MAX" => AggregateFunc::Max,
                "MIN" => AggregateFunc::Min,
                other => return Err(self.err(format!("'{other}' is not an aggregate function"))),
            },
            other => return Err(self.err(format!("expected an aggregate function, found {other:?}"))),
        };
        self.advance();
        self.eat(&TokenKind::LParen)?;
        let distinct = self.eat_optional_keyword("DISTINCT");
        let arg = if matches!(self.current().kind, TokenKind::Star) {
            self.advance();
            AggregateArg::Star
        } else {
            AggregateArg::Expr(self.parse_expr()?)
        };
        self.eat(&TokenKind::RParen)?;
        Ok(AggregateCall { func, distinct, arg })
    }

    fn at_join_start(&self) -> bool {
        self.is_keyword("JOIN")
            || self.is_keyword("INNER")
            || self.is_keyword("LEFT")
            || self.is_keyword("RIGHT")
            || self.is_keyword("FULL")
    }

    // join_clause := (INNER|LEFT|RIGHT|FULL)? JOIN ident ON expr
    fn parse_join_clause(&mut self) -> DbResult<JoinClause> {
        let kind = if self.eat_optional_keyword("INNER") {
            JoinKind::Inner
        } else if self.eat_optional_keyword("LEFT") {
            self.eat_optional_keyword("OUTER");
            JoinKind::Left
        } else if self.eat_optional_keyword("RIGHT") {
            self.eat_optional_keyword("OUTER");
            JoinKind::Right
        } else if self.eat_optional_keyword("FULL") {
            self.eat_optional_keyword("OUTER");
            JoinKind::Full
        } else {
            JoinKind::Inner
        };
        self.eat_keyword("JOIN")?;
        let table = self.eat_ident()?;
        self.eat_keyword("ON")?;
        let condition = self.parse_expr()?;
        Ok(JoinClause { kind, table, condition })
    }

    // sort_item := expr (ASC|DESC)?
    fn parse_sort_item(&mut self) -> DbResult<SortItem> {
        let expr = self.parse_expr()?;
        let desc = if self.eat_optional_keyword("DESC") {
            true
        } else {
            self.eat_optional_keyword("ASC");
            false
        };
        Ok(SortItem { expr, desc })
    }

    // delete := DELETE FROM ident (WHERE expr)?
    fn parse_delete(&mut self) -> DbResult<Statement> {
        self.eat_keyword("DELETE")?;
        self.eat_keyword("FROM")?;
        let table = self.eat_ident()?;
        let condition = if self.eat_optional_keyword("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Statement::Delete { table, condition })
    }

    // update := UPDATE ident SET assignment (',' assignment)* (WHERE expr)?
    fn parse_update(&mut self) -> DbResult<Statement> {
        self.eat_keyword("UPDATE")?;
        let table = self.eat_ident()?;
        self.eat_keyword("SET")?;
        let mut assignments = vec![self.parse_assignment()?];
        while matches!(self.current().kind, TokenKind::Comma) {
            self.advance();
            assignments.push(self.parse_assignment()?);
        }
        let condition = if self.eat_optional_keyword("WHERE") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(Statement::Update {
            table,
            assignments,
            condition,
        })
    }

    // assignment := ident '=' expr
    fn parse_assignment(&mut self) -> DbResult<Assignment> {
        let column = self.eat_ident()?;
        self.eat(&TokenKind::Eq)?;
        let value = self.parse_expr()?;
        Ok(Assignment { column, value })
    }

    // drop_table := DROP TABLE ident
    fn parse_drop_table(&mut self) -> DbResult<Statement> {
        self.eat_keyword("DROP")?;
        self.eat_keyword("TABLE")?;
        let name = self.eat_ident()?;
        Ok(Statement::DropTable { name })
    }

    // expr := or_expr
    fn parse_expr(&mut self) -> DbResult<Expr> {
        self.parse_or_expr()
    }

    // or_expr := and_expr (OR and_expr)*
    fn parse_or_expr(&mut self) -> DbResult<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.eat_optional_keyword("OR") {
            let right = self.parse_and_expr()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // and_expr := cmp_expr (AND cmp_expr)*
    fn parse_and_expr(&mut self) -> DbResult<Expr> {
        let mut left = self.parse_cmp_expr()?;
        while self.eat_optional_keyword("AND") {
            let right = self.parse_cmp_expr()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // cmp_expr := primary (cmp_op primary)?
    fn parse_cmp_expr(&mut self) -> DbResult<Expr> {
        let left = self.parse_primary()?;
        if let Some(op) = self.peek_cmp_op() {
            self.advance();
            let right = self.parse_primary()?;
            return Ok(Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn peek_cmp_op(&self) -> Option<BinaryOp> {
        match self.current().kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        }
    }

    // primary := literal | ident ('.' ident)? | aggregate_call
    //
    // Aggregate calls are accepted here too (per the grammar) but in
    // practice only ever appear via select_item; see DESIGN.md.
    fn parse_primary(&mut self) -> DbResult<Expr> {
        if self.at_aggregate_start() {
            let agg = self.parse_aggregate_call()?;
            return Ok(Expr::Column {
                table: None,
                name: agg.label(),
            });
        }
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                if matches!(self.current().kind, TokenKind::Dot) {
                    self.advance();
                    let field = self.eat_ident()?;
                    Ok(Expr::Column {
                        table: Some(name),
                        name: field,
                    })
                } else {
                    Ok(Expr::Column { table: None, name })
                }
            }
            _ => Ok(Expr::Literal(self.parse_literal()?)),
        }
    }
}
