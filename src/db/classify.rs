//! Statement shape classification.
//!
//! Uses sqlparser-rs to decide whether a statement yields a row set or only
//! an affected-row count. The classification never rejects SQL: text the
//! parser cannot read is reported as [`StatementShape::Unparsed`] and left for
//! the database to accept or reject.

use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, GenericDialect};
use sqlparser::parser::Parser;

/// What a statement hands back when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementShape {
    /// SELECT, WITH, VALUES, EXPLAIN, SHOW, PRAGMA, or DML with RETURNING.
    RowSet,
    /// INSERT/UPDATE/DELETE without RETURNING, DDL, and everything else.
    Mutation,
    /// The parser could not read the statement.
    Unparsed,
}

impl StatementShape {
    /// Returns true if the executor should fetch rows for this shape.
    pub fn fetches_rows(&self) -> bool {
        matches!(self, Self::RowSet | Self::Unparsed)
    }
}

/// Classifies SQL text by the shape of its result.
///
/// `dialect` should be the backend's own: forms such as SQLite's
/// `INSERT OR REPLACE` only parse there. Text it rejects is retried with the
/// generic dialect, which still knows `REPLACE INTO`. With several
/// statements, the text yields rows if any of them does.
pub fn classify_statement_shape(sql: &str, dialect: &dyn Dialect) -> StatementShape {
    let parsed = Parser::parse_sql(dialect, sql)
        .or_else(|_| Parser::parse_sql(&GenericDialect {}, sql));
    let Ok(statements) = parsed else {
        return StatementShape::Unparsed;
    };

    if statements.is_empty() {
        return StatementShape::Unparsed;
    }

    if statements.iter().any(yields_rows) {
        StatementShape::RowSet
    } else {
        StatementShape::Mutation
    }
}

fn yields_rows(statement: &Statement) -> bool {
    match statement {
        Statement::Query(_) => true,
        Statement::Explain { .. } | Statement::ExplainTable { .. } => true,
        Statement::Pragma { .. } => true,
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => true,

        Statement::Insert(insert) => insert.returning.is_some(),
        Statement::Update { returning, .. } => returning.is_some(),
        Statement::Delete(delete) => delete.returning.is_some(),

        _ => false,
    }
}
