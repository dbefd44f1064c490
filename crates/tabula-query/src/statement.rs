//! Statement parsing.
//!
//! Supported statements:
//! - `SELECT <fields> FROM <table> [alias] [[INNER|LEFT|RIGHT|FULL] [OUTER] JOIN <table> [alias] ON a.k = b.k]
//!   [WHERE ..] [GROUP BY f] [HAVING ..] [ORDER BY f [ASC|DESC]] [LIMIT n] [OFFSET n]`
//! - `INSERT INTO <table> [?]` with record parameters, or
//!   `INSERT INTO <table> (c, ..) VALUES (v, ..), ..`
//! - `UPDATE <table> SET f = v, .. WHERE ..`
//! - `DELETE FROM <table> [WHERE ..]`

use sqlparser::tokenizer::Token;
use tabula_types::Record;

use crate::aggregate::AggregateFunc;
use crate::clause::{field_ref, parse_clause, split_commas};
use crate::error::{QueryError, Result};
use crate::lexer::{identifier, is_keyword, render, stored_literal, tokenize};
use crate::params::{bind, records_from, Param};
use crate::predicate::Predicate;

// ============================================================================
// Parsed Statement Types
// ============================================================================

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    /// The table the statement reads from or writes to.
    pub fn table(&self) -> &str {
        match self {
            Statement::Select(s) => &s.from.name,
            Statement::Insert(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }

    /// Returns true for statements that do not modify the store.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Statement::Select(_))
    }
}

/// Parsed SELECT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub fields: Vec<SelectField>,
    pub from: TableRef,
    pub join: Option<JoinSpec>,
    pub filter: Option<Predicate>,
    pub group_by: Option<String>,
    pub having: Option<Predicate>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SelectStatement {
    /// Returns true if any selected field is an aggregate.
    pub fn has_aggregates(&self) -> bool {
        self.fields
            .iter()
            .any(|field| matches!(field, SelectField::Aggregate { .. }))
    }
}

/// One entry of a SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectField {
    /// `*`
    Wildcard,
    /// `field [AS alias]`
    Field { name: String, alias: Option<String> },
    /// `FUNC(arg) [AS alias]`
    Aggregate {
        func: AggregateFunc,
        arg: String,
        alias: Option<String>,
    },
}

impl SelectField {
    /// The column this field is written under.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            SelectField::Wildcard => None,
            SelectField::Field { name, alias } => Some(alias.as_deref().unwrap_or(name)),
            SelectField::Aggregate { func, alias, .. } => {
                Some(alias.as_deref().unwrap_or(func.default_alias()))
            }
        }
    }
}

/// A table named in FROM or JOIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    /// The prefix joined fields carry: the alias, else the table name.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Join kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// Keeps left rows that match nothing.
    pub fn keeps_left(self) -> bool {
        matches!(self, JoinKind::Left | JoinKind::Full)
    }

    /// Keeps right rows that match nothing.
    pub fn keeps_right(self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Full)
    }
}

/// A single equi-join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub right: TableRef,
    /// Key field on the FROM table, unqualified.
    pub left_key: String,
    /// Key field on the joined table, unqualified.
    pub right_key: String,
}

/// ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// Parsed INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub records: Vec<Record>,
}

/// Parsed UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Record,
    pub filter: Predicate,
}

/// Parsed DELETE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub filter: Option<Predicate>,
}

// ============================================================================
// Parser
// ============================================================================

/// Keywords that end a SELECT clause.
const CLAUSE_KEYWORDS: &[&str] = &["where", "group", "having", "order", "limit", "offset"];

/// Keywords that cannot be a table alias.
const ALIAS_STOPWORDS: &[&str] = &[
    "where", "group", "having", "order", "limit", "offset", "join", "inner", "left", "right",
    "full", "outer", "on", "set", "values",
];

/// Parses statement text, binding placeholders to `params`.
pub fn parse_statement(sql: &str, params: &[Param]) -> Result<Statement> {
    let bound = bind(tokenize(sql)?, params)?;
    let mut parser = Parser::new(&bound.tokens);

    let statement = match bound.tokens.first() {
        Some(t) if is_keyword(t, "select") => Statement::Select(parser.select()?),
        Some(t) if is_keyword(t, "insert") => {
            let (table, records) = parser.insert()?;
            let records = match (records, bound.records) {
                (Some(values), _) => values,
                (None, Some(supplied)) => supplied,
                (None, None) if params.is_empty() => {
                    return Err(QueryError::malformed(
                        "INSERT requires VALUES or record parameters",
                    ));
                }
                (None, None) => records_from(params)?,
            };
            Statement::Insert(InsertStatement { table, records })
        }
        Some(t) if is_keyword(t, "update") => Statement::Update(parser.update()?),
        Some(t) if is_keyword(t, "delete") => Statement::Delete(parser.delete()?),
        Some(t) => {
            return Err(QueryError::malformed(format!(
                "unrecognized statement starting with '{t}'"
            )))
        }
        None => return Err(QueryError::malformed("empty statement")),
    };

    parser.finish()?;
    tracing::debug!(table = statement.table(), "statement parsed");
    Ok(statement)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn select(&mut self) -> Result<SelectStatement> {
        self.expect_keyword("select")?;
        let fields = self.select_fields()?;
        self.expect_keyword("from")?;
        let from = self.table_ref()?;
        let join = self.join(&from)?;

        let filter = self
            .clause_after(&["where"])?
            .map(parse_clause);
        let group_by = if self.eat_keywords(&["group", "by"]) {
            Some(self.field()?)
        } else {
            None
        };
        let having = self.clause_after(&["having"])?.map(parse_clause);
        let order_by = if self.eat_keywords(&["order", "by"]) {
            let field = self.field()?;
            let descending = if self.eat_keywords(&["desc"]) {
                true
            } else {
                self.eat_keywords(&["asc"]);
                false
            };
            Some(OrderBy { field, descending })
        } else {
            None
        };
        let limit = if self.eat_keywords(&["limit"]) {
            Some(self.count()?)
        } else {
            None
        };
        let offset = if self.eat_keywords(&["offset"]) {
            Some(self.count()?)
        } else {
            None
        };

        let mut select = SelectStatement {
            fields,
            from,
            join,
            filter,
            group_by,
            having,
            order_by,
            limit,
            offset,
        };
        resolve_aggregate_calls(&mut select)?;
        Ok(select)
    }

    /// Parses `INSERT INTO t [(cols) VALUES (..), ..]`.
    ///
    /// Returns the VALUES records, or `None` when they come from parameters.
    fn insert(&mut self) -> Result<(String, Option<Vec<Record>>)> {
        self.expect_keyword("insert")?;
        self.expect_keyword("into")?;
        let table = self.identifier()?;

        if self.at_end() {
            return Ok((table, None));
        }

        let columns = self.parenthesized()?;
        let columns = split_commas(columns)
            .into_iter()
            .map(|column| match column {
                [token] => identifier(token).map(str::to_string),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| QueryError::malformed("INSERT column list must name fields"))?;

        self.expect_keyword("values")?;
        let mut records = Vec::new();
        loop {
            let tuple = self.parenthesized()?;
            let values = split_commas(tuple)
                .into_iter()
                .map(|value| {
                    stored_literal(value).ok_or_else(|| {
                        QueryError::malformed(format!("invalid literal '{}'", render(value)))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            if values.len() != columns.len() {
                return Err(QueryError::malformed(format!(
                    "INSERT has {} columns but a row of {} values",
                    columns.len(),
                    values.len()
                )));
            }
            records.push(columns.iter().cloned().zip(values).collect());

            if !self.eat(&Token::Comma) {
                break;
            }
        }

        Ok((table, Some(records)))
    }

    fn update(&mut self) -> Result<UpdateStatement> {
        self.expect_keyword("update")?;
        let table = self.identifier()?;
        self.expect_keyword("set")?;

        let assignment_tokens = self.take_until(&["where"]);
        if assignment_tokens.is_empty() {
            return Err(QueryError::malformed("UPDATE requires at least one assignment"));
        }
        let mut assignments = Record::new();
        for assignment in split_commas(assignment_tokens) {
            let [field, Token::Eq, value @ ..] = assignment else {
                return Err(QueryError::malformed(format!(
                    "invalid assignment '{}'",
                    render(assignment)
                )));
            };
            let field = identifier(field)
                .ok_or_else(|| QueryError::malformed("assignment must name a field"))?;
            let value = stored_literal(value).ok_or_else(|| {
                QueryError::malformed(format!("invalid literal '{}'", render(value)))
            })?;
            assignments.insert(field, value);
        }

        let filter = self
            .clause_after(&["where"])?
            .map(parse_clause)
            .ok_or_else(|| QueryError::malformed("UPDATE requires a WHERE clause"))?;

        Ok(UpdateStatement {
            table,
            assignments,
            filter,
        })
    }

    fn delete(&mut self) -> Result<DeleteStatement> {
        self.expect_keyword("delete")?;
        self.expect_keyword("from")?;
        let table = self.identifier()?;
        let filter = self.clause_after(&["where"])?.map(parse_clause);
        Ok(DeleteStatement { table, filter })
    }

    /// Accepts an optional trailing `;` and requires nothing after it.
    fn finish(&mut self) -> Result<()> {
        self.eat(&Token::SemiColon);
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(QueryError::malformed(format!(
                "unexpected '{token}' at token {}",
                self.pos + 1
            ))),
        }
    }

    // ------------------------------------------------------------------------
    // SELECT pieces
    // ------------------------------------------------------------------------

    fn select_fields(&mut self) -> Result<Vec<SelectField>> {
        let mut fields = Vec::new();
        loop {
            fields.push(self.select_field()?);
            if !self.eat(&Token::Comma) {
                return Ok(fields);
            }
        }
    }

    fn select_field(&mut self) -> Result<SelectField> {
        if self.eat(&Token::Mul) {
            return Ok(SelectField::Wildcard);
        }

        let func = match self.tokens.get(self.pos..self.pos + 2) {
            Some([Token::Word(word), Token::LParen]) if word.quote_style.is_none() => {
                AggregateFunc::from_name(&word.value)
            }
            _ => None,
        };

        let field = if let Some(func) = func {
            self.pos += 2;
            let arg = if self.eat(&Token::Mul) {
                "*".to_string()
            } else {
                self.field()?
            };
            self.expect(&Token::RParen)?;
            SelectField::Aggregate {
                func,
                arg,
                alias: None,
            }
        } else {
            SelectField::Field {
                name: self.field()?,
                alias: None,
            }
        };

        let alias = if self.eat_keywords(&["as"]) {
            Some(self.identifier()?)
        } else {
            None
        };

        Ok(match field {
            SelectField::Aggregate { func, arg, .. } => SelectField::Aggregate { func, arg, alias },
            SelectField::Field { name, .. } => SelectField::Field { name, alias },
            SelectField::Wildcard => SelectField::Wildcard,
        })
    }

    fn table_ref(&mut self) -> Result<TableRef> {
        let name = self.identifier()?;
        let alias = if self.eat_keywords(&["as"]) {
            Some(self.identifier()?)
        } else {
            match self.peek() {
                Some(token @ Token::Word(_))
                    if !ALIAS_STOPWORDS.iter().any(|kw| is_keyword(token, kw)) =>
                {
                    Some(self.identifier()?)
                }
                _ => None,
            }
        };
        Ok(TableRef { name, alias })
    }

    fn join(&mut self, left: &TableRef) -> Result<Option<JoinSpec>> {
        let kind = if self.eat_keywords(&["join"]) || self.eat_keywords(&["inner", "join"]) {
            JoinKind::Inner
        } else if let Some(kind) = self.outer_join_kind() {
            self.eat_keywords(&["outer"]);
            self.expect_keyword("join")?;
            kind
        } else {
            return Ok(None);
        };

        let right = self.table_ref()?;
        self.expect_keyword("on")?;
        let first = self.qualified_field()?;
        if !(self.eat(&Token::Eq) || self.eat(&Token::DoubleEq)) {
            return Err(QueryError::malformed("JOIN condition must be an equality"));
        }
        let second = self.qualified_field()?;

        let (left_key, right_key) = order_join_keys(left, &right, first, second)?;
        tracing::trace!(?kind, left = %left.name, right = %right.name, "join parsed");
        Ok(Some(JoinSpec {
            kind,
            right,
            left_key,
            right_key,
        }))
    }

    fn outer_join_kind(&mut self) -> Option<JoinKind> {
        let kind = match self.peek() {
            Some(t) if is_keyword(t, "left") => JoinKind::Left,
            Some(t) if is_keyword(t, "right") => JoinKind::Right,
            Some(t) if is_keyword(t, "full") => JoinKind::Full,
            _ => return None,
        };
        self.pos += 1;
        Some(kind)
    }

    /// Reads `alias.field` or a bare `field`.
    fn qualified_field(&mut self) -> Result<(Option<String>, String)> {
        let first = self.identifier()?;
        if self.eat(&Token::Period) {
            Ok((Some(first), self.identifier()?))
        } else {
            Ok((None, first))
        }
    }

    /// Collects the clause introduced by `keywords`, if present.
    ///
    /// The clause runs to the next top-level SELECT clause keyword.
    fn clause_after(&mut self, keywords: &[&str]) -> Result<Option<&'t [Token]>> {
        if !self.eat_keywords(keywords) {
            return Ok(None);
        }
        let clause = self.take_until(CLAUSE_KEYWORDS);
        if clause.is_empty() {
            return Err(QueryError::malformed(format!(
                "{} clause is empty",
                keywords.join(" ").to_ascii_uppercase()
            )));
        }
        Ok(Some(clause))
    }

    // ------------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------------

    fn peek(&self) -> Option<&'t Token> {
        let tokens = self.tokens;
        tokens.get(self.pos)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::SemiColon))
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        let Some(window) = self.tokens.get(self.pos..self.pos + keywords.len()) else {
            return false;
        };
        if window
            .iter()
            .zip(keywords)
            .all(|(token, keyword)| is_keyword(token, keyword))
        {
            self.pos += keywords.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{expected}'")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keywords(&[keyword]) {
            Ok(())
        } else {
            Err(self.unexpected(&keyword.to_ascii_uppercase()))
        }
    }

    fn identifier(&mut self) -> Result<String> {
        match self.peek().and_then(identifier) {
            Some(name) => {
                self.pos += 1;
                Ok(name.to_string())
            }
            None => Err(self.unexpected("an identifier")),
        }
    }

    /// Reads a field reference (`name`, `alias.name`, or an aggregate call).
    fn field(&mut self) -> Result<String> {
        match field_ref(&self.tokens[self.pos..]) {
            Some((name, used)) => {
                self.pos += used;
                Ok(name)
            }
            None => Err(self.unexpected("a field name")),
        }
    }

    fn count(&mut self) -> Result<usize> {
        match self.peek() {
            Some(Token::Number(n, _)) => {
                let n = n
                    .parse::<usize>()
                    .map_err(|_| QueryError::malformed(format!("invalid row count '{n}'")))?;
                self.pos += 1;
                Ok(n)
            }
            _ => Err(self.unexpected("a row count")),
        }
    }

    /// Reads a parenthesized group, returning its contents.
    fn parenthesized(&mut self) -> Result<&'t [Token]> {
        self.expect(&Token::LParen)?;
        let tokens = self.tokens;
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen if depth == 0 => {
                    let inner = &tokens[start..self.pos];
                    self.pos += 1;
                    return Ok(inner);
                }
                Token::RParen => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.unexpected("')'"))
    }

    /// Consumes tokens up to a top-level stop keyword, `;`, or the end.
    fn take_until(&mut self, stops: &[&str]) -> &'t [Token] {
        let tokens = self.tokens;
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth = depth.saturating_sub(1),
                Token::SemiColon if depth == 0 => break,
                _ if depth == 0 && stops.iter().any(|kw| is_keyword(token, kw)) => break,
                _ => {}
            }
            self.pos += 1;
        }
        &tokens[start..self.pos]
    }

    fn unexpected(&self, wanted: &str) -> QueryError {
        match self.peek() {
            Some(token) => QueryError::malformed(format!("expected {wanted}, found '{token}'")),
            None => QueryError::malformed(format!("expected {wanted}, found end of statement")),
        }
    }
}

/// Points aggregate calls in HAVING and ORDER BY at the column the SELECT
/// list writes them under, so `SUM(v)` reads `total` for `SUM(v) AS total`.
///
/// A call that the SELECT list does not compute is malformed.
fn resolve_aggregate_calls(select: &mut SelectStatement) -> Result<()> {
    let calls: Vec<(String, String)> = select
        .fields
        .iter()
        .filter_map(|field| match field {
            SelectField::Aggregate { func, arg, .. } => {
                Some((func.call_name(arg), field.output_name()?.to_string()))
            }
            _ => None,
        })
        .collect();

    let resolve = |name: &mut String| -> Result<()> {
        if !name.ends_with(')') {
            return Ok(());
        }
        match calls.iter().find(|(call, _)| call.as_str() == name.as_str()) {
            Some((_, output)) => {
                name.clone_from(output);
                Ok(())
            }
            None => Err(QueryError::malformed(format!(
                "aggregate {name} is not in the SELECT list"
            ))),
        }
    };

    if let Some(having) = &mut select.having {
        for field in having.fields_mut() {
            resolve(field)?;
        }
    }
    if let Some(order) = &mut select.order_by {
        resolve(&mut order.field)?;
    }
    Ok(())
}

/// Assigns ON-clause keys to the FROM and JOIN tables.
///
/// Qualified keys are matched by alias (or table name), so the pair may be
/// written in either order. Unqualified keys are taken left then right.
fn order_join_keys(
    left: &TableRef,
    right: &TableRef,
    first: (Option<String>, String),
    second: (Option<String>, String),
) -> Result<(String, String)> {
    fn names(table: &TableRef, qualifier: &str) -> bool {
        qualifier == table.qualifier() || qualifier == table.name
    }
    match (first.0.as_deref(), second.0.as_deref()) {
        (Some(a), Some(b)) if names(left, a) && names(right, b) => Ok((first.1, second.1)),
        (Some(a), Some(b)) if names(right, a) && names(left, b) => Ok((second.1, first.1)),
        (None, None) => Ok((first.1, second.1)),
        _ => Err(QueryError::malformed(
            "JOIN keys must reference the joined tables",
        )),
    }
}
