//! Common test utilities for integration tests
#![allow(dead_code)]

use spanql::{
    BoundParameter, ColumnType, Connection, DialectConfig, Error, ExecuteResult, Executor, Result,
    RowSet, TransactionOptions, WireValue,
};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// A table held by the in-memory executor
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub columns: Vec<(String, ColumnType)>,
    pub rows: Vec<BTreeMap<String, WireValue>>,
}

/// A statement as the executor received it
#[derive(Debug, Clone)]
pub struct Received {
    pub sql: String,
    pub params: Vec<BoundParameter>,
    pub options: TransactionOptions,
    pub partitioned: bool,
}

/// Executor that understands the narrow SQL the tests generate: `select *`,
/// multi-row inserts, and updates and deletes filtered by a conjunction of
/// comparisons against parameters. Enforces a mutation limit on direct
/// writes the way the backend does.
pub struct MemoryExecutor {
    pub mutation_limit: u64,
    pub tables: RefCell<BTreeMap<String, MemoryTable>>,
    pub received: RefCell<Vec<Received>>,
    pub ddl_batches: RefCell<Vec<Vec<String>>>,
}

impl MemoryExecutor {
    pub fn new(mutation_limit: u64) -> Self {
        Self {
            mutation_limit,
            tables: RefCell::new(BTreeMap::new()),
            received: RefCell::new(Vec::new()),
            ddl_batches: RefCell::new(Vec::new()),
        }
    }

    pub fn with_table(self, name: &str, columns: &[(&str, ColumnType)]) -> Self {
        self.tables.borrow_mut().insert(
            name.to_string(),
            MemoryTable {
                columns: columns
                    .iter()
                    .map(|(n, t)| (n.to_string(), t.clone()))
                    .collect(),
                rows: Vec::new(),
            },
        );
        self
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.borrow().get(table).map_or(0, |t| t.rows.len())
    }

    pub fn last(&self) -> Received {
        self.received
            .borrow()
            .last()
            .cloned()
            .expect("no statement received")
    }

    fn run(&self, sql: &str, params: &[BoundParameter], partitioned: bool) -> Result<ExecuteResult> {
        let mut parser = Parser::new(sql, params);
        let mut tables = self.tables.borrow_mut();

        match parser.word()?.as_str() {
            "select" => {
                parser.sym("*")?;
                parser.keyword("from")?;
                let name = parser.ident()?;
                let table = tables.get(&name).ok_or_else(|| missing(&name))?;
                let filter = parser.filter()?;
                let rows = table
                    .rows
                    .iter()
                    .filter(|row| filter.matches(row))
                    .map(|row| {
                        table
                            .columns
                            .iter()
                            .map(|(c, _)| row.get(c).cloned().unwrap_or_else(WireValue::null))
                            .collect()
                    })
                    .collect();
                Ok(ExecuteResult::Rows(RowSet {
                    columns: table.columns.clone(),
                    rows,
                }))
            }
            "insert" => {
                let mut word = parser.word()?;
                if word == "or" {
                    parser.word()?;
                    word = parser.word()?;
                }
                assert_eq!(word, "into");
                let name = parser.ident()?;
                parser.sym("(")?;
                let columns = parser.list(Parser::ident)?;
                parser.keyword("values")?;
                let mut rows = Vec::new();
                loop {
                    parser.sym("(")?;
                    let values = parser.list(Parser::param)?;
                    rows.push(columns.iter().cloned().zip(values).collect::<BTreeMap<_, _>>());
                    if !parser.eat_sym(",") {
                        break;
                    }
                }
                self.check_limit((rows.len() * columns.len()) as u64, partitioned)?;
                let table = tables.get_mut(&name).ok_or_else(|| missing(&name))?;
                let count = rows.len() as u64;
                table.rows.extend(rows);
                Ok(ExecuteResult::Affected(count))
            }
            "update" => {
                let name = parser.ident()?;
                parser.keyword("set")?;
                let mut set = Vec::new();
                loop {
                    let column = parser.ident()?;
                    parser.sym("=")?;
                    set.push((column, parser.param()?));
                    if !parser.eat_sym(",") {
                        break;
                    }
                }
                let filter = parser.filter()?;
                let table = tables.get_mut(&name).ok_or_else(|| missing(&name))?;
                let matched = table.rows.iter().filter(|row| filter.matches(row)).count() as u64;
                self.check_limit(matched * set.len() as u64, partitioned)?;
                for row in table.rows.iter_mut().filter(|row| filter.matches(row)) {
                    for (column, value) in &set {
                        row.insert(column.clone(), value.clone());
                    }
                }
                Ok(ExecuteResult::Affected(matched))
            }
            "delete" => {
                parser.keyword("from")?;
                let name = parser.ident()?;
                let filter = parser.filter()?;
                let table = tables.get_mut(&name).ok_or_else(|| missing(&name))?;
                let before = table.rows.len();
                let matched = table.rows.iter().filter(|row| filter.matches(row)).count() as u64;
                self.check_limit(matched * table.columns.len() as u64, partitioned)?;
                table.rows.retain(|row| !filter.matches(row));
                Ok(ExecuteResult::Affected((before - table.rows.len()) as u64))
            }
            other => Err(Error::Execution(format!("unsupported statement `{}`", other))),
        }
    }

    fn check_limit(&self, mutations: u64, partitioned: bool) -> Result<()> {
        if !partitioned && mutations > self.mutation_limit {
            return Err(Error::MutationLimitExceeded {
                predicted: None,
                budget: self.mutation_limit,
            });
        }
        Ok(())
    }
}

impl Executor for MemoryExecutor {
    fn execute(
        &self,
        sql: &str,
        params: &[BoundParameter],
        options: &TransactionOptions,
    ) -> Result<ExecuteResult> {
        self.received.borrow_mut().push(Received {
            sql: sql.to_string(),
            params: params.to_vec(),
            options: options.clone(),
            partitioned: false,
        });
        self.run(sql, params, false)
    }

    fn execute_ddl_batch(&self, statements: &[String]) -> Result<()> {
        self.ddl_batches.borrow_mut().push(statements.to_vec());
        Ok(())
    }

    fn execute_partitioned(&self, sql: &str, params: &[BoundParameter]) -> Result<u64> {
        self.received.borrow_mut().push(Received {
            sql: sql.to_string(),
            params: params.to_vec(),
            options: TransactionOptions::default(),
            partitioned: true,
        });
        match self.run(sql, params, true)? {
            ExecuteResult::Affected(count) => Ok(count),
            ExecuteResult::Rows(_) => Err(Error::Execution("partitioned query".into())),
        }
    }
}

fn missing(table: &str) -> Error {
    Error::Execution(format!("table `{}` not found", table))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Param(String),
    Word(String),
    Sym(String),
}

struct Comparison {
    column: String,
    op: String,
    value: WireValue,
}

/// A conjunction of comparisons; empty matches every row
struct Filter(Vec<Comparison>);

impl Filter {
    fn matches(&self, row: &BTreeMap<String, WireValue>) -> bool {
        self.0.iter().all(|cmp| {
            let Some(cell) = row.get(&cmp.column) else {
                return false;
            };
            let ordering = match (as_number(cell), as_number(&cmp.value)) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => (cell == &cmp.value).then_some(std::cmp::Ordering::Equal),
            };
            match cmp.op.as_str() {
                "=" => ordering == Some(std::cmp::Ordering::Equal),
                "!=" => ordering != Some(std::cmp::Ordering::Equal),
                "<" => ordering == Some(std::cmp::Ordering::Less),
                ">" => ordering == Some(std::cmp::Ordering::Greater),
                "<=" => matches!(ordering, Some(o) if o.is_le()),
                ">=" => matches!(ordering, Some(o) if o.is_ge()),
                op => panic!("unsupported comparison {}", op),
            }
        })
    }
}

// INT64 travels as a decimal string
fn as_number(value: &WireValue) -> Option<f64> {
    match value.as_json() {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse::<i64>().ok().map(|n| n as f64),
        _ => None,
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    params: &'a [BoundParameter],
}

impl<'a> Parser<'a> {
    fn new(sql: &str, params: &'a [BoundParameter]) -> Self {
        Self {
            tokens: tokenize(sql),
            pos: 0,
            params,
        }
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| Error::Execution("unexpected end of statement".into()))?;
        self.pos += 1;
        Ok(token)
    }

    fn word(&mut self) -> Result<String> {
        match self.next()? {
            Token::Word(w) => Ok(w),
            other => Err(unexpected(&other)),
        }
    }

    fn keyword(&mut self, expected: &str) -> Result<()> {
        let word = self.word()?;
        if word != expected {
            return Err(Error::Execution(format!("expected {}, found {}", expected, word)));
        }
        Ok(())
    }

    fn sym(&mut self, expected: &str) -> Result<()> {
        match self.next()? {
            Token::Sym(s) if s == expected => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    fn eat_sym(&mut self, expected: &str) -> bool {
        if self.tokens.get(self.pos) == Some(&Token::Sym(expected.to_string())) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn ident(&mut self) -> Result<String> {
        match self.next()? {
            Token::Ident(name) => Ok(name),
            other => Err(unexpected(&other)),
        }
    }

    fn param(&mut self) -> Result<WireValue> {
        match self.next()? {
            Token::Param(name) => self
                .params
                .iter()
                .find(|p| p.name == name)
                .map(|p| p.value.clone())
                .ok_or_else(|| Error::Execution(format!("unbound parameter @{}", name))),
            other => Err(unexpected(&other)),
        }
    }

    /// Items separated by commas up to a closing parenthesis
    fn list<T>(&mut self, item: fn(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut items = vec![item(self)?];
        while self.eat_sym(",") {
            items.push(item(self)?);
        }
        self.sym(")")?;
        Ok(items)
    }

    fn filter(&mut self) -> Result<Filter> {
        if self.pos >= self.tokens.len() {
            return Ok(Filter(Vec::new()));
        }
        self.keyword("where")?;
        if self.tokens.get(self.pos) == Some(&Token::Word("true".into())) {
            self.pos += 1;
            return Ok(Filter(Vec::new()));
        }
        let mut comparisons = Vec::new();
        loop {
            let column = self.ident()?;
            let op = match self.next()? {
                Token::Sym(op) => op,
                other => return Err(unexpected(&other)),
            };
            let value = self.param()?;
            comparisons.push(Comparison { column, op, value });
            if self.tokens.get(self.pos) != Some(&Token::Word("and".into())) {
                break;
            }
            self.pos += 1;
        }
        Ok(Filter(comparisons))
    }
}

fn unexpected(token: &Token) -> Error {
    Error::Execution(format!("unexpected token {:?}", token))
}

fn tokenize(sql: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '`' => {
                let name: String = chars.by_ref().take_while(|&c| c != '`').collect();
                tokens.push(Token::Ident(name));
            }
            '@' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek().filter(|c| c.is_alphanumeric()) {
                    name.push(c);
                    chars.next();
                }
                tokens.push(Token::Param(name));
            }
            '!' | '<' | '>' => {
                let mut op = c.to_string();
                if chars.peek() == Some(&'=') {
                    op.push('=');
                    chars.next();
                }
                tokens.push(Token::Sym(op));
            }
            c if c.is_alphabetic() => {
                let mut word = c.to_string();
                while let Some(&c) = chars.peek().filter(|c| c.is_alphanumeric() || **c == '_') {
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
            c => tokens.push(Token::Sym(c.to_string())),
        }
    }
    tokens
}

/// `User(id INT64, name STRING(255), age INT64)` behind a connection
pub fn user_connection(mutation_limit: u64) -> Connection<MemoryExecutor> {
    let executor = MemoryExecutor::new(mutation_limit).with_table(
        "User",
        &[
            ("id", ColumnType::Int64),
            ("name", ColumnType::String(spanql::Length::bounded(255).unwrap())),
            ("age", ColumnType::Int64),
        ],
    );
    Connection::new(
        executor,
        DialectConfig::default().with_mutation_budget(mutation_limit),
    )
}
