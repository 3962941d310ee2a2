use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};

use crate::database::manager::DatabaseError;

/// Typed parameter value; the variant decides the SQL cast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(Option<i32>),
    VarChar(Option<String>),
}

impl SqlValue {
    fn cast(&self) -> &'static str {
        match self {
            SqlValue::Int(_) => "int4",
            SqlValue::VarChar(_) => "varchar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlParam {
    pub name: String,
    pub value: SqlValue,
}

/// Whether a procedure yields rows or reports an affected-row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureKind {
    Query,
    Command,
}

/// One invocation of a named stored procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProcedureCall {
    pub schema: String,
    pub name: String,
    pub kind: ProcedureKind,
    pub params: Vec<SqlParam>,
}

impl StoredProcedureCall {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, kind: ProcedureKind) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
            params: Vec::new(),
        }
    }

    pub fn input(mut self, name: impl Into<String>, value: SqlValue) -> Self {
        self.params.push(SqlParam { name: name.into(), value });
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", quote_identifier(&self.schema), quote_identifier(&self.name))
    }

    /// Named-notation invocation; parameters bind as `$1..$n` in order
    pub fn to_sql(&self) -> String {
        let args = self
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{} => ${}::{}", quote_identifier(&p.name), i + 1, p.value.cast()))
            .collect::<Vec<_>>()
            .join(", ");

        match self.kind {
            ProcedureKind::Query => format!(
                "SELECT row_to_json(t) AS row FROM {}({}) t",
                self.qualified_name(),
                args
            ),
            ProcedureKind::Command => format!(
                "SELECT ({}({}))::int8 AS rows_affected",
                self.qualified_name(),
                args
            ),
        }
    }
}

impl fmt::Display for StoredProcedureCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Quote SQL identifier to prevent injection
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// What a procedure execution produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureResult {
    pub recordsets: Vec<Vec<Value>>,
    pub rows_affected: Vec<u64>,
}

impl ProcedureResult {
    pub fn rows(rows: Vec<Value>) -> Self {
        let count = rows.len() as u64;
        Self {
            recordsets: vec![rows],
            rows_affected: vec![count],
        }
    }

    pub fn affected(count: u64) -> Self {
        Self {
            recordsets: Vec::new(),
            rows_affected: vec![count],
        }
    }
}

/// Executes stored procedures over a pooled connection
#[async_trait]
pub trait ProcedureExecutor: Send + Sync {
    async fn execute(&self, call: &StoredProcedureCall) -> Result<ProcedureResult, DatabaseError>;
}

pub struct PgProcedureExecutor {
    pool: PgPool,
}

impl PgProcedureExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcedureExecutor for PgProcedureExecutor {
    async fn execute(&self, call: &StoredProcedureCall) -> Result<ProcedureResult, DatabaseError> {
        let sql = call.to_sql();

        let mut query = sqlx::query(&sql);
        for param in &call.params {
            query = match &param.value {
                SqlValue::Int(v) => query.bind(*v),
                SqlValue::VarChar(v) => query.bind(v.clone()),
            };
        }

        match call.kind {
            ProcedureKind::Query => {
                let rows = query.fetch_all(&self.pool).await?;
                let rows = rows
                    .iter()
                    .map(|row| row.try_get::<Value, _>("row"))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ProcedureResult::rows(rows))
            }
            ProcedureKind::Command => {
                let row = query.fetch_one(&self.pool).await?;
                let affected: Option<i64> = row.try_get("rows_affected")?;
                Ok(ProcedureResult::affected(affected.unwrap_or(0).max(0) as u64))
            }
        }
    }
}
