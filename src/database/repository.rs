use std::sync::Arc;

use tracing::{Instrument, Span};

use crate::config::DatabaseConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{DefaultPayload, DefaultRecord};
use crate::database::procedure::{
    ProcedureExecutor, ProcedureKind, ProcedureResult, SqlValue, StoredProcedureCall,
};

/// Stored procedures backing the defaults resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureNames {
    pub schema: String,
    pub read: String,
    pub write: String,
}

impl From<&DatabaseConfig> for ProcedureNames {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            schema: config.schema.clone(),
            read: config.read_procedure.clone(),
            write: config.write_procedure.clone(),
        }
    }
}

/// Maps each CRUD intent onto one stored-procedure call.
///
/// Driver failures are logged and absorbed: reads come back empty and writes
/// report `false`, exactly like a call that matched no rows. Rows that don't
/// decode as a record are logged and skipped.
pub struct DefaultRepository {
    executor: Arc<dyn ProcedureExecutor>,
    procedures: ProcedureNames,
    span: Span,
}

impl DefaultRepository {
    pub fn new(executor: Arc<dyn ProcedureExecutor>, procedures: ProcedureNames, span: Span) -> Self {
        Self {
            executor,
            procedures,
            span,
        }
    }

    pub async fn list(&self, user_id: i32) -> Vec<DefaultRecord> {
        let call = self
            .read_call()
            .input("user_id", SqlValue::Int(Some(user_id)));

        let Some(result) = self.run(&call).await else {
            return Vec::new();
        };

        let rows = result.recordsets.into_iter().next().unwrap_or_default();
        rows.into_iter()
            .filter_map(|row| match serde_json::from_value::<DefaultRecord>(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    let error = DatabaseError::from(e);
                    self.span.in_scope(|| {
                        tracing::warn!(procedure = %call, error = %error, "skipping row with unexpected shape")
                    });
                    None
                }
            })
            .collect()
    }

    pub async fn create(&self, data: &DefaultPayload, user_id: i32) -> bool {
        let call = self
            .write_call()
            .input("user_id", SqlValue::Int(Some(user_id)))
            .input("data_name", SqlValue::VarChar(data.name.clone()));

        Self::affected_any(self.run(&call).await)
    }

    pub async fn update(&self, id: i32, data: &DefaultPayload, user_id: i32) -> bool {
        let call = self
            .write_call()
            .input("user_id", SqlValue::Int(Some(user_id)))
            .input("id", SqlValue::Int(Some(id)))
            .input("data_name", SqlValue::VarChar(data.name.clone()));

        Self::affected_any(self.run(&call).await)
    }

    pub async fn delete(&self, id: i32, user_id: i32) -> bool {
        let call = self
            .write_call()
            .input("user_id", SqlValue::Int(Some(user_id)))
            .input("id", SqlValue::Int(Some(id)));

        Self::affected_any(self.run(&call).await)
    }

    fn read_call(&self) -> StoredProcedureCall {
        StoredProcedureCall::new(&self.procedures.schema, &self.procedures.read, ProcedureKind::Query)
    }

    fn write_call(&self) -> StoredProcedureCall {
        StoredProcedureCall::new(&self.procedures.schema, &self.procedures.write, ProcedureKind::Command)
    }

    async fn run(&self, call: &StoredProcedureCall) -> Option<ProcedureResult> {
        async {
            match self.executor.execute(call).await {
                Ok(result) => {
                    tracing::debug!(procedure = %call, rows_affected = ?result.rows_affected, "executed sql procedure");
                    Some(result)
                }
                Err(e) => {
                    tracing::error!(procedure = %call, error = %e, "error while executing sql procedure");
                    None
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }

    fn affected_any(result: Option<ProcedureResult>) -> bool {
        result
            .and_then(|r| r.rows_affected.first().copied())
            .is_some_and(|n| n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeExecutor;
    use serde_json::json;

    fn names() -> ProcedureNames {
        ProcedureNames {
            schema: "dbo".to_string(),
            read: "default_list".to_string(),
            write: "default_save".to_string(),
        }
    }

    fn repository(executor: &Arc<FakeExecutor>) -> DefaultRepository {
        DefaultRepository::new(executor.clone(), names(), Span::none())
    }

    fn payload(name: &str) -> DefaultPayload {
        DefaultPayload { name: Some(name.to_string()) }
    }

    #[tokio::test]
    async fn list_binds_user_and_returns_first_recordset() {
        let executor = Arc::new(FakeExecutor::new());
        executor.push_ok(ProcedureResult {
            recordsets: vec![
                vec![json!({ "id": 1, "user_id": 7, "name": "a" })],
                vec![json!({ "ignored": true })],
            ],
            rows_affected: vec![1],
        });

        let records = repository(&executor).list(7).await;
        assert_eq!(records, vec![DefaultRecord { id: 1, user_id: 7, name: "a".into() }]);

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "default_list");
        assert_eq!(calls[0].kind, ProcedureKind::Query);
        assert_eq!(calls[0].params[0].value, SqlValue::Int(Some(7)));
    }

    #[tokio::test]
    async fn list_absorbs_driver_failure_into_empty() {
        let executor = Arc::new(FakeExecutor::new());
        executor.push_err("connection reset");
        assert!(repository(&executor).list(7).await.is_empty());

        executor.push_ok(ProcedureResult::default());
        assert!(repository(&executor).list(7).await.is_empty());
    }

    #[tokio::test]
    async fn list_skips_rows_that_do_not_decode() {
        let executor = Arc::new(FakeExecutor::new());
        executor.push_ok(ProcedureResult::rows(vec![
            json!({ "id": 1, "user_id": 7, "name": "theme" }),
            json!({ "id": 2, "user_id": 7, "name": null }),
            json!({ "unexpected": 1 }),
            json!({ "id": 3, "user_id": 7, "name": "locale" }),
        ]));

        let records = repository(&executor).list(7).await;
        assert_eq!(
            records,
            vec![
                DefaultRecord { id: 1, user_id: 7, name: "theme".into() },
                DefaultRecord { id: 3, user_id: 7, name: "locale".into() },
            ]
        );
    }

    #[tokio::test]
    async fn writes_bind_only_the_inputs_they_need() {
        let executor = Arc::new(FakeExecutor::new());
        executor.push_ok(ProcedureResult::affected(1));
        executor.push_ok(ProcedureResult::affected(1));
        executor.push_ok(ProcedureResult::affected(1));

        let repo = repository(&executor);
        assert!(repo.create(&payload("x"), 7).await);
        assert!(repo.update(5, &payload("y"), 7).await);
        assert!(repo.delete(5, 7).await);

        let names: Vec<Vec<String>> = executor
            .calls()
            .iter()
            .map(|c| c.params.iter().map(|p| p.name.clone()).collect())
            .collect();
        assert_eq!(names[0], vec!["user_id", "data_name"]);
        assert_eq!(names[1], vec!["user_id", "id", "data_name"]);
        assert_eq!(names[2], vec!["user_id", "id"]);
        assert!(executor.calls().iter().all(|c| c.name == "default_save"));
    }

    #[tokio::test]
    async fn writes_report_false_on_zero_rows_or_failure() {
        let executor = Arc::new(FakeExecutor::new());
        executor.push_ok(ProcedureResult::affected(0));
        executor.push_err("deadlock");
        executor.push_ok(ProcedureResult::default());

        let repo = repository(&executor);
        assert!(!repo.delete(404, 7).await);
        assert!(!repo.update(5, &payload("y"), 7).await);
        assert!(!repo.create(&payload("x"), 7).await);
    }
}
