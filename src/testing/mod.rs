//! In-memory stand-ins for the database seams, for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::database::{DatabaseError, ProcedureExecutor, ProcedureResult, SqlPoolSource, StoredProcedureCall};

/// Replays scripted results and records every call it receives
#[derive(Default)]
pub struct FakeExecutor {
    responses: Mutex<VecDeque<Result<ProcedureResult, String>>>,
    calls: Mutex<Vec<StoredProcedureCall>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, result: ProcedureResult) {
        self.responses.lock().unwrap().push_back(Ok(result));
    }

    pub fn push_err(&self, message: &str) {
        self.responses.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> Vec<StoredProcedureCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcedureExecutor for FakeExecutor {
    async fn execute(&self, call: &StoredProcedureCall) -> Result<ProcedureResult, DatabaseError> {
        self.calls.lock().unwrap().push(call.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(DatabaseError::QueryError(message)),
            None => Ok(ProcedureResult::default()),
        }
    }
}

/// Pool source that hands out one shared `FakeExecutor`, or fails to connect
pub struct FakePools {
    pub executor: Arc<FakeExecutor>,
    pub reachable: bool,
}

impl FakePools {
    pub fn new() -> Self {
        Self {
            executor: Arc::new(FakeExecutor::new()),
            reachable: true,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new()
        }
    }
}

#[async_trait]
impl SqlPoolSource for FakePools {
    async fn get_sql_pool(&self, _name: Option<&str>) -> Result<Arc<dyn ProcedureExecutor>, DatabaseError> {
        if !self.reachable {
            return Err(DatabaseError::QueryError("connection refused".to_string()));
        }
        Ok(self.executor.clone())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        if self.reachable {
            Ok(())
        } else {
            Err(DatabaseError::QueryError("connection refused".to_string()))
        }
    }
}
