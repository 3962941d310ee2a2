#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use defaults_service::audit::{AuditEvent, MemoryAuditSink};
use defaults_service::auth::{generate_jwt, Claims};
use defaults_service::config::AppConfig;
use defaults_service::database::{
    DatabaseError, ProcedureExecutor, ProcedureResult, SqlPoolSource, StoredProcedureCall,
};
use defaults_service::{routes, AppState};

pub const SECRET: &str = "integration-secret";
pub const PREFIX: &str = "/api/v1/settings/default";

/// Scripted stored-procedure backend shared by every pool it hands out
#[derive(Default)]
pub struct ScriptedDatabase {
    responses: Mutex<VecDeque<Result<ProcedureResult, String>>>,
    calls: Mutex<Vec<StoredProcedureCall>>,
    unreachable: Mutex<bool>,
}

impl ScriptedDatabase {
    pub fn push_ok(&self, result: ProcedureResult) {
        self.responses.lock().unwrap().push_back(Ok(result));
    }

    pub fn push_err(&self, message: &str) {
        self.responses.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn go_offline(&self) {
        *self.unreachable.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<StoredProcedureCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcedureExecutor for ScriptedDatabase {
    async fn execute(&self, call: &StoredProcedureCall) -> Result<ProcedureResult, DatabaseError> {
        self.calls.lock().unwrap().push(call.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(DatabaseError::QueryError(message)),
            None => Ok(ProcedureResult::default()),
        }
    }
}

pub struct ScriptedPools(pub Arc<ScriptedDatabase>);

#[async_trait]
impl SqlPoolSource for ScriptedPools {
    async fn get_sql_pool(&self, _name: Option<&str>) -> Result<Arc<dyn ProcedureExecutor>, DatabaseError> {
        if *self.0.unreachable.lock().unwrap() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        Ok(self.0.clone())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        if *self.0.unreachable.lock().unwrap() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }
        Ok(())
    }
}

pub struct TestServer {
    pub base_url: String,
    pub database: Arc<ScriptedDatabase>,
    pub audit: MemoryAuditSink,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Serves the full router on a free local port inside the test runtime
    pub async fn spawn() -> Result<Self> {
        let mut config = AppConfig::from_env();
        config.server.app_version = Some("v1".to_string());
        config.server.service_name = "settings".to_string();
        config.security.jwt_secret = SECRET.to_string();
        config.security.jwt_issuer = None;
        config.security.jwt_audience = None;

        let database = Arc::new(ScriptedDatabase::default());
        let audit = MemoryAuditSink::new();
        let state = AppState::new(
            Arc::new(ScriptedPools(database.clone())),
            Arc::new(audit.clone()),
            &config,
        );

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let app = routes::app(state, false);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            database,
            audit,
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn audit_events(&self) -> Vec<AuditEvent> {
        self.audit.events()
    }
}

pub fn token_for(sub: &str) -> String {
    generate_jwt(&Claims::new(sub, vec![], vec![], 1), SECRET).expect("sign test token")
}
