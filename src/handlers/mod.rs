// handlers/mod.rs - request handlers and the state they close over
//
// default: the audited CRUD surface under the service prefix (token required)
// health:  service banner and database liveness (public)

pub mod default;
pub mod health;

use std::sync::Arc;

use crate::audit::AuditSink;
use crate::auth::JwtVerifier;
use crate::config::AppConfig;
use crate::database::{ProcedureNames, SqlPoolSource};

/// Shared dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pools: Arc<dyn SqlPoolSource>,
    pub audit: Arc<dyn AuditSink>,
    pub procedures: ProcedureNames,
    pub jwt: JwtVerifier,
    /// `/api[/<version>]/<service>/default`
    pub route_prefix: String,
}

impl AppState {
    pub fn new(pools: Arc<dyn SqlPoolSource>, audit: Arc<dyn AuditSink>, config: &AppConfig) -> Self {
        Self {
            pools,
            audit,
            procedures: ProcedureNames::from(&config.database),
            jwt: JwtVerifier::new(&config.security),
            route_prefix: config.route_prefix(),
        }
    }
}
