use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Optional version segment of the route prefix (`/api/<version>/...`)
    pub app_version: Option<String>,
    pub service_name: String,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    /// Schema holding the stored procedures
    pub schema: String,
    pub read_procedure: String,
    pub write_procedure: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub jwt_expiry_hours: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("APP_VERSION") {
            self.server.app_version = Some(v).filter(|v| !v.trim().is_empty());
        }
        if let Ok(v) = env::var("SERVICE_NAME") {
            if !v.trim().is_empty() {
                self.server.service_name = v;
            }
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_SCHEMA") {
            self.database.schema = v;
        }
        if let Ok(v) = env::var("DATABASE_READ_PROCEDURE") {
            self.database.read_procedure = v;
        }
        if let Ok(v) = env::var("DATABASE_WRITE_PROCEDURE") {
            self.database.write_procedure = v;
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ISSUER") {
            self.security.jwt_issuer = Some(v);
        }
        if let Ok(v) = env::var("JWT_AUDIENCE") {
            self.security.jwt_audience = Some(v);
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }

        // Logging overrides
        if let Ok(v) = env::var("RUST_LOG") {
            self.logging.filter = v;
        }
        match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => self.logging.format = LogFormat::Json,
            Ok("pretty") => self.logging.format = LogFormat::Pretty,
            _ => {}
        }

        self
    }

    /// Path under which the default routes are registered
    pub fn route_prefix(&self) -> String {
        route_prefix(self.server.app_version.as_deref(), &self.server.service_name)
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "::".to_string(),
                port: 80,
                app_version: None,
                service_name: "defaults".to_string(),
                enable_cors: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                schema: "dbo".to_string(),
                read_procedure: "default_list".to_string(),
                write_procedure: "default_save".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_issuer: None,
                jwt_audience: None,
                jwt_expiry_hours: 24 * 7, // 1 week
            },
            logging: LoggingConfig {
                filter: "info,defaults_service::handlers=debug,defaults_service::database=debug".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.jwt_expiry_hours = 24;
        config.logging.format = LogFormat::Json;
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.server.enable_cors = false;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.security.jwt_expiry_hours = 4;
        config.logging.filter = "info,defaults_service::handlers=debug".to_string();
        config.logging.format = LogFormat::Json;
        config
    }
}

/// `/api[/<version>]/<service>/default`
pub fn route_prefix(app_version: Option<&str>, service_name: &str) -> String {
    match app_version {
        Some(version) => format!("/api/{}/{}/default", version, service_name),
        None => format!("/api/{}/default", service_name),
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.server.port, 80);
        assert_eq!(config.database.schema, "dbo");
        assert_eq!(config.security.jwt_expiry_hours, 24 * 7);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.server.enable_cors);
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn route_prefix_includes_optional_version() {
        assert_eq!(route_prefix(None, "settings"), "/api/settings/default");
        assert_eq!(route_prefix(Some("v2"), "settings"), "/api/v2/settings/default");

        let mut config = AppConfig::development();
        config.server.app_version = Some("v1".to_string());
        assert_eq!(config.route_prefix(), "/api/v1/defaults/default");
    }
}
