use std::time::Instant;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// The three response shapes every handler answers with.
///
/// `Fail` is a well-formed request that produced nothing actionable;
/// `Error` is something that broke on our side.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeBody {
    Success { data: Value },
    Fail { data: Option<Value> },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub body: EnvelopeBody,
    pub code: StatusCode,
    /// Handler execution time in milliseconds
    pub elapsed_ms: Option<u64>,
}

impl Envelope {
    /// Successful result, defaults to 200
    pub fn success<T: Serialize>(data: T) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return Self::error("Failed to serialize response data");
            }
        };

        Self {
            body: EnvelopeBody::Success { data },
            code: StatusCode::OK,
            elapsed_ms: None,
        }
    }

    /// Nothing actionable happened, defaults to 200
    pub fn fail(data: Option<Value>) -> Self {
        Self {
            body: EnvelopeBody::Fail { data },
            code: StatusCode::OK,
            elapsed_ms: None,
        }
    }

    /// Unexpected failure, defaults to 500
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            body: EnvelopeBody::Error { message: message.into() },
            code: StatusCode::INTERNAL_SERVER_ERROR,
            elapsed_ms: None,
        }
    }

    pub fn with_code(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    pub fn status(&self) -> &'static str {
        match self.body {
            EnvelopeBody::Success { .. } => "success",
            EnvelopeBody::Fail { .. } => "fail",
            EnvelopeBody::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("status".to_string(), json!(self.status()));

        match &self.body {
            EnvelopeBody::Success { data } => {
                body.insert("data".to_string(), data.clone());
            }
            EnvelopeBody::Fail { data: Some(data) } => {
                body.insert("data".to_string(), data.clone());
            }
            EnvelopeBody::Fail { data: None } => {}
            EnvelopeBody::Error { message } => {
                body.insert("message".to_string(), json!(message));
            }
        }

        if let Some(elapsed) = self.elapsed_ms {
            body.insert("executionTime".to_string(), json!(elapsed));
        }

        Value::Object(body)
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.code, Json(self.to_json())).into_response()
    }
}

/// Builds envelopes stamped with the time elapsed since the handler started
#[derive(Debug, Clone, Copy)]
pub struct Responder {
    started: Instant,
}

impl Responder {
    pub fn start() -> Self {
        Self { started: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn success<T: Serialize>(&self, data: T) -> Envelope {
        Envelope::success(data).with_elapsed(self.elapsed_ms())
    }

    pub fn fail(&self, data: Option<Value>) -> Envelope {
        Envelope::fail(data).with_elapsed(self.elapsed_ms())
    }

    pub fn error(&self, message: impl Into<String>) -> Envelope {
        Envelope::error(message).with_elapsed(self.elapsed_ms())
    }
}
