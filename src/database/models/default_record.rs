use serde::{Deserialize, Serialize};

/// A user's default, as returned by the read procedure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRecord {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
}

/// Writable attributes of a default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPayload {
    pub name: Option<String>,
}
