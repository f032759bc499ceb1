use serde::{Deserialize, Serialize};

/// Stored under `users.<pk>`. Fields absent from the JSON payload decode
/// to `None` and are projected as SQL NULL by the executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i64>,
    pub created_at: Option<String>,
}

/// Stored under `auth:<token>` with a producer-set TTL. Consumed atomically
/// by `qr_verify`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthToken {
    pub user_id: String,
    pub facility: String,
}
