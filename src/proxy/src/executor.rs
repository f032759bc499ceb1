use crate::config::AdapterArgs;
use crate::protocol::mysql::basic::Column;
use crate::schema;
use crate::sql::Classification;
use crate::store::model::{AuthToken, UserRecord};
use crate::store::BackingStore;
use chrono::Local;
use std::sync::Arc;
use tracing::warn;

pub enum QueryOutcome {
    Rows {
        columns: Vec<Column>,
        rows: Vec<Vec<Option<String>>>,
    },
    Ok,
}

impl QueryOutcome {
    pub fn row_count(&self) -> usize {
        match self {
            QueryOutcome::Rows { rows, .. } => rows.len(),
            QueryOutcome::Ok => 0,
        }
    }
}

/// Dispatches a classified query against the backing store. Every
/// backing-store failure degrades the current query to an empty result;
/// none of them produce a MySQL error packet.
pub struct Executor {
    store: Arc<dyn BackingStore>,
    scan_limit: usize,
    allow_scan: bool,
}

impl Executor {
    pub fn new(store: Arc<dyn BackingStore>, args: &AdapterArgs) -> Self {
        Self {
            store,
            scan_limit: args.scan_limit,
            allow_scan: args.allow_scan,
        }
    }

    pub async fn execute(
        &self,
        classification: Classification,
        db: &str,
        client: &str,
    ) -> QueryOutcome {
        match classification {
            Classification::Version => QueryOutcome::Rows {
                columns: schema::version_columns(),
                rows: schema::version_rows(),
            },
            Classification::ShowTables => QueryOutcome::Rows {
                columns: schema::show_tables_columns(db),
                rows: schema::show_tables_rows(),
            },
            Classification::DescribeUsers => QueryOutcome::Rows {
                columns: schema::describe_columns(),
                rows: schema::describe_users_rows(),
            },
            Classification::PkLookup { value, .. } => self.pk_lookup(&value).await,
            Classification::FullScan { table } => {
                if !self.allow_scan {
                    warn!(client, "query_rejected");
                    return QueryOutcome::Rows {
                        columns: schema::rejected_columns(),
                        rows: vec![],
                    };
                }
                self.full_scan(&table, client).await
            }
            Classification::TokenVerify { token } => self.token_verify(&token).await,
            Classification::Noop => QueryOutcome::Ok,
            Classification::Rejected => {
                warn!(client, "query_rejected");
                QueryOutcome::Rows {
                    columns: schema::rejected_columns(),
                    rows: vec![],
                }
            }
        }
    }

    async fn pk_lookup(&self, pk: &str) -> QueryOutcome {
        let key = format!("users.{pk}");
        let payload = match self.store.get(&key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(operation = "get", error = %e, "redis_connection_error");
                None
            }
        };

        let rows = match payload.and_then(|p| serde_json::from_str::<UserRecord>(&p).ok()) {
            Some(record) => vec![vec![
                Some(pk.to_string()),
                record.name,
                record.email,
                record.age.map(|a| a.to_string()),
                record.created_at,
            ]],
            None => vec![],
        };

        QueryOutcome::Rows {
            columns: schema::users_row_columns(),
            rows,
        }
    }

    async fn full_scan(&self, table: &str, client: &str) -> QueryOutcome {
        if self.scan_limit == 0 {
            return QueryOutcome::Rows {
                columns: schema::users_row_columns(),
                rows: vec![],
            };
        }

        warn!(table, limit = self.scan_limit, client, "scan_operation_triggered");

        let pattern = format!("{table}.*");
        let mut rows = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next_cursor, keys) = match self.store.scan(&pattern, cursor, 100).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(operation = "scan", error = %e, "redis_connection_error");
                    break;
                }
            };

            for key in keys {
                if rows.len() >= self.scan_limit {
                    break;
                }
                let pk = key.trim_start_matches(&format!("{table}.")).to_string();
                match self.store.get(&key).await {
                    Ok(Some(payload)) => match serde_json::from_str::<UserRecord>(&payload) {
                        Ok(record) => rows.push(vec![
                            Some(pk),
                            record.name,
                            record.email,
                            record.age.map(|a| a.to_string()),
                            record.created_at,
                        ]),
                        Err(_) => warn!(key, "unparseable user payload skipped"),
                    },
                    Ok(None) => {}
                    Err(e) => warn!(operation = "get", error = %e, "redis_connection_error"),
                }
            }

            if rows.len() >= self.scan_limit || next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        rows.truncate(self.scan_limit);
        QueryOutcome::Rows {
            columns: schema::users_row_columns(),
            rows,
        }
    }

    async fn token_verify(&self, token: &str) -> QueryOutcome {
        let key = format!("auth:{token}");
        let payload = match self.store.get_del(&key).await {
            Ok(v) => v,
            Err(e) => {
                warn!(operation = "get_del", error = %e, "redis_connection_error");
                None
            }
        };

        let rows = match payload.and_then(|p| serde_json::from_str::<AuthToken>(&p).ok()) {
            Some(auth) => {
                let verified_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
                vec![vec![
                    Some("1".to_string()),
                    Some(auth.user_id),
                    Some(auth.facility),
                    Some(verified_at),
                    Some(String::new()),
                ]]
            }
            None => vec![],
        };

        QueryOutcome::Rows {
            columns: schema::token_verify_columns(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeStore;

    fn args() -> AdapterArgs {
        AdapterArgs {
            port: 3306,
            redis_url: "redis://127.0.0.1:6379".into(),
            scan_limit: 100,
            rate_limit: 100,
            rate_window: 60,
            allow_scan: true,
            log_level: "info".into(),
        }
    }

    #[tokio::test]
    async fn pk_lookup_projects_stored_fields() {
        let store = Arc::new(FakeStore::new());
        store.seed(
            "users.u001",
            r#"{"name":"Alice","email":"alice@example.com","age":28,"created_at":"2024-01-15 10:30:00"}"#,
        );
        let executor = Executor::new(store, &args());
        let outcome = executor
            .execute(
                Classification::PkLookup {
                    table: "users".into(),
                    column: "id".into(),
                    value: "u001".into(),
                },
                "mysql",
                "127.0.0.1",
            )
            .await;
        match outcome {
            QueryOutcome::Rows { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0][0], Some("u001".to_string()));
                assert_eq!(rows[0][1], Some("Alice".to_string()));
            }
            QueryOutcome::Ok => panic!("expected rows"),
        }
    }

    #[tokio::test]
    async fn pk_lookup_null_age_encodes_as_none() {
        let store = Arc::new(FakeStore::new());
        store.seed(
            "users.u005",
            r#"{"name":"Eve","email":"eve@example.com","age":null,"created_at":"2024-01-15 10:30:00"}"#,
        );
        let executor = Executor::new(store, &args());
        let outcome = executor
            .execute(
                Classification::PkLookup {
                    table: "users".into(),
                    column: "id".into(),
                    value: "u005".into(),
                },
                "mysql",
                "127.0.0.1",
            )
            .await;
        match outcome {
            QueryOutcome::Rows { rows, .. } => assert_eq!(rows[0][3], None),
            QueryOutcome::Ok => panic!("expected rows"),
        }
    }

    #[tokio::test]
    async fn pk_lookup_missing_key_returns_zero_rows() {
        let store = Arc::new(FakeStore::new());
        let executor = Executor::new(store, &args());
        let outcome = executor
            .execute(
                Classification::PkLookup {
                    table: "users".into(),
                    column: "id".into(),
                    value: "ghost".into(),
                },
                "mysql",
                "127.0.0.1",
            )
            .await;
        assert_eq!(outcome.row_count(), 0);
    }

    #[tokio::test]
    async fn full_scan_respects_limit() {
        let store = Arc::new(FakeStore::new());
        for i in 0..5 {
            store.seed(&format!("users.u{i:03}"), r#"{"name":"x"}"#);
        }
        let mut cfg = args();
        cfg.scan_limit = 3;
        let executor = Executor::new(store, &cfg);
        let outcome = executor
            .execute(
                Classification::FullScan {
                    table: "users".into(),
                },
                "mysql",
                "127.0.0.1",
            )
            .await;
        assert_eq!(outcome.row_count(), 3);
    }

    #[tokio::test]
    async fn full_scan_disabled_when_scan_limit_is_zero() {
        let store = Arc::new(FakeStore::new());
        store.seed("users.u001", r#"{"name":"x"}"#);
        let mut cfg = args();
        cfg.scan_limit = 0;
        let executor = Executor::new(store, &cfg);
        let outcome = executor
            .execute(
                Classification::FullScan {
                    table: "users".into(),
                },
                "mysql",
                "127.0.0.1",
            )
            .await;
        assert_eq!(outcome.row_count(), 0);
    }

    #[tokio::test]
    async fn full_scan_reclassifies_as_rejected_when_disallowed() {
        let store = Arc::new(FakeStore::new());
        store.seed("users.u001", r#"{"name":"x"}"#);
        let mut cfg = args();
        cfg.allow_scan = false;
        let executor = Executor::new(store, &cfg);
        let outcome = executor
            .execute(
                Classification::FullScan {
                    table: "users".into(),
                },
                "mysql",
                "127.0.0.1",
            )
            .await;
        assert_eq!(outcome.row_count(), 0);
    }

    #[tokio::test]
    async fn token_verify_is_single_use() {
        let store = Arc::new(FakeStore::new());
        store.seed("auth:abc123", r#"{"user_id":"u001","facility":"fac-tokyo"}"#);
        let executor = Executor::new(store, &args());

        let first = executor
            .execute(
                Classification::TokenVerify {
                    token: "abc123".into(),
                },
                "mysql",
                "127.0.0.1",
            )
            .await;
        assert_eq!(first.row_count(), 1);

        let second = executor
            .execute(
                Classification::TokenVerify {
                    token: "abc123".into(),
                },
                "mysql",
                "127.0.0.1",
            )
            .await;
        assert_eq!(second.row_count(), 0);
    }

    #[tokio::test]
    async fn rejected_query_returns_empty_result() {
        let store = Arc::new(FakeStore::new());
        let executor = Executor::new(store, &args());
        let outcome = executor
            .execute(Classification::Rejected, "mysql", "127.0.0.1")
            .await;
        assert_eq!(outcome.row_count(), 0);
    }

    #[tokio::test]
    async fn noop_returns_ok_with_no_rows() {
        let store = Arc::new(FakeStore::new());
        let executor = Executor::new(store, &args());
        let outcome = executor
            .execute(Classification::Noop, "mysql", "127.0.0.1")
            .await;
        assert!(matches!(outcome, QueryOutcome::Ok));
    }
}
