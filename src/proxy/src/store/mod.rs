pub mod model;
pub mod redis_store;

use crate::error::StoreError;
use async_trait::async_trait;

/// Narrow key/value capability set consumed by the rate limiter and the
/// executor. Every method maps backing-store failures to `StoreError`;
/// callers decide how to degrade (fail-open for the limiter, empty result
/// for the executor) — this trait never decides that for them.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Atomic read-and-delete. Must not be implemented as GET followed by
    /// DEL — the single-use token guarantee in `qr_verify` depends on this
    /// being a single primitive.
    async fn get_del(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Cursor-based scan over keys matching `pattern`. Returns the next
    /// cursor (0 means the scan is complete) and the keys found in this
    /// batch.
    async fn scan(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>), StoreError>;

    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
pub mod testing {
    use super::BackingStore;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for `RedisStore`, used to exercise the rate
    /// limiter and executor without a live redis instance.
    #[derive(Default)]
    pub struct FakeStore {
        data: Mutex<HashMap<String, String>>,
        pub fail: bool,
    }

    impl FakeStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn seed(&self, key: &str, value: &str) {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }

        pub fn failing() -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl BackingStore for FakeStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail {
                return Err(StoreError::Timeout);
            }
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn get_del(&self, key: &str) -> Result<Option<String>, StoreError> {
            if self.fail {
                return Err(StoreError::Timeout);
            }
            Ok(self.data.lock().unwrap().remove(key))
        }

        async fn scan(
            &self,
            pattern: &str,
            _cursor: u64,
            count: usize,
        ) -> Result<(u64, Vec<String>), StoreError> {
            if self.fail {
                return Err(StoreError::Timeout);
            }
            let prefix = pattern.trim_end_matches('*');
            let data = self.data.lock().unwrap();
            let mut keys: Vec<String> = data
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();
            keys.sort();
            keys.truncate(count);
            Ok((0, keys))
        }

        async fn incr(&self, key: &str) -> Result<i64, StoreError> {
            if self.fail {
                return Err(StoreError::Timeout);
            }
            let mut data = self.data.lock().unwrap();
            let entry = data.entry(key.to_string()).or_insert_with(|| "0".into());
            let n: i64 = entry.parse().unwrap_or(0) + 1;
            *entry = n.to_string();
            Ok(n)
        }

        async fn expire(&self, _key: &str, _seconds: u64) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Timeout);
            }
            Ok(())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Timeout);
            }
            Ok(())
        }
    }
}
