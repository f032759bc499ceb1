use crate::error::StoreError;
use crate::store::BackingStore;
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

const OPERATION_TIMEOUT: Duration = Duration::from_secs(3);

/// Lua is the only way to make read-and-delete atomic without relying on a
/// server-version-specific GETDEL command.
const GET_DEL_SCRIPT: &str = r#"
local v = redis.call("GET", KEYS[1])
if v then
    redis.call("DEL", KEYS[1])
end
return v
"#;

pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl BackingStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn().await?;
        let fut = conn.get::<_, Option<String>>(key);
        tokio::time::timeout(OPERATION_TIMEOUT, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }

    async fn get_del(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn().await?;
        let script = redis::Script::new(GET_DEL_SCRIPT);
        let invocation = script.key(key);
        let fut = invocation.invoke_async::<Option<String>>(&mut conn);
        tokio::time::timeout(OPERATION_TIMEOUT, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }

    async fn scan(
        &self,
        pattern: &str,
        cursor: u64,
        count: usize,
    ) -> Result<(u64, Vec<String>), StoreError> {
        let mut conn = self.conn().await?;
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count);
        let fut = cmd.query_async::<(u64, Vec<String>)>(&mut conn);
        tokio::time::timeout(OPERATION_TIMEOUT, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.conn().await?;
        let fut = conn.incr::<_, _, i64>(key, 1);
        tokio::time::timeout(OPERATION_TIMEOUT, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let fut = conn.expire::<_, ()>(key, seconds as i64);
        tokio::time::timeout(OPERATION_TIMEOUT, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let cmd = redis::cmd("PING");
        let fut = cmd.query_async::<String>(&mut conn);
        tokio::time::timeout(OPERATION_TIMEOUT, fut)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(StoreError::from)?;
        Ok(())
    }
}
