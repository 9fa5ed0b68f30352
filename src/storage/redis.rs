//! Redis-backed store.

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::AsyncCommands;

use super::kv::{CommitOutcome, KvStore, WatchTxn, WriteBatch, WriteOp};
use crate::core::config::RedisConfig;
use crate::core::error::RegistryResult;

/// Redis implementation of [`KvStore`].
///
/// Plain operations share a reconnecting connection manager. Each watch arms
/// `WATCH` on a dedicated connection; reads run on that connection and the
/// commit stages the batch in a `MULTI`/`EXEC` pipeline, where a nil `EXEC`
/// reply is the conflict signal. Dropping the handle without committing tears
/// the connection down, which discards the watch.
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to the primary address of `config`.
    pub async fn connect(config: &RedisConfig) -> RegistryResult<Self> {
        let client = redis::Client::open(config.primary_url().as_str())?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> RegistryResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> RegistryResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> RegistryResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    async fn watch(&self, keys: &[String]) -> RegistryResult<Box<dyn WatchTxn>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        if !keys.is_empty() {
            let mut cmd = redis::cmd("WATCH");
            for key in keys {
                cmd.arg(key);
            }
            let _: () = cmd.query_async(&mut conn).await?;
        }
        Ok(Box::new(RedisWatchTxn { conn }))
    }
}

struct RedisWatchTxn {
    conn: MultiplexedConnection,
}

#[async_trait]
impl WatchTxn for RedisWatchTxn {
    async fn read(&mut self, key: &str) -> RegistryResult<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn)
            .await?;
        Ok(value)
    }

    async fn commit(mut self: Box<Self>, batch: WriteBatch) -> RegistryResult<CommitOutcome> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in batch.into_ops() {
            match op {
                WriteOp::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                WriteOp::Delete { key } => {
                    pipe.del(key).ignore();
                }
            }
        }
        let reply: Option<()> = pipe.query_async(&mut self.conn).await?;
        Ok(match reply {
            Some(()) => CommitOutcome::Committed,
            None => CommitOutcome::Conflict,
        })
    }
}
