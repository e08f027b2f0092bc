//! PostgreSQL sink using sqlx
//!
//! The import pipeline is synchronous, so the sink owns a current-thread
//! tokio runtime and blocks on every call. Each row insert runs inside its own
//! savepoint: a rejected row is rolled back to the savepoint and the
//! surrounding transaction stays usable.

use super::{Sink, SinkError, SinkResult};
use crate::config::ConnectionConfig;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

/// Connection establishment timeout; statements themselves have none
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PostgresSink {
    runtime: Runtime,
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresSink {
    /// Connect and check the server answers
    pub fn connect(config: &ConnectionConfig) -> SinkResult<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let pool = runtime.block_on(async {
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .acquire_timeout(CONNECT_TIMEOUT)
                .connect_with(config.pg_connect_options())
                .await?;

            sqlx::query("SELECT 1").execute(&pool).await?;

            Ok::<_, sqlx::Error>(pool)
        })?;

        info!("Connected to PostgreSQL database {}", config.dbname);

        Ok(Self {
            runtime,
            pool,
            tx: None,
        })
    }
}

impl Sink for PostgresSink {
    fn try_create_schema(&mut self, schema: &str) -> SinkResult<()> {
        self.execute(&format!("CREATE SCHEMA {}", schema))
    }

    fn execute(&mut self, statement: &str) -> SinkResult<()> {
        debug!("Executing: {}", statement);
        match self.tx.as_mut() {
            Some(tx) => self.runtime.block_on(sqlx::query(statement).execute(&mut **tx))?,
            None => self.runtime.block_on(sqlx::query(statement).execute(&self.pool))?,
        };
        Ok(())
    }

    fn begin(&mut self) -> SinkResult<()> {
        let tx = self.runtime.block_on(self.pool.begin())?;
        self.tx = Some(tx);
        Ok(())
    }

    fn insert(&mut self, statement: &str, values: &[String]) -> SinkResult<()> {
        let runtime = &self.runtime;
        let tx = self
            .tx
            .as_mut()
            .ok_or_else(|| SinkError("no open transaction".to_string()))?;

        runtime.block_on(async {
            sqlx::query("SAVEPOINT import_row").execute(&mut **tx).await?;

            let mut query = sqlx::query(statement);
            for value in values {
                query = query.bind(value.as_str());
            }

            match query.execute(&mut **tx).await {
                Ok(_) => {
                    sqlx::query("RELEASE SAVEPOINT import_row").execute(&mut **tx).await?;
                    Ok::<(), SinkError>(())
                }
                Err(e) => {
                    sqlx::query("ROLLBACK TO SAVEPOINT import_row").execute(&mut **tx).await?;
                    Err(SinkError::from(e))
                }
            }
        })
    }

    fn commit(&mut self) -> SinkResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| SinkError("no open transaction".to_string()))?;
        self.runtime.block_on(tx.commit())?;
        Ok(())
    }

    fn rollback(&mut self) -> SinkResult<()> {
        if let Some(tx) = self.tx.take() {
            self.runtime.block_on(tx.rollback())?;
        }
        Ok(())
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn typed_placeholder(&self, position: usize, sql_type: &str) -> String {
        format!("${}::{}", position, sql_type)
    }
}

impl Drop for PostgresSink {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = self.runtime.block_on(tx.rollback()) {
                warn!("Rollback on close failed: {}", e);
            }
        }
        self.runtime.block_on(self.pool.close());
    }
}
