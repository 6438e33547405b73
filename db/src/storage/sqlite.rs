use std::{path::Path, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    ConnectionError, ConnectionResult, OptionalExtension, prelude::*, sqlite::SqliteConnection,
};
use diesel_async::{
    AsyncConnection, RunQueryDsl, SimpleAsyncConnection,
    pooled_connection::{AsyncDieselConnectionManager, ManagerConfig},
    scoped_futures::ScopedFutureExt,
    sync_connection_wrapper::SyncConnectionWrapper,
};
use futures::{FutureExt, future::BoxFuture};
use slotd_common::Labels;
use tracing::{debug, info, instrument, warn};

use crate::{
    models::{
        Activation, AuditEntry, DbActivation, DbLicense, DbNewAuditEntry, LICENSE_STATUS_ACTIVE,
        LicenseRecord, LicenseUsage, NewLicense,
    },
    schema::{activations, audit_log, license_info},
    storage::{Ledger, LicenseStore, StoreError, ensure_capacity},
};

type SqliteConn = SyncConnectionWrapper<SqliteConnection>;
pub type SqlitePool = bb8::Pool<AsyncDieselConnectionManager<SqliteConn>>;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const CONNECTION_PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
";

/// Path that opens a private, non-persistent database.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// Ceiling used for admissions when no active license record exists.
    pub fallback_max_agents: i64,

    /// How long an operation waits for the writer connection.
    pub connection_timeout: Duration,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            fallback_max_agents: 50,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Durable ledger backed by an embedded SQLite database.
///
/// The pool holds exactly one connection, so write transactions are
/// serialized and a ceiling check can never interleave with another
/// admission's insert.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
    fallback_max_agents: i64,
}

impl std::fmt::Debug for SqliteLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLedger")
            .field("fallback_max_agents", &self.fallback_max_agents)
            .finish_non_exhaustive()
    }
}

impl SqliteLedger {
    /// Open (creating if needed) the database at `database_path` and make
    /// sure the schema exists.
    #[instrument(skip(options))]
    pub async fn open(database_path: &str, options: SqliteOptions) -> Result<Self, StoreError> {
        if database_path != IN_MEMORY {
            if let Some(parent) = Path::new(database_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| StoreError::Internal(Box::new(e)))?;
                }
            }
            info!(path = %database_path, "Using database file");
        }

        let mut config = ManagerConfig::default();
        config.custom_setup = Box::new(establish);
        let manager =
            AsyncDieselConnectionManager::<SqliteConn>::new_with_config(database_path, config);

        let pool = bb8::Pool::builder()
            .max_size(1)
            .connection_timeout(options.connection_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .await?;

        {
            let mut conn = pool.get().await?;
            conn.batch_execute(SCHEMA).await?;
        }

        debug!("Database schema is up to date");

        Ok(Self {
            pool,
            fallback_max_agents: options.fallback_max_agents,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn establish(url: &str) -> BoxFuture<'_, ConnectionResult<SqliteConn>> {
    async move {
        let mut conn = SqliteConn::establish(url).await?;
        conn.batch_execute(CONNECTION_PRAGMAS)
            .await
            .map_err(ConnectionError::CouldntSetupConfiguration)?;
        Ok(conn)
    }
    .boxed()
}

/// The most recently created active license record, if any.
async fn active_license(conn: &mut SqliteConn) -> Result<Option<DbLicense>, StoreError> {
    let license = license_info::table
        .filter(license_info::status.eq(LICENSE_STATUS_ACTIVE))
        .order((license_info::created_at.desc(), license_info::id.desc()))
        .select(DbLicense::as_select())
        .first(conn)
        .await
        .optional()?;

    Ok(license)
}

#[async_trait]
impl Ledger for SqliteLedger {
    #[instrument(skip(self, labels))]
    async fn admit(
        &self,
        agent_key: &str,
        ip: &str,
        labels: &Labels,
    ) -> Result<Activation, StoreError> {
        let labels_json = serde_json::to_string(labels)?;
        let fallback_max_agents = self.fallback_max_agents;

        let mut pooled = self.pool.get().await?;
        let conn: &mut SqliteConn = &mut pooled;
        let (row, is_new, max_agents) = conn
            .transaction::<_, StoreError, _>(|conn| {
                async move {
                    let max_agents = active_license(conn)
                        .await?
                        .map(|license| i64::from(license.max_agents))
                        .unwrap_or(fallback_max_agents);

                    let active = activations::table
                        .count()
                        .get_result::<i64>(conn)
                        .await?;

                    let existing = activations::table
                        .find(agent_key)
                        .select(DbActivation::as_select())
                        .first(conn)
                        .await
                        .optional()?;

                    let now = Utc::now();
                    let (row, is_new) = match existing {
                        None => {
                            ensure_capacity(active, max_agents)?;

                            let row = DbActivation {
                                agent_key: agent_key.to_string(),
                                ip: ip.to_string(),
                                labels: labels_json,
                                activation_sig: None,
                                hardware_hash: None,
                                activated_at: now.naive_utc(),
                                updated_at: now.naive_utc(),
                                last_seen_at: now.naive_utc(),
                            };

                            diesel::insert_into(activations::table)
                                .values(&row)
                                .execute(conn)
                                .await?;

                            (row, true)
                        }
                        Some(mut row) => {
                            diesel::update(activations::table.find(agent_key))
                                .set((
                                    activations::ip.eq(ip),
                                    activations::labels.eq(&labels_json),
                                    activations::last_seen_at.eq(now.naive_utc()),
                                ))
                                .execute(conn)
                                .await?;

                            row.ip = ip.to_string();
                            row.labels = labels_json;
                            row.last_seen_at = now.naive_utc();

                            (row, false)
                        }
                    };

                    let entry =
                        AuditEntry::activation(agent_key, ip, labels, is_new, max_agents, now);
                    diesel::insert_into(audit_log::table)
                        .values(DbNewAuditEntry::from(entry))
                        .execute(conn)
                        .await?;

                    Ok((row, is_new, max_agents))
                }
                .scope_boxed()
            })
            .await
            .inspect_err(|e| {
                if let StoreError::LimitExceeded { active, max } = e {
                    warn!(%agent_key, active, max, "Admission rejected, license limit reached");
                }
            })?;

        info!(%agent_key, %ip, is_new, max_agents, "Device admitted");

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn remove(&self, agent_key: &str) -> Result<(), StoreError> {
        let mut pooled = self.pool.get().await?;
        let conn: &mut SqliteConn = &mut pooled;
        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let deleted = diesel::delete(activations::table.find(agent_key))
                    .execute(conn)
                    .await?;

                if deleted == 0 {
                    return Err(StoreError::NotFound(agent_key.to_string()));
                }

                diesel::insert_into(audit_log::table)
                    .values(DbNewAuditEntry::from(AuditEntry::deactivation(
                        agent_key,
                        Utc::now(),
                    )))
                    .execute(conn)
                    .await?;

                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        info!(%agent_key, "Device removed");

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Activation>, StoreError> {
        let mut conn = self.pool.get().await?;
        let rows = activations::table
            .order((activations::activated_at.desc(), activations::agent_key.asc()))
            .select(DbActivation::as_select())
            .load(&mut *conn)
            .await?;

        Ok(rows.into_iter().map(Activation::from).collect())
    }

    async fn status(&self) -> Result<LicenseUsage, StoreError> {
        let mut conn = self.pool.get().await?;
        let used = activations::table
            .count()
            .get_result::<i64>(&mut *conn)
            .await?;
        let license = active_license(&mut *conn).await?.map(LicenseRecord::from);

        debug!(used, has_license = license.is_some(), "Read license usage");

        Ok(LicenseUsage::new(used, license.as_ref()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute("SELECT 1").await?;
        Ok(())
    }
}

#[async_trait]
impl LicenseStore for SqliteLedger {
    #[instrument(skip(self))]
    async fn create_license(&self, license: NewLicense) -> Result<LicenseRecord, StoreError> {
        let mut conn = self.pool.get().await?;
        let row = diesel::insert_into(license_info::table)
            .values(license.into_row(Utc::now()))
            .returning(DbLicense::as_returning())
            .get_result(&mut *conn)
            .await?;

        info!(
            id = row.id,
            max_agents = row.max_agents,
            status = %row.status,
            "License record created"
        );

        Ok(row.into())
    }

    async fn list_licenses(&self) -> Result<Vec<LicenseRecord>, StoreError> {
        let mut conn = self.pool.get().await?;
        let rows = license_info::table
            .order((license_info::created_at.desc(), license_info::id.desc()))
            .select(DbLicense::as_select())
            .load(&mut *conn)
            .await?;

        Ok(rows.into_iter().map(LicenseRecord::from).collect())
    }
}
