#![cfg(feature = "sqlite")]

use crate::store::LedgerStore;
use anyhow::Context;
use relic_core::error::LedgerError;
use relic_core::id::{AccountId, NotifyId, TokenId};
use relic_core::resolution::PendingResolution;
use relic_core::token::TokenRecord;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::runtime::Runtime;

/// SQL query constants to avoid repetition
mod sql {
    pub const CREATE_TOKENS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS tokens (
            token_id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            metadata_ref TEXT
        );
    "#;

    pub const CREATE_OWNED_TOKENS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS owned_tokens (
            owner_id TEXT NOT NULL,
            token_id TEXT NOT NULL,
            PRIMARY KEY (owner_id, token_id)
        );
    "#;

    pub const CREATE_PENDING_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS pending_resolutions (
            notify_id BLOB PRIMARY KEY,
            token_id TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            record BLOB NOT NULL
        );
    "#;

    pub const GET_TOKEN: &str = r#"
        SELECT owner_id, metadata_ref FROM tokens WHERE token_id = ?
    "#;

    pub const PUT_TOKEN: &str = r#"
        INSERT INTO tokens (token_id, owner_id, metadata_ref)
        VALUES (?, ?, ?)
        ON CONFLICT(token_id) DO UPDATE SET
            owner_id = excluded.owner_id,
            metadata_ref = excluded.metadata_ref
    "#;

    pub const ADD_TO_OWNER: &str = r#"
        INSERT OR IGNORE INTO owned_tokens (owner_id, token_id) VALUES (?, ?)
    "#;

    pub const REMOVE_FROM_OWNER: &str = r#"
        DELETE FROM owned_tokens WHERE owner_id = ? AND token_id = ?
    "#;

    pub const TOKENS_OF: &str = r#"
        SELECT token_id FROM owned_tokens WHERE owner_id = ?
    "#;

    pub const HAS_OWNER_ENTRY: &str = r#"
        SELECT 1 FROM owned_tokens WHERE owner_id = ? LIMIT 1
    "#;

    pub const PUT_PENDING: &str = r#"
        INSERT INTO pending_resolutions (notify_id, token_id, resolved, record)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(notify_id) DO UPDATE SET
            resolved = excluded.resolved,
            record = excluded.record
    "#;

    pub const GET_PENDING: &str = r#"
        SELECT record FROM pending_resolutions WHERE notify_id = ?
    "#;

    pub const PENDING_FOR_TOKEN: &str = r#"
        SELECT record FROM pending_resolutions
        WHERE token_id = ? AND resolved = 0
        LIMIT 1
    "#;

    pub const PRUNE_RESOLVED: &str = r#"
        DELETE FROM pending_resolutions WHERE resolved = 1
    "#;
}

/// A SQLite-based implementation of [`LedgerStore`] using sqlx.
///
/// Owned-set entries are rows in `owned_tokens`; the no-empty-entries
/// invariant is structural, since deleting an account's last row leaves
/// nothing behind. Pending-resolution records are stored as opaque
/// serialized blobs alongside the columns the lookups need.
pub struct SqliteStore {
    pool: SqlitePool,
    rt: Arc<Runtime>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) a SQLite-backed ledger at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let db_path = path.as_ref().to_path_buf();
        let db_url = format!("sqlite:{}", db_path.to_string_lossy());

        // Dedicated runtime for async pool operations behind the sync
        // trait surface
        let rt = Arc::new(
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?,
        );

        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| LedgerError::Database(format!("invalid database URL: {}", e)))?
            .create_if_missing(true);

        let pool = rt
            .block_on(async {
                SqlitePoolOptions::new()
                    .max_connections(5)
                    .connect_with(options)
                    .await
            })
            .with_context(|| format!("failed to open sqlite ledger at {}", db_path.display()))?;

        rt.block_on(Self::initialize_schema(&pool))?;

        log::debug!("opened sqlite ledger at {}", db_path.display());

        Ok(Self { pool, rt, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Creates the necessary tables in the database
    async fn initialize_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(sql::CREATE_TOKENS_TABLE).execute(pool).await?;
        sqlx::query(sql::CREATE_OWNED_TOKENS_TABLE)
            .execute(pool)
            .await?;
        sqlx::query(sql::CREATE_PENDING_TABLE).execute(pool).await?;
        Ok(())
    }
}

impl LedgerStore for SqliteStore {
    fn get_token(&self, token_id: &TokenId) -> Result<Option<TokenRecord>, LedgerError> {
        self.rt.block_on(async {
            let row = sqlx::query(sql::GET_TOKEN)
                .bind(token_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

            match row {
                Some(row) => {
                    let owner: String = row.try_get("owner_id")?;
                    let metadata_ref: Option<String> = row.try_get("metadata_ref")?;
                    Ok(Some(TokenRecord::new(
                        token_id.clone(),
                        AccountId::from(owner),
                        metadata_ref,
                    )))
                }
                None => Ok(None),
            }
        })
    }

    fn put_token(&self, record: &TokenRecord) -> Result<(), LedgerError> {
        self.rt.block_on(async {
            sqlx::query(sql::PUT_TOKEN)
                .bind(record.id().as_str())
                .bind(record.owner().as_str())
                .bind(record.metadata_ref.as_deref())
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }

    fn add_to_owner(&self, account: &AccountId, token_id: &TokenId) -> Result<(), LedgerError> {
        self.rt.block_on(async {
            sqlx::query(sql::ADD_TO_OWNER)
                .bind(account.as_str())
                .bind(token_id.as_str())
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }

    fn remove_from_owner(
        &self,
        account: &AccountId,
        token_id: &TokenId,
    ) -> Result<(), LedgerError> {
        self.rt.block_on(async {
            let result = sqlx::query(sql::REMOVE_FROM_OWNER)
                .bind(account.as_str())
                .bind(token_id.as_str())
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(LedgerError::NotFound(format!(
                    "token {} is not owned by {}",
                    token_id, account
                )));
            }
            Ok(())
        })
    }

    fn tokens_of(&self, account: &AccountId) -> Result<BTreeSet<TokenId>, LedgerError> {
        self.rt.block_on(async {
            let rows = sqlx::query(sql::TOKENS_OF)
                .bind(account.as_str())
                .fetch_all(&self.pool)
                .await?;

            let mut owned = BTreeSet::new();
            for row in rows {
                let token_id: String = row.try_get("token_id")?;
                owned.insert(TokenId::from(token_id));
            }
            Ok(owned)
        })
    }

    fn has_owner_entry(&self, account: &AccountId) -> Result<bool, LedgerError> {
        self.rt.block_on(async {
            let row = sqlx::query(sql::HAS_OWNER_ENTRY)
                .bind(account.as_str())
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.is_some())
        })
    }

    fn put_pending(&self, record: &PendingResolution) -> Result<(), LedgerError> {
        let blob = bincode::serialize(record)?;

        self.rt.block_on(async {
            sqlx::query(sql::PUT_PENDING)
                .bind(record.notify_id.bytes().to_vec())
                .bind(record.token_id.as_str())
                .bind(record.is_resolved() as i64)
                .bind(blob)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
    }

    fn get_pending(&self, notify_id: &NotifyId) -> Result<Option<PendingResolution>, LedgerError> {
        self.rt.block_on(async {
            let row = sqlx::query(sql::GET_PENDING)
                .bind(notify_id.bytes().to_vec())
                .fetch_optional(&self.pool)
                .await?;

            match row {
                Some(row) => {
                    let blob: Vec<u8> = row.try_get("record")?;
                    Ok(Some(bincode::deserialize(&blob)?))
                }
                None => Ok(None),
            }
        })
    }

    fn pending_for_token(
        &self,
        token_id: &TokenId,
    ) -> Result<Option<PendingResolution>, LedgerError> {
        self.rt.block_on(async {
            let row = sqlx::query(sql::PENDING_FOR_TOKEN)
                .bind(token_id.as_str())
                .fetch_optional(&self.pool)
                .await?;

            match row {
                Some(row) => {
                    let blob: Vec<u8> = row.try_get("record")?;
                    Ok(Some(bincode::deserialize(&blob)?))
                }
                None => Ok(None),
            }
        })
    }

    fn prune_resolved(&self) -> Result<usize, LedgerError> {
        self.rt.block_on(async {
            let result = sqlx::query(sql::PRUNE_RESOLVED).execute(&self.pool).await?;
            Ok(result.rows_affected() as usize)
        })
    }
}
