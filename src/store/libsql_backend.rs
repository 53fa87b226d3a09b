//! libSQL backend — async `AccountStore` implementation.
//!
//! Supports local file and in-memory databases. Accounts for every partition
//! live in one table keyed by (partition, uid); a unique index on `email`
//! spans partitions.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::onboarding::model::{AccountRecord, AccountStatus, Partition, ProfileDetails};
use crate::store::migrations;
use crate::store::traits::{AccountFilter, AccountStore, AccountUpdate, CreateOutcome};

/// libSQL account store.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Account database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse a stored timestamp: RFC 3339 (our write format) or SQLite's
/// `datetime()` output.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ndt.and_utc());
        }
    }
    Err(DatabaseError::Serialization(format!("unreadable timestamp '{s}'")))
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const ACCOUNT_COLUMNS: &str = "partition, uid, email, display_name, username, photo_url, email_verified, created_at, status, sign_up_methods, father_name, cnic, dob, phone, user_type, payment_method, profile_completed_at";

/// Read a nullable TEXT column. Only SQL NULL counts as absent.
fn opt_text_column(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get_value(idx) {
        Ok(libsql::Value::Null) => Ok(None),
        Ok(libsql::Value::Text(s)) => Ok(Some(s)),
        Ok(other) => Err(DatabaseError::Serialization(format!(
            "account column {idx}: expected text, found {other:?}"
        ))),
        Err(e) => Err(DatabaseError::Query(format!("account column {idx}: {e}"))),
    }
}

/// Map a libsql Row to an AccountRecord. Column order matches ACCOUNT_COLUMNS.
fn row_to_account(row: &libsql::Row) -> Result<AccountRecord, DatabaseError> {
    let get_text = |idx: i32| -> Result<String, DatabaseError> {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Query(format!("account column {idx}: {e}")))
    };

    let partition: Partition = get_text(0)?.parse().map_err(DatabaseError::Serialization)?;
    let status: Option<AccountStatus> = opt_text_column(row, 8)?
        .map(|s| s.parse::<AccountStatus>().map_err(DatabaseError::Serialization))
        .transpose()?;
    let sign_up_methods: Vec<String> = serde_json::from_str(&get_text(9)?)
        .map_err(|e| DatabaseError::Serialization(format!("sign_up_methods: {e}")))?;
    let email_verified = row
        .get::<i64>(6)
        .map_err(|e| DatabaseError::Query(format!("account column 6: {e}")))?
        != 0;

    // Profile columns are written together, so either all or none are set.
    let profile_cols = (10..16)
        .map(|i| opt_text_column(row, i))
        .collect::<Result<Vec<_>, _>>()?;
    let profile = match profile_cols.as_slice() {
        [Some(father_name), Some(cnic), Some(dob), Some(phone), Some(user_type), Some(payment_method)] => {
            Some(ProfileDetails {
                father_name: father_name.clone(),
                cnic: cnic.clone(),
                dob: dob.clone(),
                phone: phone.clone(),
                user_type: user_type.clone(),
                payment_method: payment_method.clone(),
            })
        }
        _ => None,
    };

    Ok(AccountRecord {
        partition,
        uid: get_text(1)?,
        email: get_text(2)?,
        display_name: get_text(3)?,
        username: get_text(4)?,
        photo_url: opt_text_column(row, 5)?,
        email_verified,
        created_at: parse_datetime(&get_text(7)?)?,
        status,
        profile,
        profile_completed_at: opt_text_column(row, 16)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
        sign_up_methods,
    })
}

async fn collect_accounts(mut rows: libsql::Rows) -> Result<Vec<AccountRecord>, DatabaseError> {
    let mut accounts = Vec::new();
    loop {
        match rows.next().await {
            Ok(Some(row)) => accounts.push(row_to_account(&row)?),
            Ok(None) => break,
            Err(e) => return Err(DatabaseError::Query(format!("query row: {e}"))),
        }
    }
    Ok(accounts)
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl AccountStore for LibSqlStore {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn get(
        &self,
        partition: Partition,
        uid: &str,
    ) -> Result<Option<AccountRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE partition = ?1 AND uid = ?2"),
                params![partition.as_str(), uid],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_account: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_account(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_account: {e}"))),
        }
    }

    async fn create(&self, record: &AccountRecord) -> Result<CreateOutcome, DatabaseError> {
        let methods = serde_json::to_string(&record.sign_up_methods)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        let inserted = self
            .conn()
            .execute(
                "INSERT OR IGNORE INTO accounts (partition, uid, email, display_name, username, photo_url, email_verified, created_at, status, sign_up_methods)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.partition.as_str(),
                    record.uid.as_str(),
                    record.email.as_str(),
                    record.display_name.as_str(),
                    record.username.as_str(),
                    opt_text(record.photo_url.as_deref()),
                    record.email_verified as i64,
                    record.created_at.to_rfc3339(),
                    opt_text(record.status.as_ref().map(AccountStatus::as_str)),
                    methods,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_account: {e}")))?;

        if inserted > 0 {
            debug!(partition = %record.partition, uid = %record.uid, "Account created");
            return Ok(CreateOutcome::Created);
        }

        // Ignored: tell the two unique constraints apart.
        if self.get(record.partition, &record.uid).await?.is_some() {
            Ok(CreateOutcome::KeyTaken)
        } else {
            Ok(CreateOutcome::EmailTaken)
        }
    }

    async fn update(
        &self,
        partition: Partition,
        uid: &str,
        update: &AccountUpdate,
    ) -> Result<bool, DatabaseError> {
        let changed = match update {
            AccountUpdate::SubmitProfile {
                profile,
                completed_at,
            } => self
                .conn()
                .execute(
                    "UPDATE accounts SET father_name = ?3, cnic = ?4, dob = ?5, phone = ?6, user_type = ?7,
                        payment_method = ?8, status = 'pending', profile_completed_at = ?9
                     WHERE partition = ?1 AND uid = ?2 AND (status IS NULL OR status = 'profile_pending')",
                    params![
                        partition.as_str(),
                        uid,
                        profile.father_name.as_str(),
                        profile.cnic.as_str(),
                        profile.dob.as_str(),
                        profile.phone.as_str(),
                        profile.user_type.as_str(),
                        profile.payment_method.as_str(),
                        completed_at.to_rfc3339(),
                    ],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("submit_profile: {e}")))?,
            AccountUpdate::Approve => self
                .conn()
                .execute(
                    "UPDATE accounts SET status = 'approved'
                     WHERE partition = ?1 AND uid = ?2 AND status = 'pending'",
                    params![partition.as_str(), uid],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("approve_account: {e}")))?,
        };

        debug!(partition = %partition, uid, applied = changed > 0, "Account update");
        Ok(changed > 0)
    }

    async fn query(
        &self,
        partition: Partition,
        filter: &AccountFilter,
    ) -> Result<Vec<AccountRecord>, DatabaseError> {
        let conn = self.conn();
        let rows = match filter {
            AccountFilter::Email(email) => {
                conn.query(
                    &format!(
                        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE partition = ?1 AND email = ?2 ORDER BY created_at"
                    ),
                    params![partition.as_str(), email.as_str()],
                )
                .await
            }
            AccountFilter::Status(Some(status)) => {
                conn.query(
                    &format!(
                        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE partition = ?1 AND status = ?2 ORDER BY created_at"
                    ),
                    params![partition.as_str(), status.as_str()],
                )
                .await
            }
            AccountFilter::Status(None) => {
                conn.query(
                    &format!(
                        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE partition = ?1 AND status IS NULL ORDER BY created_at"
                    ),
                    params![partition.as_str()],
                )
                .await
            }
        }
        .map_err(|e| DatabaseError::Query(format!("query_accounts: {e}")))?;

        collect_accounts(rows).await
    }
}
