use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::interfaces::account_store::AccountStore;
use crate::interfaces::accrual_store::AccrualStore;
use crate::interfaces::ledger_writer::{CreditRequest, DebitRequest, LedgerWriter};
use crate::interfaces::transaction_store::TransactionStore;
use crate::model::account::Account;
use crate::model::accrual::{Accrual, AccrualStatus};
use crate::model::transaction::{Transaction, TransactionKind};
use crate::types::ids::{TransactionId, UserId};
use crate::types::order_number::OrderNumber;
use crate::types::points::Points;

const ACCRUAL_COLUMNS: &str = "order_number, user_guid, status, accrual, uploaded_at";
const TRANSACTION_COLUMNS: &str = "guid, account_guid, order_number, type, sum, processed_at";

type PgTransaction<'c> = sqlx::Transaction<'c, Postgres>;

/// Postgres-backed store. Ledger writes each run in one database transaction;
/// returning early drops the transaction, which rolls it back.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let dsn = config.dsn.as_deref()
            .ok_or_else(|| Error::ConfigError("database.dsn is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(dsn)
            .await?;

        Ok(PgStore { pool })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn status_names(statuses: &[AccrualStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn accrual_from_row(row: &PgRow) -> Result<Accrual> {
    let status: String = row.try_get("status")?;
    Ok(Accrual {
        order_number: OrderNumber::from_stored(row.try_get("order_number")?),
        user_id: UserId(row.try_get("user_guid")?),
        status: AccrualStatus::from_db(&status)?,
        accrual: Points::from_raw(row.try_get("accrual")?),
        uploaded_at: row.try_get("uploaded_at")?,
    })
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    Ok(Account {
        guid: UserId(row.try_get("guid")?),
        balance: Points::from_raw(row.try_get("balance")?),
        withdrawn_sum: Points::from_raw(row.try_get("withdraw_sum")?),
        updated_at: row.try_get("updated_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction> {
    let kind: String = row.try_get("type")?;
    let order_number: Option<String> = row.try_get("order_number")?;
    Ok(Transaction {
        guid: TransactionId(row.try_get("guid")?),
        account_guid: UserId(row.try_get("account_guid")?),
        order_number: order_number.map(OrderNumber::from_stored),
        kind: TransactionKind::from_db(&kind)?,
        sum: Points::from_raw(row.try_get("sum")?),
        processed_at: row.try_get("processed_at")?,
    })
}

/// Explains why a status-guarded update touched no row.
async fn guard_failure(tx: &mut PgTransaction<'_>, order_number: &OrderNumber) -> Error {
    let exists = sqlx::query("SELECT 1 FROM accruals WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(&mut **tx)
        .await;

    match exists {
        Ok(Some(_)) => Error::OrderAlreadyFinalized(order_number.clone()),
        Ok(None) => Error::OrderNotFound(order_number.clone()),
        Err(e) => Error::Database(e),
    }
}

async fn insert_transaction(tx: &mut PgTransaction<'_>, transaction: &Transaction) -> Result<()> {
    let query = format!(
        "INSERT INTO transactions ({}) VALUES ($1, $2, $3, $4, $5, $6)",
        TRANSACTION_COLUMNS
    );
    sqlx::query(&query)
        .bind(transaction.guid.0)
        .bind(transaction.account_guid.0)
        .bind(transaction.order_number.as_ref().map(|n| n.as_str()))
        .bind(transaction.kind.as_str())
        .bind(transaction.sum.raw_value())
        .bind(transaction.processed_at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl AccrualStore for PgStore {
    async fn accrual_by_order_number(&self, order_number: &OrderNumber) -> Result<Option<Accrual>> {
        let query = format!("SELECT {} FROM accruals WHERE order_number = $1", ACCRUAL_COLUMNS);
        let row = sqlx::query(&query)
            .bind(order_number.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(accrual_from_row).transpose()
    }

    async fn accruals_by_user(&self, user_id: UserId) -> Result<Vec<Accrual>> {
        let query = format!(
            "SELECT {} FROM accruals WHERE user_guid = $1 ORDER BY uploaded_at DESC",
            ACCRUAL_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(user_id.0)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(accrual_from_row).collect()
    }

    async fn accruals_in_work(&self) -> Result<Vec<Accrual>> {
        let query = format!(
            "SELECT {} FROM accruals WHERE status = ANY($1) ORDER BY uploaded_at",
            ACCRUAL_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(status_names(&AccrualStatus::IN_WORK))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(accrual_from_row).collect()
    }

    async fn insert_accrual(&self, accrual: &Accrual) -> Result<()> {
        let query = format!(
            "INSERT INTO accruals ({}) VALUES ($1, $2, $3, $4, $5) ON CONFLICT (order_number) DO NOTHING",
            ACCRUAL_COLUMNS
        );
        let inserted = sqlx::query(&query)
            .bind(accrual.order_number.as_str())
            .bind(accrual.user_id.0)
            .bind(accrual.status.as_str())
            .bind(accrual.accrual.raw_value())
            .bind(accrual.uploaded_at)
            .execute(&self.pool)
            .await?;

        if inserted.rows_affected() == 0 {
            return Err(Error::OrderAlreadyUploaded(accrual.order_number.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn account(&self, guid: UserId) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT guid, balance, withdraw_sum, updated_at FROM accounts WHERE guid = $1")
            .bind(guid.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }
}

#[async_trait]
impl TransactionStore for PgStore {
    async fn transactions(&self, account_guid: UserId, kind: TransactionKind) -> Result<Vec<Transaction>> {
        let query = format!(
            "SELECT {} FROM transactions WHERE account_guid = $1 AND type = $2 ORDER BY processed_at DESC",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(account_guid.0)
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(transaction_from_row).collect()
    }
}

#[async_trait]
impl LedgerWriter for PgStore {
    async fn credit(&self, request: &CreditRequest) -> Result<Transaction> {
        if !request.amount.is_positive() {
            return Err(Error::InvalidSum(request.amount));
        }

        let mut tx = self.pool.begin().await?;
        let now: DateTime<Utc> = Utc::now();

        let updated = sqlx::query(
            "UPDATE accruals SET status = $1, accrual = $2 WHERE order_number = $3 AND status = ANY($4)",
        )
            .bind(request.status.as_str())
            .bind(request.amount.raw_value())
            .bind(request.order_number.as_str())
            .bind(status_names(&request.status.predecessors()))
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(guard_failure(&mut tx, &request.order_number).await);
        }

        sqlx::query(
            "INSERT INTO accounts (guid, balance, withdraw_sum, updated_at) VALUES ($1, $2, 0, $3) \
             ON CONFLICT (guid) DO UPDATE \
             SET balance = accounts.balance + EXCLUDED.balance, updated_at = EXCLUDED.updated_at",
        )
            .bind(request.user_id.0)
            .bind(request.amount.raw_value())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let transaction = Transaction::credit(request.user_id, request.order_number.clone(), request.amount);
        insert_transaction(&mut tx, &transaction).await.map_err(|e| {
            if e.is_unique_violation() {
                Error::OrderAlreadyFinalized(request.order_number.clone())
            } else {
                e
            }
        })?;

        tx.commit().await?;
        Ok(transaction)
    }

    async fn debit(&self, request: &DebitRequest) -> Result<Transaction> {
        if !request.amount.is_positive() {
            return Err(Error::InvalidSum(request.amount));
        }

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE accounts SET balance = balance - $2, withdraw_sum = withdraw_sum + $2, updated_at = $3 \
             WHERE guid = $1 AND balance >= $2",
        )
            .bind(request.account_guid.0)
            .bind(request.amount.raw_value())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            let available: Option<i64> = sqlx::query_scalar("SELECT balance FROM accounts WHERE guid = $1")
                .bind(request.account_guid.0)
                .fetch_optional(&mut *tx)
                .await?;

            return Err(Error::InsufficientBalance {
                requested: request.amount,
                available: available.map(Points::from_raw).unwrap_or_default(),
            });
        }

        let transaction = Transaction::debit(request.account_guid, request.order_number.clone(), request.amount);
        insert_transaction(&mut tx, &transaction).await?;

        tx.commit().await?;
        Ok(transaction)
    }

    async fn update_status(&self, order_number: &OrderNumber, status: AccrualStatus) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE accruals SET status = $1 WHERE order_number = $2 AND status = ANY($3)")
            .bind(status.as_str())
            .bind(order_number.as_str())
            .bind(status_names(&status.predecessors()))
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(guard_failure(&mut tx, order_number).await);
        }

        tx.commit().await?;
        Ok(())
    }
}
