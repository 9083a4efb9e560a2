/*!
 * Scoped transaction helper
 *
 * Every store write runs as `Begun -> {mutations} -> Committed`. Any error,
 * including a failed commit, ends in `RolledBack`; a failed rollback is
 * logged and the original error is what the caller sees.
 */

use crate::errors::{DbStage, ServiceError};
pub use futures::future::BoxFuture;
use metrics::counter;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tracing::{debug, error, warn};

/// Terminal and intermediate states of a store transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Begun,
    Committed,
    RolledBack,
}

/// Execute `f` inside a database transaction labelled `operation`.
///
/// # Example
///
/// ```rust,ignore
/// let id = run_in_transaction(&db, "insert_order", |txn| {
///     Box::pin(async move {
///         order.insert(txn).await.map_err(|e| ServiceError::database(DbStage::InsertOrder, e))?;
///         Ok(id)
///     })
/// })
/// .await?;
/// ```
pub async fn run_in_transaction<F, T>(
    db: &DatabaseConnection,
    operation: &'static str,
    f: F,
) -> Result<T, ServiceError>
where
    F: for<'a> FnOnce(&'a DatabaseTransaction) -> BoxFuture<'a, Result<T, ServiceError>> + Send,
    T: Send,
{
    let txn = db.begin().await.map_err(|e| {
        error!(operation, error = %e, "Failed to begin transaction");
        ServiceError::database(DbStage::Begin, e)
    })?;
    debug!(operation, state = ?TxnState::Begun, "Transaction started");

    let outcome = f(&txn).await;

    match outcome {
        Ok(value) => match txn.commit().await {
            Ok(()) => {
                debug!(operation, state = ?TxnState::Committed, "Transaction committed");
                counter!("ubl_db.transactions.committed", 1);
                Ok(value)
            }
            Err(e) => {
                // commit() consumes the transaction; the driver rolls the
                // connection back when the failed transaction is dropped.
                error!(
                    operation,
                    error = %e,
                    state = ?TxnState::RolledBack,
                    "Failed to commit transaction"
                );
                counter!("ubl_db.transactions.rolled_back", 1);
                Err(ServiceError::database(DbStage::Commit, e))
            }
        },
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!(
                    operation,
                    error = %rollback_err,
                    original_error = %err,
                    "Failed to roll back transaction"
                );
            } else {
                warn!(
                    operation,
                    error = %err,
                    state = ?TxnState::RolledBack,
                    "Transaction rolled back"
                );
            }
            counter!("ubl_db.transactions.rolled_back", 1);
            Err(err)
        }
    }
}
