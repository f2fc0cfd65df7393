use crate::{db_types::PushTransaction, push_payment::PushStatus, stl_api::errors::StoreError};

#[allow(async_fn_in_trait)]
pub trait PushTransactionStore: Clone {
    /// Save a newly initiated push transaction. Inserting a transaction id that already exists is an error.
    async fn insert_push_transaction(&self, transaction: &PushTransaction) -> Result<(), StoreError>;

    async fn fetch_push_transaction(&self, transaction_id: &str) -> Result<Option<PushTransaction>, StoreError>;

    /// Move the transaction from `expected` to `status`, recording the raw network code that produced it. The write
    /// only happens if the stored status is still `expected`; otherwise [`StoreError::StatusChanged`] carries the
    /// status found. Returns the updated record, or [`StoreError::NotFound`] if there is no such transaction.
    async fn update_push_status(
        &self,
        transaction_id: &str,
        expected: PushStatus,
        status: PushStatus,
        raw_code: Option<&str>,
    ) -> Result<PushTransaction, StoreError>;

    /// All transactions that are not in a terminal state, oldest first.
    async fn fetch_open_push_transactions(&self) -> Result<Vec<PushTransaction>, StoreError>;
}
