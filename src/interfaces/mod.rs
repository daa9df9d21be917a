pub mod accrual_store;
pub mod account_store;
pub mod transaction_store;
pub mod ledger_writer;
pub mod status_source;
