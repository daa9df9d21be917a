pub mod accrual;
pub mod account;
pub mod transaction;
