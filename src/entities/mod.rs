pub mod attendance;
pub mod auth_token;
pub mod contamination_log;
pub mod customer;
pub mod employee;
pub mod financial_transaction;
pub mod milestone;
pub mod order;
pub mod payroll;
pub mod product;
pub mod production_batch;
pub mod task;
pub mod user;
