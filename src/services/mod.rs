// Production workflow
pub mod contamination;
pub mod production_batches;

// Operations
pub mod dashboard;
pub mod finance;
pub mod hr;
pub mod planning;
pub mod sales;

// Accounts
pub mod notifications;
pub mod users;
