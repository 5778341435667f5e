use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod contamination_log_repository;
pub mod production_batch_repository;

pub use contamination_log_repository::{ContaminationLogRepository, SeaOrmContaminationLogRepository};
pub use production_batch_repository::{BatchFilter, ProductionBatchRepository, SeaOrmProductionBatchRepository};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
