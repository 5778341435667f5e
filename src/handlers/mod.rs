pub mod auth;
pub mod common;
pub mod users;

// Production workflow
pub mod contamination_logs;
pub mod production_batches;

// Operations
pub mod dashboard;
pub mod finance;
pub mod hr;
pub mod planning;
pub mod sales;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::repositories::{
    ContaminationLogRepository, ProductionBatchRepository, SeaOrmContaminationLogRepository,
    SeaOrmProductionBatchRepository,
};
use crate::services::{
    contamination::ContaminationService,
    dashboard::DashboardService,
    finance::FinanceService,
    hr::HrService,
    notifications::Notifier,
    planning::PlanningService,
    production_batches::ProductionBatchService,
    sales::SalesService,
    users::{AccountService, AccountSettings},
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub production_batches: Arc<ProductionBatchService>,
    pub contamination: Arc<ContaminationService>,
    pub planning: Arc<PlanningService>,
    pub finance: Arc<FinanceService>,
    pub hr: Arc<HrService>,
    pub sales: Arc<SalesService>,
    pub dashboard: Arc<DashboardService>,
    pub accounts: Arc<AccountService>,
}

impl AppServices {
    /// Wires every service against one connection pool and event channel.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        notifier: Arc<dyn Notifier>,
        account_settings: AccountSettings,
    ) -> Self {
        let batch_repo: Arc<dyn ProductionBatchRepository> =
            Arc::new(SeaOrmProductionBatchRepository::new(db_pool.clone()));
        let log_repo: Arc<dyn ContaminationLogRepository> =
            Arc::new(SeaOrmContaminationLogRepository::new(db_pool.clone()));

        let production_batches = ProductionBatchService::new(
            batch_repo.clone(),
            log_repo.clone(),
            event_sender.clone(),
        );
        let contamination = ContaminationService::new(log_repo, batch_repo, event_sender.clone());
        let dashboard = DashboardService::new(production_batches.clone(), contamination.clone());

        Self {
            production_batches: Arc::new(production_batches),
            contamination: Arc::new(contamination),
            planning: Arc::new(PlanningService::new(db_pool.clone())),
            finance: Arc::new(FinanceService::new(db_pool.clone(), event_sender.clone())),
            hr: Arc::new(HrService::new(db_pool.clone(), event_sender.clone())),
            sales: Arc::new(SalesService::new(db_pool.clone(), event_sender.clone())),
            dashboard: Arc::new(dashboard),
            accounts: Arc::new(AccountService::new(
                db_pool,
                auth_service,
                notifier,
                event_sender,
                account_settings,
            )),
        }
    }
}
