use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_production_tables::Migration),
            Box::new(m20240301_000002_create_planning_tables::Migration),
            Box::new(m20240301_000003_create_hr_tables::Migration),
            Box::new(m20240301_000004_create_finance_tables::Migration),
            Box::new(m20240301_000005_create_sales_tables::Migration),
            Box::new(m20240301_000006_create_auth_tables::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_production_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_production_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionBatches::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ProductionBatches::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(ProductionBatches::BatchNumber)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ProductionBatches::ProductType).string_len(100).not_null())
                        .col(ColumnDef::new(ProductionBatches::SubstrateType).string_len(100).null())
                        .col(ColumnDef::new(ProductionBatches::SubstrateWeightKg).double().null())
                        .col(ColumnDef::new(ProductionBatches::Location).string_len(100).null())
                        .col(ColumnDef::new(ProductionBatches::CreationDate).date().not_null())
                        .col(ColumnDef::new(ProductionBatches::CreatedBy).string_len(50).null())
                        .col(ColumnDef::new(ProductionBatches::Notes).text().null())
                        .col(
                            ColumnDef::new(ProductionBatches::CurrentStage)
                                .string_len(32)
                                .not_null()
                                .default("batch_creation"),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::SupplyChainStage)
                                .string_len(32)
                                .not_null()
                                .default("farmer_delivery"),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::Status)
                                .string_len(20)
                                .not_null()
                                .default("active"),
                        )
                        .col(ColumnDef::new(ProductionBatches::InoculationDate).date().null())
                        .col(ColumnDef::new(ProductionBatches::SpawnType).string_len(100).null())
                        .col(ColumnDef::new(ProductionBatches::SpawnQuantityKg).double().null())
                        .col(ColumnDef::new(ProductionBatches::InoculatedBy).string_len(50).null())
                        .col(ColumnDef::new(ProductionBatches::InoculationNotes).text().null())
                        .col(ColumnDef::new(ProductionBatches::IncubationStartDate).date().null())
                        .col(ColumnDef::new(ProductionBatches::IncubationEndDate).date().null())
                        .col(ColumnDef::new(ProductionBatches::IncubationTemperatureC).double().null())
                        .col(ColumnDef::new(ProductionBatches::IncubationHumidity).double().null())
                        .col(ColumnDef::new(ProductionBatches::IncubationNotes).text().null())
                        .col(ColumnDef::new(ProductionBatches::FruitingStartDate).date().null())
                        .col(ColumnDef::new(ProductionBatches::FruitingTemperatureC).double().null())
                        .col(ColumnDef::new(ProductionBatches::FruitingHumidity).double().null())
                        .col(ColumnDef::new(ProductionBatches::FruitingNotes).text().null())
                        .col(ColumnDef::new(ProductionBatches::HarvestDate).date().null())
                        .col(ColumnDef::new(ProductionBatches::HarvestedWeightKg).double().null())
                        .col(ColumnDef::new(ProductionBatches::HarvestedBy).string_len(50).null())
                        .col(ColumnDef::new(ProductionBatches::HarvestNotes).text().null())
                        .col(ColumnDef::new(ProductionBatches::ProcessingDate).date().null())
                        .col(ColumnDef::new(ProductionBatches::PackagedWeightKg).double().null())
                        .col(ColumnDef::new(ProductionBatches::StorageLocation).string_len(100).null())
                        .col(ColumnDef::new(ProductionBatches::QualityGrade).string_len(20).null())
                        .col(ColumnDef::new(ProductionBatches::PostHarvestNotes).text().null())
                        .col(ColumnDef::new(ProductionBatches::CompletionDate).date().null())
                        .col(ColumnDef::new(ProductionBatches::ContaminationRate).double().null())
                        .col(
                            ColumnDef::new(ProductionBatches::RiskLevel)
                                .string_len(10)
                                .not_null()
                                .default("low"),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::RequiresApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::IsApproved)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::QualityCheckStatus)
                                .string_len(10)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(ProductionBatches::ApprovedBy).string_len(50).null())
                        .col(
                            ColumnDef::new(ProductionBatches::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(ProductionBatches::RejectionReason).text().null())
                        .col(ColumnDef::new(ProductionBatches::LastModifiedBy).string_len(50).null())
                        .col(
                            ColumnDef::new(ProductionBatches::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductionBatches::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_batches_current_stage")
                        .table(ProductionBatches::Table)
                        .col(ProductionBatches::CurrentStage)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_batches_requires_approval")
                        .table(ProductionBatches::Table)
                        .col(ProductionBatches::RequiresApproval)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ContaminationLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ContaminationLogs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ContaminationLogs::BatchId).uuid().not_null())
                        .col(
                            ColumnDef::new(ContaminationLogs::ContaminationType)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ContaminationLogs::DetectedDate).date().not_null())
                        .col(ColumnDef::new(ContaminationLogs::Severity).string_len(10).not_null())
                        .col(ColumnDef::new(ContaminationLogs::AffectedUnits).integer().null())
                        .col(ColumnDef::new(ContaminationLogs::Description).text().null())
                        .col(ColumnDef::new(ContaminationLogs::ActionTaken).text().null())
                        .col(ColumnDef::new(ContaminationLogs::ReportedBy).string_len(50).null())
                        .col(
                            ColumnDef::new(ContaminationLogs::IsVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(ContaminationLogs::VerifiedBy).string_len(50).null())
                        .col(
                            ColumnDef::new(ContaminationLogs::VerifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ContaminationLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_contamination_logs_batch")
                                .from(ContaminationLogs::Table, ContaminationLogs::BatchId)
                                .to(ProductionBatches::Table, ProductionBatches::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_contamination_logs_batch_id")
                        .table(ContaminationLogs::Table)
                        .col(ContaminationLogs::BatchId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ContaminationLogs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionBatches::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum ProductionBatches {
        Table,
        Id,
        BatchNumber,
        ProductType,
        SubstrateType,
        SubstrateWeightKg,
        Location,
        CreationDate,
        CreatedBy,
        Notes,
        CurrentStage,
        SupplyChainStage,
        Status,
        InoculationDate,
        SpawnType,
        SpawnQuantityKg,
        InoculatedBy,
        InoculationNotes,
        IncubationStartDate,
        IncubationEndDate,
        IncubationTemperatureC,
        IncubationHumidity,
        IncubationNotes,
        FruitingStartDate,
        FruitingTemperatureC,
        FruitingHumidity,
        FruitingNotes,
        HarvestDate,
        HarvestedWeightKg,
        HarvestedBy,
        HarvestNotes,
        ProcessingDate,
        PackagedWeightKg,
        StorageLocation,
        QualityGrade,
        PostHarvestNotes,
        CompletionDate,
        ContaminationRate,
        RiskLevel,
        RequiresApproval,
        IsApproved,
        QualityCheckStatus,
        ApprovedBy,
        ApprovedAt,
        RejectionReason,
        LastModifiedBy,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ContaminationLogs {
        Table,
        Id,
        BatchId,
        ContaminationType,
        DetectedDate,
        Severity,
        AffectedUnits,
        Description,
        ActionTaken,
        ReportedBy,
        IsVerified,
        VerifiedBy,
        VerifiedAt,
        CreatedAt,
    }
}

mod m20240301_000002_create_planning_tables {

    use super::m20240301_000001_create_production_tables::ProductionBatches;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_planning_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Milestones::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Milestones::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Milestones::Title).string_len(200).not_null())
                        .col(ColumnDef::new(Milestones::Description).text().null())
                        .col(ColumnDef::new(Milestones::BatchId).uuid().null())
                        .col(ColumnDef::new(Milestones::DueDate).date().null())
                        .col(ColumnDef::new(Milestones::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Milestones::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Milestones::CreatedBy).string_len(50).null())
                        .col(
                            ColumnDef::new(Milestones::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Milestones::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_milestones_batch")
                                .from(Milestones::Table, Milestones::BatchId)
                                .to(ProductionBatches::Table, ProductionBatches::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Tasks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Tasks::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Tasks::Title).string_len(200).not_null())
                        .col(ColumnDef::new(Tasks::Description).text().null())
                        .col(ColumnDef::new(Tasks::MilestoneId).uuid().null())
                        .col(ColumnDef::new(Tasks::BatchId).uuid().null())
                        .col(ColumnDef::new(Tasks::AssignedTo).string_len(50).null())
                        .col(ColumnDef::new(Tasks::Priority).string_len(10).not_null())
                        .col(ColumnDef::new(Tasks::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Tasks::DueDate).date().null())
                        .col(ColumnDef::new(Tasks::CompletedAt).timestamp_with_time_zone().null())
                        .col(ColumnDef::new(Tasks::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Tasks::UpdatedAt).timestamp_with_time_zone().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_tasks_milestone")
                                .from(Tasks::Table, Tasks::MilestoneId)
                                .to(Milestones::Table, Milestones::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_tasks_batch")
                                .from(Tasks::Table, Tasks::BatchId)
                                .to(ProductionBatches::Table, ProductionBatches::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_tasks_assigned_to")
                        .table(Tasks::Table)
                        .col(Tasks::AssignedTo)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Tasks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Milestones::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Milestones {
        Table,
        Id,
        Title,
        Description,
        BatchId,
        DueDate,
        Status,
        CompletedAt,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Tasks {
        Table,
        Id,
        Title,
        Description,
        MilestoneId,
        BatchId,
        AssignedTo,
        Priority,
        Status,
        DueDate,
        CompletedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_hr_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_hr_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Employees::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Employees::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Employees::EmployeeId)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Employees::FirstName).string_len(100).not_null())
                        .col(ColumnDef::new(Employees::LastName).string_len(100).not_null())
                        .col(ColumnDef::new(Employees::Email).string_len(255).null())
                        .col(ColumnDef::new(Employees::Phone).string_len(30).null())
                        .col(ColumnDef::new(Employees::Position).string_len(100).not_null())
                        .col(ColumnDef::new(Employees::Department).string_len(100).null())
                        .col(ColumnDef::new(Employees::HireDate).date().not_null())
                        .col(ColumnDef::new(Employees::HourlyRate).decimal_len(12, 2).null())
                        .col(ColumnDef::new(Employees::MonthlySalary).decimal_len(12, 2).null())
                        .col(ColumnDef::new(Employees::Status).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Employees::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Employees::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Attendance::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Attendance::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Attendance::EmployeeId).uuid().not_null())
                        .col(ColumnDef::new(Attendance::Date).date().not_null())
                        .col(ColumnDef::new(Attendance::Status).string_len(10).not_null())
                        .col(ColumnDef::new(Attendance::CheckInTime).time().null())
                        .col(ColumnDef::new(Attendance::CheckOutTime).time().null())
                        .col(ColumnDef::new(Attendance::HoursWorked).double().null())
                        .col(ColumnDef::new(Attendance::Notes).text().null())
                        .col(ColumnDef::new(Attendance::RecordedBy).string_len(50).null())
                        .col(
                            ColumnDef::new(Attendance::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_attendance_employee")
                                .from(Attendance::Table, Attendance::EmployeeId)
                                .to(Employees::Table, Employees::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One attendance row per employee per day
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_attendance_employee_date")
                        .table(Attendance::Table)
                        .col(Attendance::EmployeeId)
                        .col(Attendance::Date)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Payroll::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payroll::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Payroll::EmployeeId).uuid().not_null())
                        .col(ColumnDef::new(Payroll::PeriodStart).date().not_null())
                        .col(ColumnDef::new(Payroll::PeriodEnd).date().not_null())
                        .col(ColumnDef::new(Payroll::BasePay).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Payroll::OvertimePay)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Payroll::Deductions)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Payroll::NetPay).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Payroll::Status).string_len(10).not_null())
                        .col(ColumnDef::new(Payroll::PaidAt).timestamp_with_time_zone().null())
                        .col(
                            ColumnDef::new(Payroll::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payroll_employee")
                                .from(Payroll::Table, Payroll::EmployeeId)
                                .to(Employees::Table, Employees::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payroll::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Attendance::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Employees::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Employees {
        Table,
        Id,
        EmployeeId,
        FirstName,
        LastName,
        Email,
        Phone,
        Position,
        Department,
        HireDate,
        HourlyRate,
        MonthlySalary,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Attendance {
        Table,
        Id,
        EmployeeId,
        Date,
        Status,
        CheckInTime,
        CheckOutTime,
        HoursWorked,
        Notes,
        RecordedBy,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Payroll {
        Table,
        Id,
        EmployeeId,
        PeriodStart,
        PeriodEnd,
        BasePay,
        OvertimePay,
        Deductions,
        NetPay,
        Status,
        PaidAt,
        CreatedAt,
    }
}

mod m20240301_000004_create_finance_tables {

    use super::m20240301_000001_create_production_tables::ProductionBatches;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_finance_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FinancialTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FinancialTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FinancialTransactions::TransactionType)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FinancialTransactions::Category)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FinancialTransactions::Amount)
                                .decimal_len(14, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FinancialTransactions::TransactionDate)
                                .date()
                                .not_null(),
                        )
                        .col(ColumnDef::new(FinancialTransactions::Description).text().null())
                        .col(
                            ColumnDef::new(FinancialTransactions::Reference)
                                .string_len(100)
                                .null(),
                        )
                        .col(ColumnDef::new(FinancialTransactions::BatchId).uuid().null())
                        .col(
                            ColumnDef::new(FinancialTransactions::RecordedBy)
                                .string_len(50)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(FinancialTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_financial_transactions_batch")
                                .from(FinancialTransactions::Table, FinancialTransactions::BatchId)
                                .to(ProductionBatches::Table, ProductionBatches::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_financial_transactions_date")
                        .table(FinancialTransactions::Table)
                        .col(FinancialTransactions::TransactionDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FinancialTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FinancialTransactions {
        Table,
        Id,
        TransactionType,
        Category,
        Amount,
        TransactionDate,
        Description,
        Reference,
        BatchId,
        RecordedBy,
        CreatedAt,
    }
}

mod m20240301_000005_create_sales_tables {

    use super::m20240301_000001_create_production_tables::ProductionBatches;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_sales_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Customers::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Customers::Email).string_len(255).null())
                        .col(ColumnDef::new(Customers::Phone).string_len(30).null())
                        .col(ColumnDef::new(Customers::Address).text().null())
                        .col(ColumnDef::new(Customers::CustomerType).string_len(50).null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Products::Name).string_len(200).not_null())
                        .col(ColumnDef::new(Products::Category).string_len(100).null())
                        .col(ColumnDef::new(Products::Unit).string_len(20).not_null())
                        .col(ColumnDef::new(Products::UnitPrice).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Products::StockQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string_len(32)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::ProductId).uuid().null())
                        .col(ColumnDef::new(Orders::BatchId).uuid().null())
                        .col(ColumnDef::new(Orders::Quantity).decimal_len(12, 3).not_null())
                        .col(ColumnDef::new(Orders::UnitPrice).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal_len(14, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                        .col(ColumnDef::new(Orders::OrderDate).date().not_null())
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::CreatedBy).string_len(50).null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_customer")
                                .from(Orders::Table, Orders::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_product")
                                .from(Orders::Table, Orders::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_batch")
                                .from(Orders::Table, Orders::BatchId)
                                .to(ProductionBatches::Table, ProductionBatches::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        Name,
        Email,
        Phone,
        Address,
        CustomerType,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Sku,
        Name,
        Category,
        Unit,
        UnitPrice,
        StockQuantity,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        CustomerId,
        ProductId,
        BatchId,
        Quantity,
        UnitPrice,
        TotalAmount,
        Status,
        OrderDate,
        Notes,
        CreatedBy,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000006_create_auth_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_auth_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::EmployeeId).string_len(50).null().unique_key())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(16)
                                .not_null()
                                .default("worker"),
                        )
                        .col(
                            ColumnDef::new(Users::EmailVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Users::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Users::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AuthTokens::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AuthTokens::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(AuthTokens::UserId).uuid().not_null())
                        .col(ColumnDef::new(AuthTokens::Purpose).string_len(24).not_null())
                        .col(
                            ColumnDef::new(AuthTokens::TokenHash)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(AuthTokens::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AuthTokens::ConsumedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AuthTokens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_auth_tokens_user")
                                .from(AuthTokens::Table, AuthTokens::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuthTokens::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Name,
        Email,
        EmployeeId,
        PasswordHash,
        Role,
        EmailVerified,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum AuthTokens {
        Table,
        Id,
        UserId,
        Purpose,
        TokenHash,
        ExpiresAt,
        ConsumedAt,
        CreatedAt,
    }
}
