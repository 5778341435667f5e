use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use farmops_api::{
    auth::{AuthConfig, AuthService},
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::user::UserRole,
    events::{Event, EventSender},
    openapi::ApiDocV1,
    services::{
        notifications::LogNotifier,
        users::{AccountService, AccountSettings, RegisterRequest},
    },
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(name = "farmops-admin", about = "Administrative tasks for the FarmOps API", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create an account with any role, bypassing self-registration
    CreateUser(CreateUserArgs),
    /// List accounts
    ListUsers(ListUsersArgs),
    /// Write the OpenAPI document to disk
    Openapi(OpenapiArgs),
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long, value_enum, default_value_t = RoleArg::Worker)]
    role: RoleArg,
    #[arg(long)]
    employee_id: Option<String>,
}

#[derive(Args)]
struct ListUsersArgs {
    #[arg(long, default_value_t = 1)]
    page: u64,
    #[arg(long, default_value_t = 50)]
    limit: u64,
}

#[derive(Args)]
struct OpenapiArgs {
    #[arg(long, default_value = "openapi/farmops-api.v1.json")]
    output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Admin,
    Manager,
    Worker,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => UserRole::Admin,
            RoleArg::Manager => UserRole::Manager,
            RoleArg::Worker => UserRole::Worker,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Exporting the document needs neither config nor a database
    if let Commands::Openapi(args) = &cli.command {
        return export_openapi(&args.output);
    }

    let context = AdminContext::initialize().await?;
    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::CreateUser(args) => create_user(&context, args, cli.json).await?,
        Commands::ListUsers(args) => list_users(&context, args, cli.json).await?,
        Commands::Openapi(_) => {}
    }

    Ok(())
}

struct AdminContext {
    config: AppConfig,
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl AdminContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        let (event_tx, mut event_rx) = mpsc::channel::<Event>(32);
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(target: "farmops_admin", event = ?event, "received async event");
            }
        });

        Ok(Self {
            config,
            db: Arc::new(db_pool),
            event_sender: Arc::new(EventSender::new(event_tx)),
        })
    }

    fn account_service(&self) -> AccountService {
        let auth = Arc::new(AuthService::new(AuthConfig::from_app_config(&self.config)));
        AccountService::new(
            self.db.clone(),
            auth,
            Arc::new(LogNotifier::new(self.config.mail_from.clone())),
            self.event_sender.clone(),
            AccountSettings::from_app_config(&self.config),
        )
    }
}

async fn create_user(context: &AdminContext, args: CreateUserArgs, json: bool) -> Result<()> {
    let request = RegisterRequest {
        name: args.name,
        email: args.email,
        password: args.password,
        employee_id: args.employee_id,
    };
    let user = context
        .account_service()
        .create_user(request, args.role.into(), true)
        .await
        .context("failed to create user")?;

    if json {
        print_json(&user)?;
    } else {
        println!("Created {} account {} (id {})", user.role, user.email, user.id);
    }
    Ok(())
}

async fn list_users(context: &AdminContext, args: ListUsersArgs, json: bool) -> Result<()> {
    let (users, total) = context
        .account_service()
        .list(args.page, args.limit)
        .await
        .context("failed to list users")?;

    if json {
        print_json(&users)?;
        return Ok(());
    }

    println!("{} account(s)", total);
    for user in users {
        println!(
            "- {} <{}> • role {} • {}",
            user.name,
            user.email,
            user.role,
            if user.is_active { "active" } else { "inactive" }
        );
    }
    Ok(())
}

fn export_openapi(output: &PathBuf) -> Result<()> {
    let json = serde_json::to_string_pretty(&ApiDocV1::openapi())?;
    if let Some(dir) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    fs::write(output, json).with_context(|| format!("failed to write {}", output.display()))?;
    println!("OpenAPI spec written to {}", output.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
