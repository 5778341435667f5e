use chrono::{Duration, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::{generate_token, hash_password, hash_token, verify_password};
use crate::auth::{AuthService, TokenResponse};
use crate::config::AppConfig;
use crate::db::{with_transaction, DbPool};
use crate::entities::auth_token::{self, Entity as AuthToken, TokenPurpose};
use crate::entities::user::{self, Entity as User, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::notifications::{MessageKind, Notifier, OutboundMessage};
use crate::workflow::payload::lenient;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    #[validate(length(min = 1, max = 50))]
    pub employee_id: Option<String>,
}

/// `identifier` is an email address or an employee id.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    #[serde(alias = "email", alias = "employeeId")]
    pub identifier: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 256))]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, max = 256))]
    pub token: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub role: UserRole,
}

/// Account settings read from configuration.
#[derive(Debug, Clone)]
pub struct AccountSettings {
    pub require_email_verification: bool,
    pub verification_ttl: Duration,
    pub reset_ttl: Duration,
    pub frontend_url: String,
}

impl AccountSettings {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            require_email_verification: cfg.require_email_verification,
            verification_ttl: Duration::hours(cfg.verification_token_ttl_hours),
            reset_ttl: Duration::minutes(cfg.reset_token_ttl_minutes),
            frontend_url: cfg.frontend_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Accounts, sessions and the single-use token flows.
#[derive(Clone)]
pub struct AccountService {
    db_pool: Arc<DbPool>,
    auth: Arc<AuthService>,
    notifier: Arc<dyn Notifier>,
    event_sender: Arc<EventSender>,
    settings: AccountSettings,
}

impl AccountService {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth: Arc<AuthService>,
        notifier: Arc<dyn Notifier>,
        event_sender: Arc<EventSender>,
        settings: AccountSettings,
    ) -> Self {
        Self {
            db_pool,
            auth,
            notifier,
            event_sender,
            settings,
        }
    }

    async fn ensure_unique(&self, email: &str, employee_id: Option<&str>) -> Result<(), ServiceError> {
        let email_taken = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db_pool)
            .await?
            .is_some();
        if email_taken {
            return Err(ServiceError::Conflict("Email is already registered".into()));
        }
        if let Some(employee_id) = employee_id {
            let id_taken = User::find()
                .filter(user::Column::EmployeeId.eq(employee_id))
                .one(&*self.db_pool)
                .await?
                .is_some();
            if id_taken {
                return Err(ServiceError::Conflict("Employee id is already registered".into()));
            }
        }
        Ok(())
    }

    /// Creates an account with the given role. Self-service registration
    /// always passes `UserRole::Worker`.
    pub async fn create_user(
        &self,
        request: RegisterRequest,
        role: UserRole,
        email_verified: bool,
    ) -> Result<user::Model, ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();
        let employee_id = request.employee_id.map(|id| id.trim().to_string());
        self.ensure_unique(&email, employee_id.as_deref()).await?;

        let model = user::ActiveModel {
            name: Set(request.name.trim().to_string()),
            email: Set(email),
            employee_id: Set(employee_id),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(role),
            email_verified: Set(email_verified),
            is_active: Set(true),
            ..Default::default()
        };
        let created = model
            .insert(&*self.db_pool)
            .await
            .map_err(|e| ServiceError::from_db_write(e, "account"))?;

        self.event_sender
            .send_or_log(Event::UserRegistered(created.id))
            .await;
        info!(user_id = %created.id, role = %created.role, "account created");
        Ok(created)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<user::Model, ServiceError> {
        let verified = !self.settings.require_email_verification;
        let user = self.create_user(request, UserRole::Worker, verified).await?;
        if !verified {
            self.send_verification(&user).await?;
        }
        Ok(user)
    }

    async fn issue_token(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<String, ServiceError> {
        let token = generate_token();
        let now = Utc::now();
        auth_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            purpose: Set(purpose),
            token_hash: Set(hash_token(&token)),
            expires_at: Set(now + ttl),
            consumed_at: Set(None),
            created_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;
        Ok(token)
    }

    async fn send_verification(&self, user: &user::Model) -> Result<(), ServiceError> {
        let token = self
            .issue_token(user.id, TokenPurpose::EmailVerification, self.settings.verification_ttl)
            .await?;
        self.notifier
            .send(OutboundMessage {
                kind: MessageKind::EmailVerification,
                to: user.email.clone(),
                subject: "Verify your email address".into(),
                body: format!(
                    "Hello {}, confirm your address within {} hours.",
                    user.name,
                    self.settings.verification_ttl.num_hours()
                ),
                action_url: format!("{}/verify-email?token={}", self.settings.frontend_url, token),
            })
            .await
    }

    /// Marks the token consumed and returns its owner, inside `txn`.
    async fn consume_token(
        txn: &sea_orm::DatabaseTransaction,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<user::Model, ServiceError> {
        let now = Utc::now();
        let stored = AuthToken::find()
            .filter(auth_token::Column::TokenHash.eq(hash_token(token)))
            .filter(auth_token::Column::Purpose.eq(purpose))
            .one(txn)
            .await?
            .filter(|t| t.is_usable(now))
            .ok_or_else(|| ServiceError::InvalidInput("Token is invalid or has expired".into()))?;

        // Only the request that flips consumed_at from NULL may use the token
        let claimed = AuthToken::update_many()
            .col_expr(auth_token::Column::ConsumedAt, Expr::value(Some(now)))
            .filter(auth_token::Column::Id.eq(stored.id))
            .filter(auth_token::Column::ConsumedAt.is_null())
            .exec(txn)
            .await?;
        if claimed.rows_affected == 0 {
            return Err(ServiceError::InvalidInput("Token is invalid or has expired".into()));
        }
        let user_id = stored.user_id;

        User::find_by_id(user_id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::InvalidInput("Token is invalid or has expired".into()))
    }

    #[instrument(skip(self, request))]
    pub async fn verify_email(&self, request: TokenRequest) -> Result<user::Model, ServiceError> {
        request.validate()?;
        let token = request.token;
        with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let user = Self::consume_token(txn, &token, TokenPurpose::EmailVerification).await?;
                if user.email_verified {
                    return Ok(user);
                }
                let mut active = user.into_active_model();
                active.email_verified = Set(true);
                Ok(active.update(txn).await?)
            })
        })
        .await
    }

    #[instrument(skip(self, request))]
    pub async fn login(
        &self,
        request: LoginRequest,
    ) -> Result<(TokenResponse, user::Model), ServiceError> {
        request.validate()?;
        let identifier = request.identifier.trim();

        let column_match = if identifier.contains('@') {
            user::Column::Email.eq(identifier.to_lowercase())
        } else {
            user::Column::EmployeeId.eq(identifier)
        };
        let invalid = || ServiceError::Unauthorized("Invalid credentials".into());

        let user = User::find()
            .filter(column_match)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash)? {
            warn!(user_id = %user.id, "failed login");
            return Err(invalid());
        }
        if !user.is_active {
            return Err(ServiceError::Forbidden("Account is disabled".into()));
        }
        if self.settings.require_email_verification && !user.email_verified {
            return Err(ServiceError::Forbidden("Email address has not been verified".into()));
        }

        let token = self.auth.generate_token(&user)?;
        info!(user_id = %user.id, "login");
        Ok((token, user))
    }

    /// Always succeeds so callers cannot discover which addresses are registered.
    #[instrument(skip(self, request))]
    pub async fn forgot_password(&self, request: ForgotPasswordRequest) -> Result<(), ServiceError> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        let Some(user) = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db_pool)
            .await?
        else {
            return Ok(());
        };
        if !user.is_active {
            return Ok(());
        }

        let token = self
            .issue_token(user.id, TokenPurpose::PasswordReset, self.settings.reset_ttl)
            .await?;
        self.notifier
            .send(OutboundMessage {
                kind: MessageKind::PasswordReset,
                to: user.email.clone(),
                subject: "Reset your password".into(),
                body: format!(
                    "A password reset was requested. The link is valid for {} minutes.",
                    self.settings.reset_ttl.num_minutes()
                ),
                action_url: format!("{}/reset-password?token={}", self.settings.frontend_url, token),
            })
            .await
    }

    #[instrument(skip(self, request))]
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), ServiceError> {
        request.validate()?;
        let password_hash = hash_password(&request.new_password)?;
        let token = request.token;

        with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let user = Self::consume_token(txn, &token, TokenPurpose::PasswordReset).await?;
                let mut active = user.into_active_model();
                active.password_hash = Set(password_hash);
                active.update(txn).await?;
                Ok(())
            })
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        User::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, limit: u64) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let paginator = User::find()
            .order_by_asc(user::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Admins cannot change their own role.
    #[instrument(skip(self))]
    pub async fn change_role(
        &self,
        id: Uuid,
        role: UserRole,
        acting_user: Uuid,
    ) -> Result<user::Model, ServiceError> {
        if id == acting_user {
            return Err(ServiceError::InvalidOperation("You cannot change your own role".into()));
        }
        let existing = self.get(id).await?;
        if existing.role == role {
            return Ok(existing);
        }

        let mut active = existing.into_active_model();
        active.role = Set(role);
        let updated = active.update(&*self.db_pool).await?;

        self.event_sender
            .send_or_log(Event::UserRoleChanged {
                user_id: updated.id,
                role,
            })
            .await;
        Ok(updated)
    }
}
