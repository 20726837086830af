//! User business logic service.
//!
//! Handles registration, credential verification, and user lookups.

use crate::database::models::{CreateUser, RegisterRequest, User};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::user_repository::UserRepository;
use crate::repositories::wallet_repository::WalletRepository;
use bcrypt::{DEFAULT_COST, hash, verify};
use sqlx::SqlitePool;
use validator::Validate;

pub struct UserService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserService<'a> {
    /// Creates a new UserService instance.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new user with full validation and a zero-balance wallet.
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures
    /// - Duplicate username or email
    pub async fn create_user(&self, register: RegisterRequest) -> ServiceResult<User> {
        if let Err(validation_errors) = register.validate() {
            let error_messages: Vec<String> = validation_errors
                .field_errors()
                .into_iter()
                .flat_map(|(field, errors)| {
                    errors.iter().map(move |error| {
                        format!(
                            "{}: {}",
                            field,
                            error.message.as_ref().unwrap_or(&"Invalid value".into())
                        )
                    })
                })
                .collect();

            return Err(ServiceError::validation(error_messages.join(", ")));
        }

        let repo = UserRepository::new(self.pool);

        if repo.username_exists(&register.username).await? {
            return Err(ServiceError::already_exists("User", &register.username));
        }

        if repo.email_exists(&register.email).await? {
            return Err(ServiceError::already_exists("User", &register.email));
        }

        let password_hash = Self::hash_password(&register.password)?;

        let data = CreateUser {
            id: uuid::Uuid::now_v7().to_string(),
            username: register.username,
            email: register.email,
            password_hash,
        };

        let user = repo.create_user(data).await?;

        // Every user starts with an empty prepaid wallet.
        let wallet_repo = WalletRepository::new(self.pool);
        wallet_repo.create_wallet(&user.id).await?;

        Ok(user)
    }

    /// Verifies a username/password pair and returns the matching user.
    pub async fn authenticate_user(&self, username: &str, password: &str) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        let user = repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::validation("Invalid username or password"))?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(ServiceError::validation("Invalid username or password"));
        }

        if !user.is_active {
            return Err(ServiceError::validation("User account is inactive"));
        }

        Ok(user)
    }

    /// Retrieves a user by ID with existence verification.
    pub async fn get_user_required(&self, id: &str) -> ServiceResult<User> {
        let repo = UserRepository::new(self.pool);
        let user = repo
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;
        Ok(user)
    }

    /// Function to hash a password before storing in database
    fn hash_password(password: &str) -> ServiceResult<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| ServiceError::validation(format!("Password hashing failed: {}", e)))
    }

    /// Function to verify a password against the stored hash
    fn verify_password(password: &str, hash: &str) -> ServiceResult<bool> {
        verify(password, hash)
            .map_err(|e| ServiceError::validation(format!("Password verification failed: {}", e)))
    }
}
