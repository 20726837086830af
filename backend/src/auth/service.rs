//! Core business logic for the authentication system.

use crate::auth::models::*;
use crate::config::Config;
use crate::errors::{ServiceError, ServiceResult};
use crate::services::user_service::UserService;
use crate::utils::jwt::JwtUtils;
use sqlx::SqlitePool;
use validator::Validate;

/// Authentication service for handling login and token generation
pub struct AuthService<'a> {
    jwt_utils: JwtUtils,
    user_service: UserService<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService instance
    pub fn new(pool: &'a SqlitePool, config: &Config) -> Self {
        AuthService {
            jwt_utils: JwtUtils::new(config),
            user_service: UserService::new(pool),
        }
    }

    /// Authenticate user and generate JWT tokens
    pub async fn login(&self, login_request: LoginRequest) -> ServiceResult<LoginResponse> {
        if let Err(validation_errors) = login_request.validate() {
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

        let user = self
            .user_service
            .authenticate_user(&login_request.username, &login_request.password)
            .await?;

        let access_token = self
            .jwt_utils
            .generate_token(user.id.clone(), user.username.clone())?;
        let refresh_token = self.jwt_utils.generate_refresh_token(user.id.clone())?;

        Ok(LoginResponse {
            access_token,
            refresh_token,
            user: UserInfo {
                id: user.id,
                username: user.username,
                email: user.email,
            },
            expires_in: self.jwt_utils.expires_in_seconds(),
        })
    }

    /// Refresh the access token for a still-active user
    pub async fn refresh_token(
        &self,
        request: RefreshTokenRequest,
    ) -> ServiceResult<RefreshTokenResponse> {
        let claims = self.jwt_utils.validate_token(&request.refresh_token)?;

        let user = self.user_service.get_user_required(&claims.sub).await?;

        if !user.is_active {
            return Err(ServiceError::validation(
                "User account is inactive".to_string(),
            ));
        }

        let access_token = self.jwt_utils.generate_token(user.id, user.username)?;

        Ok(RefreshTokenResponse {
            access_token,
            expires_in: self.jwt_utils.expires_in_seconds(),
        })
    }
}
