//! Authentication service: sign-in against configured accounts and JWT sessions

use std::sync::Arc;

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::UserRole;

use crate::config::{Config, UserEntry};
use crate::error::{AppError, AppResult};
use crate::services::login_throttle::{minutes_ceil, FailureOutcome, LoginThrottle, ThrottleSettings};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // email
    pub name: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
}

/// Identity carried by a valid session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: SessionUser,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<Vec<UserEntry>>,
    jwt_secret: String,
    session_expiry: i64,
    throttle: LoginThrottle,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        if config.auth.users.is_empty() {
            tracing::warn!("no user accounts configured, nobody can sign in");
        }
        Self {
            users: Arc::new(config.auth.users.clone()),
            jwt_secret: config.jwt.secret.clone(),
            session_expiry: config.jwt.session_expiry,
            throttle: LoginThrottle::new(ThrottleSettings::from(&config.auth)),
        }
    }

    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    /// Authenticate with email and password.
    ///
    /// Failures are throttled per email: each one is answered after a growing delay
    /// and too many in a row block the address.
    pub async fn login(&self, input: &LoginInput) -> AppResult<LoginResponse> {
        if let Err(remaining) = self.throttle.check(&input.email) {
            return Err(AppError::TooManyAttempts {
                minutes: minutes_ceil(remaining),
            });
        }

        match self.verify_credentials(&input.email, &input.password) {
            Ok(user) => {
                self.throttle.record_success(&input.email);
                tracing::info!(role = user.role.as_str(), "user signed in");
                let token = self.issue_token(&user)?;
                Ok(LoginResponse {
                    token,
                    token_type: "Bearer".to_string(),
                    expires_in: self.session_expiry,
                    user,
                })
            }
            Err(AppError::InvalidCredentials) => match self.throttle.record_failure(&input.email) {
                FailureOutcome::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(AppError::InvalidCredentials)
                }
                FailureOutcome::Blocked(block) => Err(AppError::TooManyAttempts {
                    minutes: minutes_ceil(block),
                }),
            },
            Err(e) => Err(e),
        }
    }

    fn verify_credentials(&self, email: &str, password: &str) -> AppResult<SessionUser> {
        let email = email.trim();
        let user = self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        Ok(SessionUser {
            email: user.email.clone(),
            name: user.name.clone(),
            role: UserRole::parse(&user.role),
        })
    }

    /// Sign a session token for `user`
    pub fn issue_token(&self, user: &SessionUser) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            exp: (now + Duration::seconds(self.session_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Validate a session token and return its identity
    pub fn validate_token(&self, token: &str) -> AppResult<SessionUser> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected session token");
            AppError::InvalidToken
        })?;

        Ok(SessionUser {
            email: token_data.claims.sub,
            name: token_data.claims.name,
            role: token_data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, CacheConfig, ErpConfig, JwtConfig, ServerConfig};

    fn config() -> Config {
        Config {
            environment: "test".into(),
            server: ServerConfig::default(),
            erp: ErpConfig::default(),
            cache: CacheConfig::default(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                session_expiry: 3600,
            },
            auth: AuthConfig {
                users: vec![UserEntry {
                    email: "admin@kly.fr".into(),
                    password_hash: bcrypt::hash("s3cret!", 4).unwrap(),
                    name: "Admin".into(),
                    role: "admin".into(),
                }],
                login_delay_ms: 0,
                ..AuthConfig::default()
            },
        }
    }

    fn input(email: &str, password: &str) -> LoginInput {
        LoginInput {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_issues_a_token_that_validates() {
        let auth = AuthService::new(&config());
        let response = auth.login(&input("ADMIN@kly.fr", "s3cret!")).await.unwrap();
        assert_eq!(response.user.role, UserRole::Admin);
        let user = auth.validate_token(&response.token).unwrap();
        assert_eq!(user.email, "admin@kly.fr");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_then_blocked() {
        let auth = AuthService::new(&config());
        for _ in 0..4 {
            assert!(matches!(
                auth.login(&input("admin@kly.fr", "nope")).await,
                Err(AppError::InvalidCredentials)
            ));
        }
        assert!(matches!(
            auth.login(&input("admin@kly.fr", "nope")).await,
            Err(AppError::TooManyAttempts { minutes: 15 })
        ));
        // even the right password is refused while blocked
        assert!(matches!(
            auth.login(&input("admin@kly.fr", "s3cret!")).await,
            Err(AppError::TooManyAttempts { .. })
        ));
    }

    #[test]
    fn tampered_tokens_are_invalid() {
        let auth = AuthService::new(&config());
        assert!(matches!(
            auth.validate_token("not.a.token"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn login_input_requires_an_email() {
        assert!(input("not-an-email", "x").validate().is_err());
        assert!(input("a@kly.fr", "").validate().is_err());
        assert!(input("a@kly.fr", "x").validate().is_ok());
    }
}
