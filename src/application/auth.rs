use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::types::UserRole;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email is already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Validation(&'static str),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid bearer token")]
    Invalid,
    #[error("expired bearer token")]
    Expired,
}

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct AuthPrincipal {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthPrincipal {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    email: String,
    role: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, jwt_secret: &str, token_ttl: Duration) -> Self {
        Self {
            users,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl,
        }
    }

    pub async fn register(
        &self,
        command: RegisterCommand,
    ) -> Result<(UserRecord, String), AuthError> {
        let email = normalize_email(&command.email)?;
        let display_name = command.display_name.trim();
        if display_name.is_empty() {
            return Err(AuthError::Validation("display name must not be empty"));
        }
        ensure_password_strength(&command.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(&command.password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                email,
                password_hash,
                display_name: display_name.to_string(),
                role: UserRole::Member,
            })
            .await
            .map_err(|err| match err {
                // Concurrent signups can race past the lookup above.
                RepoError::Duplicate { .. } => AuthError::EmailTaken,
                other => AuthError::Repo(other),
            })?;

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(UserRecord, String), AuthError> {
        let email = normalize_email(email)?;
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    pub async fn fetch_profile(&self, user_id: Uuid) -> Result<UserRecord, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }

    pub fn issue_token(&self, user: &UserRecord) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.token_ttl).unix_timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| AuthError::Hashing(err.to_string()))
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthPrincipal, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|err| {
            match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        let role = UserRole::try_from(data.claims.role.as_str()).map_err(|_| TokenError::Invalid)?;
        Ok(AuthPrincipal {
            user_id: data.claims.sub,
            email: data.claims.email,
            role,
        })
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let trimmed = email.trim().to_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(AuthError::Validation("a valid email address is required"));
    }
    Ok(trimmed)
}

fn ensure_password_strength(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(
            "password must be at least 6 characters long",
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubUsersRepo {
        by_email: Mutex<HashMap<String, UserRecord>>,
    }

    #[async_trait]
    impl UsersRepo for StubUsersRepo {
        async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
            let mut map = self.by_email.lock().unwrap();
            if map.contains_key(&params.email) {
                return Err(RepoError::Duplicate {
                    constraint: "users_email_key".into(),
                });
            }
            let now = OffsetDateTime::now_utc();
            let record = UserRecord {
                id: Uuid::new_v4(),
                email: params.email.clone(),
                password_hash: params.password_hash,
                display_name: params.display_name,
                role: params.role,
                created_at: now,
                updated_at: now,
            };
            map.insert(params.email, record.clone());
            Ok(record)
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
            Ok(self.by_email.lock().unwrap().get(email).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
            Ok(self
                .by_email
                .lock()
                .unwrap()
                .values()
                .find(|user| user.id == id)
                .cloned())
        }

        async fn update_password(
            &self,
            email: &str,
            password_hash: &str,
        ) -> Result<(), RepoError> {
            let mut map = self.by_email.lock().unwrap();
            match map.get_mut(email) {
                Some(user) => {
                    user.password_hash = password_hash.to_string();
                    Ok(())
                }
                None => Err(RepoError::NotFound),
            }
        }

        async fn update_role(&self, id: Uuid, role: UserRole) -> Result<(), RepoError> {
            let mut map = self.by_email.lock().unwrap();
            match map.values_mut().find(|user| user.id == id) {
                Some(user) => {
                    user.role = role;
                    Ok(())
                }
                None => Err(RepoError::NotFound),
            }
        }

        async fn count_users(&self) -> Result<u64, RepoError> {
            Ok(self.by_email.lock().unwrap().len() as u64)
        }
    }

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(StubUsersRepo::default()),
            "unit-test-secret",
            Duration::from_secs(3600),
        )
    }

    fn register_command(email: &str) -> RegisterCommand {
        RegisterCommand {
            email: email.to_string(),
            password: "hunter22".to_string(),
            display_name: "Asha".to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = service();
        service
            .register(register_command("asha@example.com"))
            .await
            .expect("first signup succeeds");

        let result = service.register(register_command("Asha@Example.com")).await;
        assert!(matches!(result, Err(AuthError::EmailTaken)));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let service = service();
        service
            .register(register_command("asha@example.com"))
            .await
            .expect("signup succeeds");

        let result = service.login("asha@example.com", "wrong-password").await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn issued_token_authenticates_back_to_the_user() {
        let service = service();
        let (user, token) = service
            .register(register_command("asha@example.com"))
            .await
            .expect("signup succeeds");

        let principal = service.authenticate(&token).expect("token is valid");
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.email, "asha@example.com");
        assert_eq!(principal.role, UserRole::Member);
        assert!(!principal.is_admin());
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let service = service();
        let mut command = register_command("asha@example.com");
        command.password = "abc".to_string();
        assert!(matches!(
            service.register(command).await,
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let service = service();
        assert!(matches!(
            service.authenticate("not-a-jwt"),
            Err(TokenError::Invalid)
        ));
    }
}
