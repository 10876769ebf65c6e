//! User identity: registration, authentication and bearer tokens.
//!
//! The game core consumes only [`IdentityService::user_by_token`] and
//! [`IdentityService::user_by_screen_name`]; the rest backs the `/auth/*`
//! request surface.

pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::db::DatabaseError;
use crate::storage::{GameDatabase, User};

pub use token::generate_token;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("missing email")]
    MissingEmail,

    #[error("missing password")]
    MissingPassword,

    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("wrong password for user '{0}'")]
    WrongPassword(String),

    #[error("email '{0}' is already registered")]
    EmailTaken(String),

    #[error("screen name '{0}' is already taken")]
    ScreenNameTaken(String),

    #[error("token not found")]
    TokenNotFound,

    #[error("cannot hash password")]
    Hash,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// A registration or login request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub screen_name: String,
    #[serde(default)]
    pub new_password: String,
}

/// The user view returned to clients: sensitive fields stripped, bearer
/// token attached when one was just issued.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub email_verified: bool,
    pub screen_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
}

impl UserProfile {
    fn from_user(user: &User, token: String) -> Self {
        Self {
            email: user.email.clone(),
            email_verified: user.is_verified(),
            screen_name: user.screen_name.clone(),
            token,
        }
    }
}

/// Registration, login and token resolution over the identity tables.
#[derive(Clone)]
pub struct IdentityService {
    db: GameDatabase,
    base_url: String,
}

impl IdentityService {
    pub fn new(db: GameDatabase, base_url: String) -> Self {
        Self { db, base_url }
    }

    /// Register a new user and issue a bearer token.
    ///
    /// A verification link is created and logged; mail delivery is the
    /// deployment's concern. The account works before verification, but
    /// clients are expected to prompt until `email_verified` is set.
    pub async fn register(&self, req: &UserRequest) -> Result<UserProfile, IdentityError> {
        if req.email.is_empty() {
            return Err(IdentityError::MissingEmail);
        }
        if req.password.is_empty() {
            return Err(IdentityError::MissingPassword);
        }
        if self.db.get_user_by_email(&req.email).await.is_ok() {
            return Err(IdentityError::EmailTaken(req.email.clone()));
        }
        if self.db.get_user_by_screen_name(&req.screen_name).await.is_ok() {
            return Err(IdentityError::ScreenNameTaken(req.screen_name.clone()));
        }

        let hash = password::hash_password(&req.password).map_err(|_| IdentityError::Hash)?;
        let user = self.db.create_user(&req.email, &hash, &req.screen_name).await?;

        let verification_token = generate_token();
        self.db.insert_token(user.id, &verification_token).await?;
        info!(
            email = %user.email,
            link = %format!("{}/auth/verify?token={}", self.base_url, verification_token),
            "User registered; verification link created"
        );

        let token = self.issue_token(&user).await?;
        Ok(UserProfile::from_user(&user, token))
    }

    /// Authenticate by email and password.
    pub async fn authenticate(&self, req: &UserRequest) -> Result<User, IdentityError> {
        if req.email.is_empty() {
            return Err(IdentityError::MissingEmail);
        }
        if req.password.is_empty() {
            return Err(IdentityError::MissingPassword);
        }
        let user = self
            .db
            .get_user_by_email(&req.email)
            .await
            .map_err(|_| IdentityError::UserNotFound(req.email.clone()))?;

        let valid = password::verify_password(&req.password, &user.password_hash)
            .unwrap_or(false);
        if !valid {
            warn!(email = %req.email, "Failed login attempt");
            return Err(IdentityError::WrongPassword(req.email.clone()));
        }
        Ok(user)
    }

    /// Authenticate and issue a fresh bearer token.
    pub async fn login(&self, req: &UserRequest) -> Result<UserProfile, IdentityError> {
        let user = self.authenticate(req).await?;
        let token = self.issue_token(&user).await?;
        info!(email = %user.email, "User logged in");
        Ok(UserProfile::from_user(&user, token))
    }

    /// Re-authenticate, revoke every outstanding token, store a new hash.
    pub async fn change_password(&self, req: &UserRequest) -> Result<UserProfile, IdentityError> {
        let user = self.authenticate(req).await?;
        let hash = password::hash_password(&req.new_password).map_err(|_| IdentityError::Hash)?;

        self.db.delete_user_tokens(user.id).await?;
        self.db.update_password(user.id, &hash).await?;

        let token = self.issue_token(&user).await?;
        info!(email = %user.email, "Password changed, existing tokens revoked");
        Ok(UserProfile::from_user(&user, token))
    }

    /// Resolve a bearer token to its user.
    pub async fn user_by_token(&self, token: &str) -> Result<User, IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::TokenNotFound);
        }
        self.db
            .get_user_by_token(token)
            .await
            .map_err(|_| IdentityError::TokenNotFound)
    }

    /// Resolve a screen name to its user.
    pub async fn user_by_screen_name(&self, screen_name: &str) -> Result<User, IdentityError> {
        self.db
            .get_user_by_screen_name(screen_name)
            .await
            .map_err(|_| IdentityError::UserNotFound(screen_name.to_string()))
    }

    /// Mark the token's user as email-verified.
    pub async fn verify_email(&self, token: &str) -> Result<User, IdentityError> {
        let user = self.user_by_token(token).await?;
        self.db.set_email_verified(user.id).await?;
        info!(email = %user.email, "Email verified");
        Ok(user)
    }

    async fn issue_token(&self, user: &User) -> Result<String, IdentityError> {
        let token = generate_token();
        self.db.insert_token(user.id, &token).await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_service() -> IdentityService {
        let db = GameDatabase::open_in_memory().await.unwrap();
        IdentityService::new(db, "http://localhost:8080".to_string())
    }

    fn request(email: &str, password: &str, screen_name: &str) -> UserRequest {
        UserRequest {
            email: email.to_string(),
            password: password.to_string(),
            screen_name: screen_name.to_string(),
            new_password: String::new(),
        }
    }

    #[tokio::test]
    async fn register_and_login() {
        let svc = test_service().await;
        let profile = svc
            .register(&request("alice@example.com", "secret", "alice"))
            .await
            .unwrap();
        assert_eq!(profile.screen_name, "alice");
        assert!(!profile.email_verified);
        assert_eq!(profile.token.len(), 32);

        let logged_in = svc
            .login(&request("alice@example.com", "secret", ""))
            .await
            .unwrap();
        assert_ne!(logged_in.token, profile.token);

        let user = svc.user_by_token(&logged_in.token).await.unwrap();
        assert_eq!(user.screen_name, "alice");
    }

    #[tokio::test]
    async fn register_requires_email_and_password() {
        let svc = test_service().await;
        assert!(matches!(
            svc.register(&request("", "secret", "alice")).await,
            Err(IdentityError::MissingEmail)
        ));
        assert!(matches!(
            svc.register(&request("alice@example.com", "", "alice")).await,
            Err(IdentityError::MissingPassword)
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let svc = test_service().await;
        svc.register(&request("alice@example.com", "secret", "alice"))
            .await
            .unwrap();

        let err = svc
            .register(&request("alice@example.com", "other", "alice2"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let svc = test_service().await;
        svc.register(&request("alice@example.com", "secret", "alice"))
            .await
            .unwrap();

        let err = svc
            .login(&request("alice@example.com", "not-it", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::WrongPassword(_)));
    }

    #[tokio::test]
    async fn change_password_revokes_old_tokens() {
        let svc = test_service().await;
        let profile = svc
            .register(&request("alice@example.com", "secret", "alice"))
            .await
            .unwrap();

        let mut req = request("alice@example.com", "secret", "");
        req.new_password = "better-secret".to_string();
        let changed = svc.change_password(&req).await.unwrap();

        assert!(svc.user_by_token(&profile.token).await.is_err());
        assert!(svc.user_by_token(&changed.token).await.is_ok());
        assert!(svc
            .login(&request("alice@example.com", "better-secret", ""))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn verify_email_sets_flag() {
        let svc = test_service().await;
        let profile = svc
            .register(&request("alice@example.com", "secret", "alice"))
            .await
            .unwrap();

        svc.verify_email(&profile.token).await.unwrap();
        let user = svc.user_by_token(&profile.token).await.unwrap();
        assert!(user.is_verified());
    }
}
