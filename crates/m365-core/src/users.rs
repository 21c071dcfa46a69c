//! User account management.

use crate::directory::{NewUser, ResourceClient, UserInfo};
use crate::error::{AdminError, Result};
use crate::validation::{require_non_empty, validate_email};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateUserRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub force_password_change: bool,
}

#[derive(Clone)]
pub struct UserService {
    client: Arc<dyn ResourceClient>,
}

impl UserService {
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        Self { client }
    }

    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<UserInfo> {
        let email = validate_email(&request.email)?;
        let display_name = require_non_empty("displayName", &request.display_name)?;
        require_non_empty("password", &request.password)?;
        tracing::info!(user = %email, "creating user");

        // The mail nickname is the local part of the principal name.
        let mail_nickname = email.split('@').next().unwrap_or(email).to_string();
        let user = NewUser {
            user_principal_name: email.to_string(),
            display_name: display_name.to_string(),
            mail_nickname,
            password: request.password.clone(),
            force_change_password: request.force_password_change,
            given_name: request.first_name.clone().filter(|s| !s.is_empty()),
            surname: request.last_name.clone().filter(|s| !s.is_empty()),
        };

        match self.client.create_user(&user).await {
            Ok(created) => {
                tracing::info!(user = %created.user_principal_name, "user created");
                Ok(created)
            }
            Err(e) => {
                tracing::error!(user = %email, error = %e, "failed to create user");
                Err(AdminError::remote(format!("create user {email}"), e))
            }
        }
    }

    pub async fn get_user(&self, user_email: &str) -> Result<UserInfo> {
        let email = validate_email(user_email)?;
        tracing::info!(user = %email, "fetching user");
        self.client.get_user(email).await.map_err(|e| {
            if e.status == Some(404) {
                AdminError::UserNotFound(email.to_string())
            } else {
                AdminError::remote(format!("fetch user {email}"), e)
            }
        })
    }

    pub async fn list_users(&self, max_results: usize) -> Result<Vec<UserInfo>> {
        tracing::info!(max_results, "listing users");
        let mut users = self
            .client
            .list_users(max_results)
            .await
            .map_err(|e| AdminError::remote("list users", e))?;
        users.truncate(max_results);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDirectory;

    fn request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.into(),
            display_name: "Ana Lima".into(),
            password: "Initial#Pass1".into(),
            first_name: Some("Ana".into()),
            last_name: Some(String::new()),
            force_password_change: true,
        }
    }

    #[tokio::test]
    async fn create_then_get_user() {
        let svc = UserService::new(Arc::new(FakeDirectory::new()));
        let created = svc.create_user(&request("ana@contoso.com")).await.unwrap();
        assert_eq!(created.given_name.as_deref(), Some("Ana"));
        assert_eq!(created.surname, None);

        let fetched = svc.get_user("ana@contoso.com").await.unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_locally() {
        let fake = Arc::new(FakeDirectory::new());
        let svc = UserService::new(fake.clone());
        let err = svc.create_user(&request("ana.contoso.com")).await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidEmail(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_user_maps_to_not_found() {
        let svc = UserService::new(Arc::new(FakeDirectory::new()));
        let err = svc.get_user("nobody@contoso.com").await.unwrap_err();
        assert!(matches!(err, AdminError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_user_is_a_remote_failure() {
        let svc = UserService::new(Arc::new(FakeDirectory::new().with_user("ana@contoso.com")));
        let err = svc.create_user(&request("ana@contoso.com")).await.unwrap_err();
        assert!(err.to_string().starts_with("create user ana@contoso.com"));
    }

    #[tokio::test]
    async fn list_users_honours_limit() {
        let fake = FakeDirectory::new()
            .with_user("a@contoso.com")
            .with_user("b@contoso.com")
            .with_user("c@contoso.com");
        let svc = UserService::new(Arc::new(fake));
        assert_eq!(svc.list_users(2).await.unwrap().len(), 2);
    }
}
