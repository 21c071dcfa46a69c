use super::{failed, max_results, optional_bool, optional_str, required_str, AdminTool};
use crate::context::AppContext;
use async_trait::async_trait;
use m365_core::users::CreateUserRequest;
use serde_json::{json, Value};

pub struct CreateUserTool;

#[async_trait]
impl AdminTool for CreateUserTool {
    fn name(&self) -> &str {
        "create_user"
    }

    fn description(&self) -> &str {
        "Create a new Microsoft 365 user account"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "email": {"type": "string", "description": "User principal name (email address)"},
                "displayName": {"type": "string", "description": "Full display name"},
                "password": {"type": "string", "description": "Initial password"},
                "firstName": {"type": "string", "description": "Given name"},
                "lastName": {"type": "string", "description": "Surname"},
                "forcePasswordChange": {
                    "type": "boolean",
                    "description": "Require password change on first login (default: true)"
                }
            },
            "required": ["email", "displayName", "password"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let request = CreateUserRequest {
            email: required_str(&args, "email")?.to_string(),
            display_name: required_str(&args, "displayName")?.to_string(),
            password: required_str(&args, "password")?.to_string(),
            first_name: optional_str(&args, "firstName").map(str::to_string),
            last_name: optional_str(&args, "lastName").map(str::to_string),
            force_password_change: optional_bool(&args, "forcePasswordChange", true)?,
        };
        let user = ctx
            .users
            .create_user(&request)
            .await
            .map_err(failed("create user"))?;
        Ok(json!({
            "message": "User created successfully",
            "userId": user.id,
            "userPrincipalName": user.user_principal_name,
            "displayName": user.display_name,
        }))
    }
}

pub struct GetUserTool;

#[async_trait]
impl AdminTool for GetUserTool {
    fn name(&self) -> &str {
        "get_user"
    }

    fn description(&self) -> &str {
        "Get a user's details by email address"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "email": {"type": "string", "description": "User principal name (email address)"}
            },
            "required": ["email"]
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let email = required_str(&args, "email")?;
        let user = ctx
            .users
            .get_user(email)
            .await
            .map_err(failed("get user"))?;
        serde_json::to_value(&user).map_err(|e| e.to_string())
    }
}

pub struct ListUsersTool;

#[async_trait]
impl AdminTool for ListUsersTool {
    fn name(&self) -> &str {
        "list_users"
    }

    fn description(&self) -> &str {
        "List users in the tenant"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "maxResults": {
                    "type": "integer",
                    "description": "Maximum number of users to return (default: 100)"
                }
            },
            "required": []
        })
    }

    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String> {
        let users = ctx
            .users
            .list_users(max_results(&args)?)
            .await
            .map_err(failed("list users"))?;
        Ok(json!({"count": users.len(), "users": users}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::context_with;
    use m365_core::testing::FakeDirectory;

    #[tokio::test]
    async fn create_then_get_user() {
        let (_, ctx) = context_with(FakeDirectory::new());
        let created = CreateUserTool
            .call(
                json!({
                    "email": "ana@contoso.com",
                    "displayName": "Ana Lima",
                    "password": "P@ssw0rd!"
                }),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(created["userPrincipalName"], "ana@contoso.com");

        let fetched = GetUserTool
            .call(json!({"email": "ana@contoso.com"}), &ctx)
            .await
            .unwrap();
        assert_eq!(fetched["displayName"], "Ana Lima");

        let listed = ListUsersTool.call(json!({}), &ctx).await.unwrap();
        assert_eq!(listed["count"], 1);
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_directory() {
        let (fake, ctx) = context_with(FakeDirectory::new());
        let err = CreateUserTool
            .call(json!({"email": "ana@contoso.com"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err, "missing required argument: displayName");

        let err = GetUserTool
            .call(json!({"email": "not-an-email"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.contains("invalid email address"));
        assert!(fake.calls().is_empty());
    }
}
