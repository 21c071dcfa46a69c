use crate::context::AppContext;
use async_trait::async_trait;
use m365_core::AdminError;
use serde_json::{Map, Value};
use std::str::FromStr;

pub mod connection;
pub mod provision;
pub mod teams;
pub mod templates;
pub mod users;

pub const DEFAULT_MAX_RESULTS: usize = 100;

#[async_trait]
pub trait AdminTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;
    async fn call(&self, args: Value, ctx: &AppContext) -> Result<Value, String>;
}

pub fn all_tools() -> Vec<Box<dyn AdminTool>> {
    vec![
        Box::new(connection::TestConnectionTool),
        Box::new(connection::GetHealthTool),
        Box::new(users::CreateUserTool),
        Box::new(users::GetUserTool),
        Box::new(users::ListUsersTool),
        Box::new(templates::CreateTemplateTool),
        Box::new(templates::GetTemplateTool),
        Box::new(templates::ListTemplatesTool),
        Box::new(templates::UpdateTemplateTool),
        Box::new(templates::DeleteTemplateTool),
        Box::new(templates::SendFromTemplateTool),
        Box::new(templates::GetTemplateStatsTool),
        Box::new(teams::CreateTeamTool),
        Box::new(teams::GetTeamTool),
        Box::new(teams::ListTeamsTool),
        Box::new(teams::ArchiveTeamTool),
        Box::new(teams::CreateChannelTool),
        Box::new(teams::ListChannelsTool),
        Box::new(teams::DeleteChannelTool),
        Box::new(teams::AddTeamMemberTool),
        Box::new(teams::RemoveTeamMemberTool),
        Box::new(teams::ListTeamMembersTool),
        Box::new(provision::ProvisionTeamTool),
    ]
}

/// Problems with the tool catalogue itself: duplicate names, or schemas that
/// are not objects or require undeclared properties.
pub fn catalogue_problems(tools: &[Box<dyn AdminTool>]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen = std::collections::BTreeSet::new();
    for tool in tools {
        let name = tool.name();
        if !seen.insert(name.to_string()) {
            problems.push(format!("duplicate tool name: {name}"));
        }
        let schema = tool.schema();
        if schema["type"] != "object" {
            problems.push(format!("{name}: input schema is not an object"));
        }
        let properties = schema["properties"].as_object();
        for required in schema["required"].as_array().into_iter().flatten() {
            let key = required.as_str().unwrap_or_default();
            if !properties.is_some_and(|p| p.contains_key(key)) {
                problems.push(format!("{name}: required property '{key}' is not declared"));
            }
        }
    }
    problems
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args[key]
        .as_str()
        .ok_or_else(|| format!("missing required argument: {key}"))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args[key].as_str()
}

pub(crate) fn optional_bool(args: &Value, key: &str, default: bool) -> Result<bool, String> {
    match &args[key] {
        Value::Null => Ok(default),
        Value::Bool(b) => Ok(*b),
        _ => Err(format!("argument {key} must be a boolean")),
    }
}

/// A missing list is empty; anything but an array of strings is an error.
pub(crate) fn string_list(args: &Value, key: &str) -> Result<Vec<String>, String> {
    match &args[key] {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("argument {key} must contain only strings"))
            })
            .collect(),
        _ => Err(format!("argument {key} must be an array of strings")),
    }
}

pub(crate) fn optional_string_list(args: &Value, key: &str) -> Result<Option<Vec<String>>, String> {
    if args[key].is_null() {
        Ok(None)
    } else {
        string_list(args, key).map(Some)
    }
}

pub(crate) fn object_arg(args: &Value, key: &str) -> Result<Map<String, Value>, String> {
    match &args[key] {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(format!("argument {key} must be an object")),
    }
}

pub(crate) fn max_results(args: &Value) -> Result<usize, String> {
    match &args["maxResults"] {
        Value::Null => Ok(DEFAULT_MAX_RESULTS),
        v => v
            .as_u64()
            .filter(|n| *n > 0)
            .map(|n| n as usize)
            .ok_or_else(|| "argument maxResults must be a positive integer".to_string()),
    }
}

/// Parse an optional enum argument, falling back to its default.
pub(crate) fn enum_arg<T>(args: &Value, key: &str) -> Result<T, String>
where
    T: FromStr<Err = AdminError> + Default,
{
    match optional_str(args, key) {
        Some(raw) => raw.parse().map_err(|e: AdminError| e.to_string()),
        None => Ok(T::default()),
    }
}

/// Prefix an error with the action that failed.
pub(crate) fn failed(action: &'static str) -> impl Fn(AdminError) -> String {
    move |e| format!("failed to {action}: {e}")
}


#[cfg(test)]
mod tests {
    use super::*;
    use m365_core::directory::MemberRole;
    use serde_json::json;

    #[test]
    fn catalogue_is_consistent() {
        let tools = all_tools();
        assert_eq!(tools.len(), 23);
        assert!(catalogue_problems(&tools).is_empty());
    }

    #[test]
    fn argument_helpers() {
        let args = json!({
            "teamId": "t-1",
            "toEmails": ["a@x.io"],
            "maxResults": 5,
            "role": "Owner",
            "bad": [1]
        });
        assert_eq!(required_str(&args, "teamId").unwrap(), "t-1");
        assert!(required_str(&args, "missing").unwrap_err().contains("missing"));
        assert_eq!(string_list(&args, "toEmails").unwrap(), vec!["a@x.io"]);
        assert!(string_list(&args, "nothing").unwrap().is_empty());
        assert!(string_list(&args, "bad").is_err());
        assert_eq!(max_results(&args).unwrap(), 5);
        assert_eq!(max_results(&json!({})).unwrap(), DEFAULT_MAX_RESULTS);
        assert!(max_results(&json!({"maxResults": 0})).is_err());
        assert_eq!(enum_arg::<MemberRole>(&args, "role").unwrap(), MemberRole::Owner);
        assert_eq!(
            enum_arg::<MemberRole>(&json!({}), "role").unwrap(),
            MemberRole::Member
        );
        assert!(enum_arg::<MemberRole>(&json!({"role": "admin"}), "role").is_err());
    }
}
