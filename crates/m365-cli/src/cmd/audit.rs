use crate::output::{print_json, print_table};
use anyhow::Context;
use m365_core::audit::AuditLog;
use m365_core::config::Settings;
use m365_core::db::Database;

pub fn run(settings: &Settings, limit: usize, json: bool) -> anyhow::Result<()> {
    let path = &settings.database_path;
    let db = Database::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    let records = AuditLog::new(db)
        .recent(limit)
        .context("failed to read audit log")?;

    if json {
        print_json(&records)?;
    } else if records.is_empty() {
        println!("No audit records.");
    } else {
        let rows = records
            .iter()
            .map(|r| {
                vec![
                    r.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    r.operation.clone(),
                    r.status.clone(),
                    r.target_resource.clone().unwrap_or_default(),
                    r.details.clone().unwrap_or_default(),
                ]
            })
            .collect();
        print_table(&["TIMESTAMP", "OPERATION", "STATUS", "TARGET", "DETAILS"], rows);
    }
    Ok(())
}
