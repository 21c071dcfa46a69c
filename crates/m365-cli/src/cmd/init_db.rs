use anyhow::Context;
use m365_core::config::Settings;
use m365_core::db::Database;

pub fn run(settings: &Settings, force: bool) -> anyhow::Result<()> {
    let path = &settings.database_path;
    let created = Database::initialize(path, force, &settings.mcp_server_version)
        .with_context(|| format!("failed to initialize database at {}", path.display()))?;

    if created {
        println!("Database initialized: {}", path.display());
    } else {
        println!(
            "Database already exists: {} (use --force to recreate it)",
            path.display()
        );
    }
    Ok(())
}
