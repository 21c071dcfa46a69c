use crate::context::AppContext;
use m365_core::config::Settings;
use m365_core::health::{check_health, HealthStatus};

pub fn run(settings: Settings) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        let ctx = AppContext::open(settings)?;
        anyhow::Ok(check_health(ctx.client.as_ref(), &ctx.settings).await)
    })?;

    println!("{}", report.to_json_pretty());
    if report.status == HealthStatus::Unhealthy {
        anyhow::bail!("server is unhealthy");
    }
    Ok(())
}
