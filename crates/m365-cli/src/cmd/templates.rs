use crate::context::AppContext;
use crate::output::{print_json, print_table};
use crate::tools::DEFAULT_MAX_RESULTS;
use anyhow::Context;
use clap::Subcommand;
use m365_core::config::Settings;
use m365_core::template::samples;
use serde_json::json;

#[derive(Subcommand)]
pub enum TemplatesSubcommand {
    /// Install the bundled sample templates (existing names are left alone)
    Seed,

    /// List stored templates
    List {
        /// Only templates in this category
        #[arg(long)]
        category: Option<String>,

        /// Maximum number of templates to show
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        limit: usize,
    },
}

pub fn run(settings: Settings, subcmd: TemplatesSubcommand, json: bool) -> anyhow::Result<()> {
    let ctx = AppContext::open(settings)?;
    match subcmd {
        TemplatesSubcommand::Seed => seed(&ctx, json),
        TemplatesSubcommand::List { category, limit } => {
            list(&ctx, category.as_deref(), limit, json)
        }
    }
}

fn seed(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let report = samples::seed(&ctx.templates).context("failed to seed sample templates")?;

    if json {
        print_json(&json!({
            "created": report.created,
            "skipped": report.skipped,
        }))?;
        return Ok(());
    }

    for name in &report.created {
        println!("  created: {name}");
    }
    for name in &report.skipped {
        println!("  exists:  {name}");
    }
    println!(
        "\n{} template(s) created, {} already present",
        report.created.len(),
        report.skipped.len()
    );
    Ok(())
}

fn list(ctx: &AppContext, category: Option<&str>, limit: usize, json: bool) -> anyhow::Result<()> {
    let templates = ctx
        .templates
        .list_templates(category, limit)
        .context("failed to list templates")?;

    if json {
        print_json(&templates)?;
    } else if templates.is_empty() {
        println!("No templates.");
    } else {
        let rows = templates
            .iter()
            .map(|t| {
                vec![
                    t.template_name.clone(),
                    t.category.clone(),
                    t.version.to_string(),
                    t.subject.clone(),
                ]
            })
            .collect();
        print_table(&["NAME", "CATEGORY", "VERSION", "SUBJECT"], rows);
    }
    Ok(())
}
