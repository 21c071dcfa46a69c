use crate::output::{print_json, print_table};
use crate::tools::{all_tools, catalogue_problems};
use serde_json::json;

pub fn run(json: bool) -> anyhow::Result<()> {
    let tools = all_tools();
    let problems = catalogue_problems(&tools);

    if json {
        let list: Vec<_> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.schema(),
                })
            })
            .collect();
        print_json(&list)?;
    } else {
        let rows = tools
            .iter()
            .map(|t| vec![t.name().to_string(), t.description().to_string()])
            .collect();
        print_table(&["NAME", "DESCRIPTION"], rows);
    }

    if !problems.is_empty() {
        for p in &problems {
            eprintln!("[error] {p}");
        }
        anyhow::bail!("tool catalogue has {} problem(s)", problems.len());
    }
    Ok(())
}
