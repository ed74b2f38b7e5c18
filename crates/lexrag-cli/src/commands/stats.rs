use crate::app::App;
use crate::render;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Document to index before reporting (repeatable)
    #[arg(short = 'd', long = "doc", value_name = "FILE")]
    pub docs: Vec<PathBuf>,

    /// Print the stats as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(app: &App, args: &StatsArgs) -> Result<()> {
    if !args.docs.is_empty() {
        let report = app.service.process_documents(&args.docs).await;
        tracing::debug!(successful = report.successful(), "Indexed documents for stats");
    }

    let stats = app.service.get_system_stats().await?;
    let documents = app.index.documents().await;

    if args.json {
        let body = serde_json::json!({
            "stats": stats,
            "documents": documents,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", render::format_stats(&stats, &documents));
    }
    Ok(())
}
