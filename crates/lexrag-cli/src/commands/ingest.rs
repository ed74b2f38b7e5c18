use crate::app::App;
use crate::render;
use anyhow::{Result, bail};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Files to validate and index
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(app: &App, args: &IngestArgs) -> Result<()> {
    let report = app.service.process_documents(&args.files).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_ingestion(&report);
    }

    if report.successful() == 0 {
        bail!("No documents were indexed");
    }
    Ok(())
}
