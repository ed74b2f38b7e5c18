use super::cancel_on_ctrl_c;
use crate::app::App;
use crate::render;
use anyhow::{Result, anyhow, bail};
use clap::Args;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Args)]
pub struct AskArgs {
    /// The question to answer
    pub question: String,

    /// Document to index before asking (repeatable)
    #[arg(short = 'd', long = "doc", value_name = "FILE", required = true)]
    pub docs: Vec<PathBuf>,

    /// Session the query belongs to
    #[arg(short, long)]
    pub session: Option<String>,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(app: &App, args: &AskArgs) -> Result<()> {
    let report = app.service.process_documents(&args.docs).await;
    if !args.json {
        render::print_ingestion(&report);
    }
    if report.successful() == 0 {
        bail!("None of the documents could be indexed");
    }

    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancel.clone());
    let result = app
        .service
        .query_with_cancel(&args.question, args.session.as_deref(), cancel)
        .await;
    watcher.abort();

    let response = result.map_err(|err| anyhow!(err.user_message()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        render::print_response(&response);
    }
    Ok(())
}
