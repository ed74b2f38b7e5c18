use crate::app::App;
use crate::render;
use anyhow::{Result, bail};
use clap::Args;

#[derive(Debug, Args)]
pub struct SessionsArgs {
    /// Show the history of one session instead of listing them
    #[arg(short, long)]
    pub session: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(app: &App, args: &SessionsArgs) -> Result<()> {
    let Some(id) = args.session.as_deref() else {
        let ids = app.service.session_ids().await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&ids)?);
        } else if ids.is_empty() {
            println!("No sessions yet");
        } else {
            for id in ids {
                println!("{id}");
            }
        }
        return Ok(());
    };

    let Some(session) = app.service.session(id).await? else {
        bail!("Session not found: {id}");
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        println!("{}", render::format_history(&session.history));
    }
    Ok(())
}
