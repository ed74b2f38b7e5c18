use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;

mod app;
mod commands;
mod render;

use app::{App, AppOptions};
use commands::{ask, chat, ingest, sessions, stats};

#[derive(Parser)]
#[command(name = "lexrag", version)]
#[command(about = "LEXRAG - self-verifying question answering over legal documents", long_about = None)]
struct Cli {
    /// Configuration file (TOML); defaults to the user config directory
    #[arg(short, long, global = true, env = "LEXRAG_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for persisted sessions
    #[arg(long, global = true, value_name = "DIR")]
    sessions_dir: Option<PathBuf>,

    /// Keep sessions in memory only
    #[arg(long, global = true, conflicts_with = "sessions_dir")]
    ephemeral: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and index documents, then print the ingestion report
    Ingest(ingest::IngestArgs),
    /// Answer one question about the given documents
    Ask(ask::AskArgs),
    /// Show index counters and the active configuration
    Stats(stats::StatsArgs),
    /// List sessions or show one session's history
    Sessions(sessions::SessionsArgs),
    /// Start the interactive shell
    Chat(chat::ChatArgs),
}

impl Commands {
    fn needs_llm(&self) -> bool {
        matches!(self, Self::Ask(_) | Self::Chat(_))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let events = match &cli.command {
        Commands::Chat(_) => {
            let (sender, receiver) = mpsc::unbounded_channel();
            lexrag_execution::init_tracing(cli.verbose, Some(sender))?;
            Some(receiver)
        }
        _ => {
            lexrag_execution::init_tracing(cli.verbose, None)?;
            None
        }
    };

    let options = AppOptions {
        config: cli.config.clone(),
        sessions_dir: cli.sessions_dir.clone(),
        ephemeral: cli.ephemeral,
        require_llm: cli.command.needs_llm(),
    };
    let app = App::build(&options).await?;

    match &cli.command {
        Commands::Ingest(args) => ingest::execute(&app, args).await?,
        Commands::Ask(args) => ask::execute(&app, args).await?,
        Commands::Stats(args) => stats::execute(&app, args).await?,
        Commands::Sessions(args) => sessions::execute(&app, args).await?,
        Commands::Chat(args) => chat::run(&app, args, events).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_ask_with_documents_and_session() {
        let cli = Cli::try_parse_from([
            "lexrag", "-vv", "ask", "Who may terminate?", "--doc", "msa.txt", "-d", "sow.md",
            "--session", "acme",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Commands::Ask(args) = cli.command else {
            panic!("expected ask");
        };
        assert_eq!(args.question, "Who may terminate?");
        assert_eq!(args.docs, vec![PathBuf::from("msa.txt"), PathBuf::from("sow.md")]);
        assert_eq!(args.session.as_deref(), Some("acme"));
    }

    #[test]
    fn ask_requires_a_document() {
        assert!(Cli::try_parse_from(["lexrag", "ask", "Who may terminate?"]).is_err());
    }

    #[test]
    fn ephemeral_conflicts_with_sessions_dir() {
        let result =
            Cli::try_parse_from(["lexrag", "--ephemeral", "--sessions-dir", "/tmp/s", "stats"]);
        assert!(result.is_err());
    }

    #[test]
    fn only_answering_commands_need_the_model() {
        let cli = Cli::try_parse_from(["lexrag", "ingest", "lease.txt"]).unwrap();
        assert!(!cli.command.needs_llm());
        let cli = Cli::try_parse_from(["lexrag", "chat"]).unwrap();
        assert!(cli.command.needs_llm());
    }
}
