//! Interactive question-answering shell.

use super::cancel_on_ctrl_c;
use crate::app::App;
use crate::render::{self, EXAMPLE_QUESTIONS};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use lexrag_core::session::DEFAULT_SESSION_ID;
use lexrag_execution::RefinementEvent;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const COMMANDS: [&str; 10] = [
    "/ingest", "/stats", "/session", "/history", "/examples", "/example", "/clear", "/help",
    "/quit", "/exit",
];

const HELP: &str = "\
Type a question to ask it about the indexed documents.

  /ingest <file>...   index more documents
  /stats              show index and configuration stats
  /session [id]       show or switch the current session
  /history            list answered questions in this session
  /examples           list example questions
  /example <n>        ask example question n
  /clear              drop all documents and sessions
  /help               show this help
  /quit               leave the shell

Ctrl-C while a question is running cancels it; asking the same question
again resumes from the last verified step.";

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Document to index on startup (repeatable)
    #[arg(short = 'd', long = "doc", value_name = "FILE")]
    pub docs: Vec<PathBuf>,

    /// Session to start in
    #[arg(short, long)]
    pub session: Option<String>,

    /// Hide live refinement progress
    #[arg(short, long)]
    pub quiet: bool,
}

/// One parsed line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    /// 1-based index into the example questions
    Example(usize),
    Examples,
    Ingest(Vec<PathBuf>),
    Stats,
    Session(Option<String>),
    History,
    Clear,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }
    if trimmed == "quit" || trimmed == "exit" {
        return ReplCommand::Quit;
    }
    if !trimmed.starts_with('/') {
        return ReplCommand::Ask(trimmed.to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match (command, args.as_slice()) {
        ("/quit" | "/exit", _) => ReplCommand::Quit,
        ("/help", _) => ReplCommand::Help,
        ("/stats", _) => ReplCommand::Stats,
        ("/history", _) => ReplCommand::History,
        ("/clear", _) => ReplCommand::Clear,
        ("/examples", _) => ReplCommand::Examples,
        ("/example", [n]) => match n.parse::<usize>() {
            Ok(n) if (1..=EXAMPLE_QUESTIONS.len()).contains(&n) => ReplCommand::Example(n),
            _ => ReplCommand::Unknown(trimmed.to_string()),
        },
        ("/session", []) => ReplCommand::Session(None),
        ("/session", [id]) => ReplCommand::Session(Some((*id).to_string())),
        ("/ingest", files) if !files.is_empty() => {
            ReplCommand::Ingest(files.iter().map(PathBuf::from).collect())
        }
        _ => ReplCommand::Unknown(trimmed.to_string()),
    }
}

/// A single progress line for a refinement event.
pub fn progress_line(event: &RefinementEvent) -> String {
    let mut line = format!("  · {}", event.step().unwrap_or(event.message.as_str()));
    let mut details = Vec::new();
    if let Some(iteration) = event.iteration() {
        details.push(format!("iteration {iteration}"));
    }
    if let Some(confidence) = event.confidence() {
        details.push(format!("confidence {confidence:.2}"));
    }
    if let Some(reason) = event.fields.get("reason").and_then(|v| v.as_str()) {
        details.push(reason.to_string());
    }
    if !details.is_empty() {
        line.push_str(&format!(" ({})", details.join(", ")));
    }
    line
}

/// rustyline helper providing command completion, hints and highlighting.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn spawn_progress(mut events: UnboundedReceiver<RefinementEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            // warnings and errors already reach stderr through the fmt layer
            if event.level == "INFO" {
                println!("{}", progress_line(&event).bright_black());
            }
        }
    })
}

pub async fn run(
    app: &App,
    args: &ChatArgs,
    events: Option<UnboundedReceiver<RefinementEvent>>,
) -> Result<()> {
    let progress = match events {
        Some(events) if !args.quiet => Some(spawn_progress(events)),
        _ => None,
    };

    if !args.docs.is_empty() {
        render::print_ingestion(&app.service.process_documents(&args.docs).await);
    }
    let mut session = args
        .session
        .clone()
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== LexRAG ===".bright_magenta().bold());
    println!(
        "{}",
        "Ask a question about your documents, '/help' for commands, or 'quit' to exit."
            .bright_black()
    );
    println!();

    loop {
        let line = match rl.readline(&format!("[{session}]>> ")) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };

        let command = parse_line(&line);
        if command != ReplCommand::Empty {
            let _ = rl.add_history_entry(line.trim());
        }

        match command {
            ReplCommand::Empty => {}
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", HELP.bright_black()),
            ReplCommand::Ask(question) => ask(app, &session, &question).await,
            ReplCommand::Example(n) => ask(app, &session, EXAMPLE_QUESTIONS[n - 1]).await,
            ReplCommand::Examples => {
                for (i, question) in EXAMPLE_QUESTIONS.iter().enumerate() {
                    println!("{}", format!("{:>2}. {question}", i + 1).bright_black());
                }
            }
            ReplCommand::Ingest(files) => {
                render::print_ingestion(&app.service.process_documents(&files).await);
            }
            ReplCommand::Stats => match app.service.get_system_stats().await {
                Ok(stats) => {
                    let documents = app.index.documents().await;
                    println!("{}", render::format_stats(&stats, &documents));
                }
                Err(err) => eprintln!("{}", err.user_message().red()),
            },
            ReplCommand::Session(None) => println!("Current session: {}", session.bright_cyan()),
            ReplCommand::Session(Some(id)) => {
                session = id;
                println!("{}", format!("Switched to session {session}").bright_green());
            }
            ReplCommand::History => match app.service.session(&session).await {
                Ok(Some(found)) => println!("{}", render::format_history(&found.history)),
                Ok(None) => println!("{}", render::format_history(&[])),
                Err(err) => eprintln!("{}", err.user_message().red()),
            },
            ReplCommand::Clear => match app.service.reset().await {
                Ok(()) => println!("{}", "Cleared all documents and sessions".bright_green()),
                Err(err) => eprintln!("{}", err.user_message().red()),
            },
            ReplCommand::Unknown(input) => {
                println!("{}", format!("Unknown command: {input}").bright_black());
            }
        }
    }

    println!("{}", "Goodbye!".bright_green());
    if let Some(progress) = progress {
        progress.abort();
    }
    Ok(())
}

async fn ask(app: &App, session: &str, question: &str) {
    println!("{}", format!("> {question}").green());

    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancel.clone());
    let result = app
        .service
        .query_with_cancel(question, Some(session), cancel)
        .await;
    watcher.abort();

    match result {
        Ok(response) => render::print_response(&response),
        Err(err) => eprintln!("{}", err.user_message().red()),
    }
}
