//! A console front end for rsp-runner.
//!
//! Launches the RSP server (set `RSP_SERVER_LOCATION` or pass a config file
//! as the first argument) and accepts commands on stdin. Logs go to
//! `rsp-runner.log` in the current directory; use `RUST_LOG=debug` for more.
use anyhow::Context;
use async_trait::async_trait;
use rsp_runner::explorer::{self, OutputChannel, OutputWindow};
use rsp_runner::protocol::{RunMode, publish_kind};
use rsp_runner::workflow::{InputBoxOptions, OpenDialogOptions, Prompter};
use rsp_runner::{Config, RspRunner, WorkflowOutcome};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt};

/// Prints every channel to stdout, prefixed with its name.
struct ConsoleWindow;

struct ConsoleChannel {
    name: String,
}

impl OutputWindow for ConsoleWindow {
    fn create_channel(&self, name: &str) -> Box<dyn OutputChannel> {
        Box::new(ConsoleChannel {
            name: name.to_string(),
        })
    }
}

impl OutputChannel for ConsoleChannel {
    fn append(&mut self, text: &str) {
        for line in text.lines() {
            println!("[{}] {}", self.name, line);
        }
    }

    fn clear(&mut self) {}

    fn show(&mut self) {}

    fn dispose(&mut self) {
        println!("[{}] closed", self.name);
    }
}

/// Asks questions on stdout and reads answers from stdin.
/// An empty line to a picker or `.` to an input box dismisses it.
struct ConsolePrompter {
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl ConsolePrompter {
    fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
        }
    }

    async fn ask(&self, question: &str) -> Option<String> {
        print!("{} ", question);
        let _ = std::io::stdout().flush();
        self.lines.lock().await.next_line().await.ok().flatten()
    }
}

#[async_trait]
impl Prompter for ConsolePrompter {
    async fn show_open_dialog(&self, options: &OpenDialogOptions) -> Option<Vec<PathBuf>> {
        let path = self.ask(&format!("{}:", options.open_label)).await?;
        let path = path.trim();
        (!path.is_empty()).then(|| vec![PathBuf::from(path)])
    }

    async fn show_input_box(&self, options: &InputBoxOptions) -> Option<String> {
        let question = match &options.value {
            Some(default) => format!("{} [{}]:", options.prompt, default),
            None => format!("{}:", options.prompt),
        };
        let answer = self.ask(&question).await?;
        match answer.trim() {
            "." => None,
            "" => Some(options.value.clone().unwrap_or_default()),
            _ => Some(answer),
        }
    }

    async fn show_quick_pick(&self, items: &[String], placeholder: &str) -> Option<String> {
        let answer = self
            .ask(&format!("{} ({}):", placeholder, items.join("/")))
            .await?;
        items
            .iter()
            .find(|item| item.eq_ignore_ascii_case(answer.trim()))
            .cloned()
    }

    fn show_info(&self, message: &str) {
        println!("{}", message);
    }

    fn show_error(&self, message: &str) {
        eprintln!("error: {}", message);
    }
}

fn print_tree(runner: &RspRunner) -> anyhow::Result<()> {
    let explorer = runner.explorer()?;
    let guard = explorer::lock(&explorer)?;
    for server in guard.get_children(None) {
        if let Some(item) = guard.get_tree_item(&server) {
            println!("{}", item.label);
        }
        for deployable in guard.get_children(Some(&server)) {
            if let Some(item) = guard.get_tree_item(&deployable) {
                println!("  {}", item.label);
            }
        }
    }
    Ok(())
}

fn report<T: std::fmt::Debug>(outcome: WorkflowOutcome<T>) {
    match outcome {
        WorkflowOutcome::Completed(value) => tracing::debug!(?value, "Command completed"),
        WorkflowOutcome::Cancelled => println!("cancelled"),
        WorkflowOutcome::Rejected(reason) => tracing::debug!(%reason, "Command rejected"),
    }
}

async fn run_command(runner: &RspRunner, command: &str, server_id: &str) -> anyhow::Result<bool> {
    let workflows = runner.workflows()?;
    match command {
        "list" => print_tree(runner)?,
        "add" => report(workflows.execute(workflows.add_location()).await?),
        "create" => report(workflows.execute(workflows.create_server()).await?),
        "download" => report(workflows.execute(workflows.download_runtime()).await?),
        "start" => report(workflows.execute(workflows.start_server(server_id, RunMode::Run)).await?),
        "debug" => report(workflows.execute(workflows.start_server(server_id, RunMode::Debug)).await?),
        "stop" => report(workflows.execute(workflows.stop_server(server_id, false)).await?),
        "restart" => report(workflows.execute(workflows.restart_server(server_id)).await?),
        "remove" => report(workflows.execute(workflows.remove_server(server_id)).await?),
        "deploy" => report(workflows.execute(workflows.add_deployment(server_id)).await?),
        "publish" => report(
            workflows
                .execute(workflows.publish_server(server_id, publish_kind::FULL))
                .await?,
        ),
        "output" => workflows.show_server_output(server_id)?,
        "quit" | "exit" => return Ok(false),
        _ => println!(
            "commands: list, add, create, download, start|debug|stop|restart|remove|deploy|publish|output <server>, quit"
        ),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Console output belongs to the servers, so log to a file
    let file_appender = tracing_appender::rolling::never(".", "rsp-runner.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Config::default(),
    };

    let prompter = Arc::new(ConsolePrompter::new());
    let mut runner = RspRunner::new(config, Arc::new(ConsoleWindow), prompter.clone());
    let info = runner.start().await.context("starting the RSP server")?;
    println!("RSP server listening on {}:{}", info.host, info.port);

    while let Some(line) = prompter.ask(">").await {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let server_id = words.next().unwrap_or_default();
        match run_command(&runner, command, server_id).await {
            Ok(true) => {}
            Ok(false) => break,
            // Workflow errors were already shown through the prompter
            Err(e) => tracing::debug!(error = %e, "Command failed"),
        }
    }

    runner.shutdown().await?;
    Ok(())
}
