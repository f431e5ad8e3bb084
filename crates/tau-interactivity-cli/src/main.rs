mod cli_args;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tau_interactivity::{
    ChannelId, InboundMessage, InteractivityConfig, InteractivityService, MessageHub, MessageId,
    Selection, SelectionAppearance, UserId,
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli_args::Cli;

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(cli: &Cli) -> Result<InteractivityConfig> {
    match cli.config.as_deref() {
        Some(path) => InteractivityConfig::load_from_path(path),
        None => Ok(InteractivityConfig::from_env()),
    }
}

fn build_selection(cli: &Cli) -> Result<Selection<String>> {
    let mut builder = Selection::builder()
        .values(cli.options.iter().map(|(value, _)| value.clone()))
        .possibilities(cli.options.iter().map(|(_, reply)| reply.clone()))
        .allowed_users(cli.allowed_users.iter().copied().map(UserId))
        .allow_cancel(cli.allow_cancel)
        .case_sensitive(cli.case_sensitive)
        .appearance(SelectionAppearance {
            delete_invalid: cli.delete_invalid,
            delete_valid: cli.delete_valid,
            ..SelectionAppearance::default()
        })
        .presentation(json!({ "title": cli.title.clone().unwrap_or_default() }));
    if cli.numbered {
        builder = builder.numbered();
    }
    builder.build().context("invalid selection options")
}

fn print_prompt(selection: &Selection<String>, cancel_phrase: &str) {
    let title = selection.presentation()["title"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    if !title.is_empty() {
        eprintln!("{title}");
    }
    for (value, reply) in selection.values().iter().zip(selection.possibilities()) {
        eprintln!("  {reply}: {value}");
    }
    if selection.allow_cancel() {
        eprintln!("  {cancel_phrase}: {}", selection.appearance().cancel_display);
    }
}

/// Publishes stdin lines as replies. Runs on a plain thread: a pending stdin
/// read must not keep the runtime alive.
fn feed_stdin(hub: Arc<MessageHub>, channel_id: ChannelId, author_id: UserId) {
    let stdin = std::io::stdin();
    for (index, line) in stdin.lock().lines().enumerate() {
        match line {
            Ok(line) => {
                let message_id = MessageId(index as u64 + 1);
                hub.publish(InboundMessage::new(message_id, channel_id, author_id, line));
            }
            Err(error) => {
                tracing::warn!(%error, "failed to read stdin reply");
                break;
            }
        }
    }
    hub.close();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let selection = Arc::new(build_selection(&cli)?);
    let channel_id = ChannelId(cli.channel_id);
    let (service, hub) = InteractivityService::with_hub(config);
    print_prompt(&selection, &service.config().cancel_phrase);

    let handle = service.start_selection(
        selection,
        channel_id,
        cli.timeout_ms.map(Duration::from_millis),
    );
    let author_id = UserId(cli.author_id);
    std::thread::spawn(move || feed_stdin(hub, channel_id, author_id));
    let report = handle.join().await;

    let rendered =
        serde_json::to_string_pretty(&report).context("failed to render collector report")?;
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse()).await
}
