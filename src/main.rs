//! overwatch: supervise agent action batches and replay input events.
//!
//! Usage:
//!   overwatch supervise <message.json> [context.json]
//!   overwatch replay <ws-url|port> <events.json>
//!   overwatch evaluate <task> <conversation.json> [run-id]
//!   overwatch init-config
//!
//! Set OVERWATCH_CONFIG to use a config file other than the platform default.

use anyhow::{bail, Context};
use overwatch_lib::agent::llm::OpenAiJudge;
use overwatch_lib::agent::{evaluation, CdpPage};
use overwatch_lib::config;
use overwatch_lib::replay::{CursorTable, InputReplayer, PageHandle};
use overwatch_lib::supervision::{ChatCompletionMessage, SupervisionContext};
use serde_json::Value;
use std::env;
use std::sync::Arc;

fn read_json(path: &str) -> anyhow::Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path))
}

async fn supervise(message_path: &str, context_path: Option<&str>) -> anyhow::Result<()> {
    let config = config::load_config()?;
    config::validate_config(&config)?;

    let message: ChatCompletionMessage = serde_json::from_value(read_json(message_path)?)
        .context("Message is not a chat completion message")?;

    let context = match context_path {
        Some(path) => match read_json(path)? {
            Value::Array(messages) => SupervisionContext::new(messages),
            other => serde_json::from_value(other).context("Invalid supervision context")?,
        },
        None => SupervisionContext::default(),
    };

    let dispatcher = overwatch_lib::build_dispatcher(&config);
    let verdict = dispatcher
        .supervise(&message, &context, &serde_json::Map::new())
        .await?;

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

async fn replay(target: &str, events_path: &str) -> anyhow::Result<()> {
    let config = config::load_config()?;
    let events = read_json(events_path)?;

    let mut page = match target.parse::<u16>() {
        Ok(port) => CdpPage::connect_port("127.0.0.1", port).await?,
        Err(_) => CdpPage::connect(target).await?,
    };

    let replayer = InputReplayer::new(Arc::new(CursorTable::new()), &config.output.folder);
    let result = replayer.replay(&page, events).await;
    replayer.close_page(&page.id());
    page.close().await?;

    let report = result?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn evaluate(
    task: &str,
    conversation_path: &str,
    run_id: Option<&str>,
) -> anyhow::Result<()> {
    let config = config::load_config()?;
    config::validate_config(&config)?;

    let conversation = match read_json(conversation_path)? {
        Value::Array(messages) => messages,
        _ => bail!("{} must hold a JSON array of messages", conversation_path),
    };

    let model = OpenAiJudge::new(config.judge.clone());
    let summary = evaluation::summarize_conversation(&model, task, &conversation).await;
    let score = evaluation::evaluate_task_success(&model, task, &conversation, &[]).await;

    if let Some(run_id) = run_id {
        let folder = evaluation::write_run_report(
            &config.output.folder,
            task,
            run_id,
            &summary,
            &score,
        )
        .await?;
        eprintln!("Report written to {}", folder.display());
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "score": score,
            "summary": summary,
        }))?
    );
    Ok(())
}

fn init_config() -> anyhow::Result<()> {
    let path = config::get_config_path();
    if path.exists() {
        bail!("Config already exists at {}", path.display());
    }
    config::init_config(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["supervise", message] => supervise(message, None).await,
        ["supervise", message, context] => supervise(message, Some(*context)).await,
        ["replay", target, events] => replay(target, events).await,
        ["evaluate", task, conversation] => evaluate(task, conversation, None).await,
        ["evaluate", task, conversation, run_id] => {
            evaluate(task, conversation, Some(*run_id)).await
        }
        ["init-config"] => init_config(),
        _ => {
            eprintln!("Usage:");
            eprintln!("  overwatch supervise <message.json> [context.json]");
            eprintln!("  overwatch replay <ws-url|port> <events.json>");
            eprintln!("  overwatch evaluate <task> <conversation.json> [run-id]");
            eprintln!("  overwatch init-config");
            std::process::exit(2);
        }
    }
}
