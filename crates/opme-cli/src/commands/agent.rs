//! Finance agent command

use anyhow::{Context, Result};
use opme_core::db::Database;
use opme_core::{
    AgentOutcome, AgentRun, AgentTask, FinanceAgent, FinanceTools, LlmClient,
};

use super::load_analyzer;

/// Run one agent task and return the full run
pub async fn run_agent(
    db: Database,
    llm: LlmClient,
    message: &str,
    context: Option<&str>,
) -> Result<AgentRun> {
    let mut task = AgentTask::new(message);
    task.user_id = Some("cli".to_string());
    if let Some(raw) = context {
        let value = serde_json::from_str(raw).context("--context must be valid JSON")?;
        task = task.with_context(value);
    }

    let tools = FinanceTools::new(db, load_analyzer()).with_env_clients();
    let agent = FinanceAgent::new(llm, tools);
    agent.run(&task).await.context("Agent run failed")
}

pub async fn cmd_ask(
    db: Database,
    llm: LlmClient,
    message: &str,
    context: Option<&str>,
) -> Result<()> {
    let run = run_agent(db, llm, message, context).await?;

    println!();
    for result in &run.tool_results {
        let status = if result.success { "✓" } else { "✗" };
        println!("   🔧 {} {}", status, result.tool);
        if let Some(ref error) = result.error {
            println!("      {}", error);
        }
    }

    match &run.outcome {
        AgentOutcome::Responded(response) => {
            match response.summary() {
                Some(summary) => println!("{}", summary),
                None => println!("{}", serde_json::to_string_pretty(&response.data)?),
            }
            println!();
            println!("   (confiança {:.0}%)", response.confidence * 100.0);
        }
        AgentOutcome::ParseFailure { stage, reason, raw } => {
            eprintln!("⚠️  Could not read the model's {:?} reply: {}", stage, reason);
            eprintln!("{}", raw);
        }
    }
    println!();

    Ok(())
}
