//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    top_k: Option<usize>,
    speak: bool,
    settings: Settings,
) -> Result<()> {
    let operation = if speak { Operation::Speak } else { Operation::Ask };
    if let Err(e) = preflight::check(operation, &settings) {
        Output::error(&e.user_message());
        Output::info("Run 'uzhavan doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let mut engine = orchestrator.rag_engine();
    if let Some(k) = top_k {
        engine = engine.with_top_k(k);
    }
    let speaker = if speak {
        Some(orchestrator.speaker()?)
    } else {
        None
    };

    let spinner = Output::spinner("Thinking...");
    let result = engine.answer(question).await;
    spinner.finish_and_clear();

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            Output::error(&e.user_message());
            return Err(e.into());
        }
    };

    Output::answer(&response);

    if let Some(speaker) = speaker {
        if let Err(e) = speaker.speak(&response.answer).await {
            Output::warning(&e.user_message());
        }
    }

    Ok(())
}
