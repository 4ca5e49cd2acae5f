//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Search, &settings) {
        Output::error(&e.user_message());
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.rag_engine().with_top_k(limit);

    let spinner = Output::spinner("Searching...");
    let results = engine.search(query).await;
    spinner.finish_and_clear();

    match results {
        Ok(chunks) => {
            if chunks.is_empty() {
                Output::warning("The corpus is empty.");
            } else {
                Output::success(&format!("Found {} results", chunks.len()));
                for (i, chunk) in chunks.iter().enumerate() {
                    Output::search_result(i + 1, chunk);
                }
            }
        }
        Err(e) => {
            Output::error(&format!("Search failed: {}", e.user_message()));
            return Err(e.into());
        }
    }

    Ok(())
}
