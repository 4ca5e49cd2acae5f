//! Push-to-talk voice session.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::voice::{ToggleOutcome, VoiceEvent};
use anyhow::Result;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

fn is_quit(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "q" | "exit" | "quit")
}

/// Run the listen command.
pub async fn run_listen(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Listen, &settings) {
        Output::error(&e.user_message());
        Output::info("Run 'uzhavan doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let (tx, mut events) = mpsc::unbounded_channel();
    let session = orchestrator.voice_session(tx)?;

    println!("\n{}", style("Uzhavan voice mode").bold().green());
    println!(
        "{}\n",
        style("Press Enter and speak your question. Type 'q' and Enter to quit.").dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if is_quit(&line) {
                    break;
                }
                match session.toggle() {
                    ToggleOutcome::Started(handle) => in_flight = Some(handle),
                    ToggleOutcome::AlreadyListening => {
                        Output::warning("Already listening. Finish speaking and wait for the answer.");
                    }
                    ToggleOutcome::Closed => break,
                }
            }
            Some(event) = events.recv() => render(event),
        }
    }

    session.quit();

    if let Some(mut handle) = in_flight {
        if !handle.is_finished() {
            Output::info("Finishing the current question...");
        }
        loop {
            tokio::select! {
                result = &mut handle => {
                    if let Err(e) = result {
                        debug!("Voice cycle task ended abnormally: {}", e);
                    }
                    break;
                }
                Some(event) = events.recv() => render(event),
            }
        }
    }

    while let Ok(event) = events.try_recv() {
        render(event);
    }

    Output::info("Goodbye!");
    Ok(())
}

fn render(event: VoiceEvent) {
    match event {
        VoiceEvent::Listening => Output::info("Listening... speak now."),
        VoiceEvent::Recognizing => Output::info("Recognizing speech..."),
        VoiceEvent::Recognized(text) => {
            println!("{} {}", style("You:").green().bold(), text);
        }
        VoiceEvent::Answered(response) => Output::answer(&response),
        VoiceEvent::Spoken => debug!("Answer spoken"),
        VoiceEvent::Failed(e) => Output::error(&e.user_message()),
        VoiceEvent::Ready => Output::info("Press Enter to ask another question."),
    }
}
