//! Interactive text session.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::RagEngine;
use crate::speech::Speaker;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::debug;

/// What to do with one line of input.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Quit,
    Skip,
    Question(&'a str),
}

fn classify(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    if line.is_empty() {
        ChatInput::Skip
    } else if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        ChatInput::Quit
    } else {
        ChatInput::Question(line)
    }
}

/// Run the interactive chat command.
pub async fn run_chat(speak: bool, settings: Settings) -> Result<()> {
    let operation = if speak { Operation::Speak } else { Operation::Ask };
    if let Err(e) = preflight::check(operation, &settings) {
        Output::error(&e.user_message());
        Output::info("Run 'uzhavan doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.rag_engine();
    let speaker = if speak {
        Some(orchestrator.speaker()?)
    } else {
        None
    };

    println!("\n{}", style("Uzhavan").bold().green());
    println!(
        "{}\n",
        style("Ask a farming question, or type 'exit' to quit.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            // End of input
            println!();
            break;
        }

        match classify(&input) {
            ChatInput::Skip => continue,
            ChatInput::Quit => break,
            ChatInput::Question(question) => {
                answer_one(&engine, speaker.as_ref(), question).await;
            }
        }
    }

    Output::info("Goodbye!");
    Ok(())
}

/// Answer one question. Failures are reported and the session continues.
async fn answer_one(engine: &RagEngine, speaker: Option<&Speaker>, question: &str) {
    let spinner = Output::spinner("Thinking...");
    let result = engine.answer(question).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            debug!("Answer used {} sources", response.sources.len());
            println!(
                "\n{} {}\n",
                style("Uzhavan:").cyan().bold(),
                response.answer
            );
            if let Some(speaker) = speaker {
                if let Err(e) = speaker.speak(&response.answer).await {
                    Output::warning(&e.user_message());
                }
            }
        }
        Err(e) => Output::error(&e.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_sentinels() {
        assert_eq!(classify("exit\n"), ChatInput::Quit);
        assert_eq!(classify("  QUIT "), ChatInput::Quit);
    }

    #[test]
    fn test_blank_lines_skipped() {
        assert_eq!(classify("   \n"), ChatInput::Skip);
    }

    #[test]
    fn test_question_is_trimmed() {
        assert_eq!(
            classify(" How to grow tomatoes?\n"),
            ChatInput::Question("How to grow tomatoes?")
        );
    }
}
