//! CLI output formatting utilities.

use crate::rag::{ContextChunk, RagResponse};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print an answer followed by the chunks it was grounded on.
    pub fn answer(response: &RagResponse) {
        println!("\n{}\n", response.format_for_display());
    }

    /// Print one retrieved chunk.
    pub fn search_result(rank: usize, chunk: &ContextChunk) {
        println!(
            "\n{} {} {} (score: {:.2})",
            style(">>").green(),
            style(format!("#{}", rank)).cyan(),
            style(&chunk.id).bold(),
            chunk.score
        );
        println!("   {}", content_preview(&chunk.content, 200));
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Flatten and truncate content to `max_chars` characters.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_keeps_short_content() {
        assert_eq!(content_preview("line one\nline two", 50), "line one line two");
    }

    #[test]
    fn test_preview_truncates_on_characters() {
        let tamil = "நெல் சாகுபடி முறைகள்";
        let preview = content_preview(tamil, 5);
        assert_eq!(preview.chars().count(), 8);
        assert!(preview.ends_with("..."));
    }
}
