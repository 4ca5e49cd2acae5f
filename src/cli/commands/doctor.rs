//! Doctor command - verify system requirements and configuration.

use crate::audio::{input_device_name, SystemPlayer};
use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::CorpusStore;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
///
/// `config_path` is the `-c` override, if one was given.
pub fn run_doctor(settings: &Settings, config_path: Option<&Path>) -> anyhow::Result<()> {
    Output::header("Uzhavan Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // Voice mode only; text mode works without these.
    let tools = vec![
        check_microphone(settings.voice.input_device.as_deref()),
        check_player(settings.voice.player.as_deref()),
    ];
    print_section("Audio (voice mode)", &tools);
    checks.extend(tools);

    let mut keys = vec![check_api_key(&settings.embedding.api_key_env, "embeddings")];
    if settings.generation.api_key_env != settings.embedding.api_key_env {
        keys.push(check_api_key(&settings.generation.api_key_env, "answers"));
    }
    keys.push(check_api_key(&settings.speech.api_key_env, "speech"));
    print_section("API Keys", &keys);
    checks.extend(keys);

    let corpus = vec![check_corpus(settings)];
    print_section("Corpus", &corpus);
    checks.extend(corpus);

    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Settings::default_config_path);
    let config = vec![check_config_file(&config_path)];
    print_section("Configuration", &config);
    checks.extend(config);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Uzhavan.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Uzhavan is ready to use.");
    }

    Ok(())
}

/// Check that a microphone can be opened.
fn check_microphone(preferred: Option<&str>) -> CheckResult {
    match input_device_name(preferred) {
        Ok(name) => CheckResult::ok("Microphone", &name),
        // A missing microphone only disables voice mode.
        Err(e) => CheckResult::warning(
            "Microphone",
            &e.to_string(),
            "Connect a microphone, or set voice.input_device to one listed by your system",
        ),
    }
}

fn check_player(configured: Option<&str>) -> CheckResult {
    let player = SystemPlayer::new(configured);
    let program = player.program();
    if which(program) {
        CheckResult::ok("Audio player", program)
    } else {
        CheckResult::warning(
            "Audio player",
            &format!("{} not found", program),
            "Set voice.player in the config to a command that plays MP3 files",
        )
    }
}

/// Whether `program` resolves to an executable on PATH (or is a path that exists).
fn which(program: &str) -> bool {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.exists();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                let full = dir.join(program);
                full.is_file() || full.with_extension("exe").is_file()
            })
        })
        .unwrap_or(false)
}

/// Check that an API key is present, showing only a masked form.
fn check_api_key(var: &str, purpose: &str) -> CheckResult {
    let name = format!("{} ({})", var, purpose);
    match std::env::var(var) {
        Ok(key) if key.trim().is_empty() => {
            CheckResult::error(&name, "empty", &format!("Set with: export {}='...'", var))
        }
        Ok(key) => CheckResult::ok(&name, &format!("configured ({})", mask_key(&key))),
        Err(_) => CheckResult::error(&name, "not set", &format!("Set with: export {}='...'", var)),
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn check_corpus(settings: &Settings) -> CheckResult {
    let path = settings.corpus_path();
    if !path.exists() {
        return CheckResult::error(
            "Corpus",
            &format!("{} not found", path.display()),
            "Build one with: uzhavan index <files>",
        );
    }

    match CorpusStore::load(&path) {
        Ok(store) => match store.ensure_dimensions(settings.embedding.dimensions as usize) {
            Ok(()) if store.is_empty() => CheckResult::warning(
                "Corpus",
                &format!("{} is empty", path.display()),
                "Answers will have no context. Rebuild with: uzhavan index <files>",
            ),
            Ok(()) => {
                let size = std::fs::metadata(&path)
                    .map(|m| format_size(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_string());
                let mut message = format!(
                    "{} chunks, {} dimensions ({})",
                    store.len(),
                    store.dimensions().unwrap_or(0),
                    size
                );
                if let Some(model) = store.model() {
                    message.push_str(&format!(", {}", model));
                }
                if let Some(built_at) = store.built_at() {
                    message.push_str(&format!(", built {}", built_at.format("%Y-%m-%d")));
                }
                CheckResult::ok("Corpus", &message)
            }
            Err(e) => CheckResult::error(
                "Corpus",
                &e.to_string(),
                "Set embedding.dimensions to match the corpus, or rebuild it",
            ),
        },
        Err(e) => CheckResult::error("Corpus", &e.to_string(), "Rebuild with: uzhavan index <files>"),
    }
}

/// Check if the config file in effect exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: uzhavan config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
