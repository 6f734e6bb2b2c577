//! Slash commands understood by the line-mode client.
//!
//! ```rust
//! use duochat::commands::{Command, parse_command};
//!
//! assert_eq!(parse_command("/m glm-4.6"), Some(Command::Model(Some("glm-4.6".into()))));
//! assert_eq!(parse_command("tell me a joke"), None);
//! ```

use dchat::ChatOrchestrator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Undo,
    Clear,
    Switch,
    /// `None` cycles to the next model in the catalog.
    Model(Option<String>),
    Stats,
    Exit,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Reply(String),
    Exit,
}

/// Returns `None` for ordinary chat input.
pub fn parse_command(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    if matches!(trimmed.to_ascii_lowercase().as_str(), "quit" | "exit" | "q") {
        return Some(Command::Exit);
    }
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.split_whitespace();
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let argument = parts.next().map(str::to_string);

    let command = match name.as_str() {
        "/help" | "/h" | "/?" => Command::Help,
        "/undo" | "/pop" => Command::Undo,
        "/clear" | "/cls" | "/reset" => Command::Clear,
        "/switch" | "/service" | "/engine" => Command::Switch,
        "/model" | "/m" => Command::Model(argument),
        "/stats" | "/usage" | "/u" => Command::Stats,
        "/exit" | "/quit" | "/q" => Command::Exit,
        _ => Command::Unknown(name),
    };
    Some(command)
}

pub fn execute(orchestrator: &mut ChatOrchestrator, command: Command) -> CommandOutcome {
    let reply = match command {
        Command::Help => help_text(orchestrator),
        Command::Undo => {
            if orchestrator.undo_last_turn() {
                format!("Removed the last exchange; {} left.", orchestrator.turn_count())
            } else {
                "Nothing to undo.".to_string()
            }
        }
        Command::Clear => {
            orchestrator.clear_history();
            "Conversation cleared.".to_string()
        }
        Command::Switch => {
            if orchestrator.switch_service() {
                format!(
                    "Now using {} with {}.",
                    orchestrator.service_name(),
                    orchestrator.model()
                )
            } else {
                "No fallback service is configured.".to_string()
            }
        }
        Command::Model(Some(model)) => match orchestrator.set_model(model) {
            Ok(()) => format!("Model set to {}.", orchestrator.model()),
            Err(err) => format!("{}. Available: {}", err.message, orchestrator.models().join(", ")),
        },
        Command::Model(None) => format!("Model set to {}.", orchestrator.cycle_model()),
        Command::Stats => stats_text(orchestrator),
        Command::Exit => return CommandOutcome::Exit,
        Command::Unknown(name) => format!("Unknown command {name}; type /help for the list."),
    };
    CommandOutcome::Reply(reply)
}

fn help_text(orchestrator: &ChatOrchestrator) -> String {
    format!(
        "/help            show this help\n\
         /undo            remove the last exchange\n\
         /clear           start a fresh conversation\n\
         /switch          toggle primary and fallback service\n\
         /model [name]    set the model, or cycle to the next one\n\
         /stats           rate window and token usage\n\
         /exit            quit\n\
         Service: {} | Model: {}",
        orchestrator.service_name(),
        orchestrator.model()
    )
}

fn stats_text(orchestrator: &ChatOrchestrator) -> String {
    let stats = orchestrator.rate_stats();
    format!(
        "{} | requests {}/{} per min ({:.0}%) | tokens {}/{} per min ({:.0}%) | session tokens {} | turns {}",
        orchestrator.service_name(),
        stats.request_count,
        stats.request_limit,
        stats.request_ratio() * 100.0,
        stats.token_count,
        stats.token_limit,
        stats.token_ratio() * 100.0,
        orchestrator.session_tokens(),
        orchestrator.turn_count()
    )
}
