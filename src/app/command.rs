//! Command parsing for the practice prompt

use crate::catalog::Category;

/// Parsed line from the practice prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pick an option by its 1-based number: 2
    Answer(usize),
    /// Skip to the next card: :next or :n
    Next,
    /// Go back one card: :prev or :p
    Previous,
    /// Jump to an item: :goto <item-id>
    Goto(String),
    /// Toggle a category: :filter <category>
    Filter(Category),
    /// Drill the flagged items: :drill
    Drill,
    /// Drill an explicit list: :focus <id> <id> ...
    Focus(Vec<String>),
    /// Leave the running drill: :leave
    Leave,
    /// Flag the current card as unfamiliar: :flag
    Flag,
    /// Remove the flag from the current card: :unflag
    Unflag,
    /// Show stages, trouble items and today's progress: :stats
    Stats,
    /// Forget all progress: :reset
    Reset,
    /// Show help: :help or :h
    Help,
    /// Quit the application: :q or :quit
    Quit,
    /// Nothing entered
    Nop,
}

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum ParseResult {
    /// Successfully parsed command
    Ok(Command),
    /// Unknown command
    UnknownCommand(String),
    /// Command needs an argument
    MissingArgument(String),
    /// Argument could not be understood
    InvalidArgument { command: String, argument: String },
}

/// Parse one input line; a bare number answers, anything else is a command
pub fn parse_input(input: &str) -> ParseResult {
    let input = input.trim();

    if let Ok(choice) = input.parse::<usize>() {
        return ParseResult::Ok(Command::Answer(choice));
    }

    parse_command(input.strip_prefix(':').unwrap_or(input))
}

/// Parse a command string (without the leading :)
pub fn parse_command(input: &str) -> ParseResult {
    let input = input.trim();

    if input.is_empty() {
        return ParseResult::Ok(Command::Nop);
    }

    // Split into command and arguments
    let mut parts = input.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().map(|s| s.trim()).unwrap_or("");

    match cmd.to_lowercase().as_str() {
        "next" | "n" | "skip" => ParseResult::Ok(Command::Next),
        "prev" | "p" | "back" => ParseResult::Ok(Command::Previous),
        "goto" | "g" => {
            if args.is_empty() {
                ParseResult::MissingArgument("goto".to_string())
            } else {
                ParseResult::Ok(Command::Goto(args.to_string()))
            }
        }
        "filter" | "f" => {
            if args.is_empty() {
                return ParseResult::MissingArgument("filter".to_string());
            }
            match Category::parse(args) {
                Some(category) => ParseResult::Ok(Command::Filter(category)),
                None => ParseResult::InvalidArgument {
                    command: "filter".to_string(),
                    argument: args.to_string(),
                },
            }
        }
        "drill" | "d" => ParseResult::Ok(Command::Drill),
        "focus" => {
            let ids: Vec<String> = args.split_whitespace().map(str::to_string).collect();
            if ids.is_empty() {
                ParseResult::MissingArgument("focus".to_string())
            } else {
                ParseResult::Ok(Command::Focus(ids))
            }
        }
        "leave" | "done" => ParseResult::Ok(Command::Leave),
        "flag" => ParseResult::Ok(Command::Flag),
        "unflag" => ParseResult::Ok(Command::Unflag),
        "stats" | "s" => ParseResult::Ok(Command::Stats),
        "reset" => ParseResult::Ok(Command::Reset),
        "quit" | "q" | "exit" => ParseResult::Ok(Command::Quit),
        "help" | "h" | "?" => ParseResult::Ok(Command::Help),
        _ => ParseResult::UnknownCommand(cmd.to_string()),
    }
}
