//! Terminal practice loop

pub mod command;
pub mod render;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::learning::{RandomSource, SeededRandom};
use crate::session::{SessionError, Snapshot, SystemClock, Trainer};
use crate::storage::FileStore;
use command::{Command, ParseResult, parse_input};

/// Wrap width for hints and mnemonics
const TEXT_WIDTH: usize = 72;

/// What the loop should do after a line was handled
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Print the text and keep going
    Print(String),
    /// Leave the loop
    Quit,
}

/// The main application
pub struct App {
    /// Application configuration
    config: Config,

    /// Learning session
    trainer: Trainer,
}

impl App {
    /// Create an application backed by the configured data directory
    pub fn new(config: Config, seed: Option<u64>) -> Result<Self> {
        let catalog = Catalog::builtin().context("Built-in catalog is invalid")?;
        let data_dir = config.data_dir()?;
        tracing::debug!(?data_dir, "Opening progress store");

        let random: Box<dyn RandomSource> = match seed {
            Some(seed) => Box::new(SeededRandom::from_seed(seed)),
            None => Box::new(SeededRandom::from_entropy()),
        };
        let trainer = Trainer::new(
            catalog,
            Box::new(FileStore::new(data_dir)),
            random,
            Box::new(SystemClock),
            &config,
        );
        Ok(Self { config, trainer })
    }

    /// Wrap an existing trainer
    pub fn with_trainer(config: Config, trainer: Trainer) -> Self {
        Self { config, trainer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    pub fn trainer_mut(&mut self) -> &mut Trainer {
        &mut self.trainer
    }

    /// Run the interactive loop until `:quit` or end of input
    pub async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        if self.trainer.take_daily_reminder() {
            println!("{}\n", render::reminder(&self.config.daily_goal));
        }
        println!("{}", render::card(&self.trainer.snapshot(), TEXT_WIDTH));

        loop {
            // Input typed during a feedback delay wins over the delay
            let line = match self.trainer.pending().copied() {
                Some(pending) => tokio::select! {
                    _ = tokio::time::sleep(pending.delay) => {
                        if let Some(snapshot) = self.trainer.fire_pending(pending.token) {
                            println!("{}", render::card(&snapshot, TEXT_WIDTH));
                        }
                        continue;
                    }
                    line = lines.next_line() => line?,
                },
                None => lines.next_line().await?,
            };

            let Some(line) = line else {
                tracing::debug!("End of input");
                break;
            };

            match self.handle_line(&line) {
                Step::Print(text) => {
                    if !text.is_empty() {
                        println!("{}", text);
                    }
                }
                Step::Quit => break,
            }
        }

        Ok(())
    }

    /// Handle one line of input
    pub fn handle_line(&mut self, line: &str) -> Step {
        match parse_input(line) {
            ParseResult::Ok(command) => self.execute(command),
            ParseResult::UnknownCommand(cmd) => {
                Step::Print(format!("Unknown command: {} (try :help)", cmd))
            }
            ParseResult::MissingArgument(cmd) => {
                Step::Print(format!("{} needs an argument (try :help)", cmd))
            }
            ParseResult::InvalidArgument { command, argument } => {
                Step::Print(format!("{} does not understand {:?}", command, argument))
            }
        }
    }

    /// Run a parsed command against the trainer
    pub fn execute(&mut self, command: Command) -> Step {
        let card = |snapshot| render::card(&snapshot, TEXT_WIDTH);

        match command {
            Command::Answer(choice) => {
                let snapshot = self.trainer.snapshot();
                let Some(selected) = choice.checked_sub(1).and_then(|i| snapshot.options.get(i))
                else {
                    return Step::Print(format!("Pick a number from 1 to {}", snapshot.options.len()));
                };
                match self.trainer.submit_answer(selected) {
                    Ok(outcome) => Step::Print(render::feedback(&outcome, TEXT_WIDTH)),
                    Err(e) => Step::Print(e.user_message()),
                }
            }
            Command::Next => Step::Print(card(self.trainer.request_next())),
            Command::Previous => match self.trainer.request_previous() {
                Ok(snapshot) => Step::Print(card(snapshot)),
                Err(e) => Step::Print(e.to_string()),
            },
            Command::Goto(id) => match self.trainer.go_to_item(&id) {
                Ok(snapshot) => Step::Print(card(snapshot)),
                Err(e) => Step::Print(e.to_string()),
            },
            Command::Filter(category) => {
                let snapshot = self.trainer.toggle_category_filter(category);
                let enabled: Vec<&str> = snapshot.filters.iter().map(|c| c.as_str()).collect();
                Step::Print(format!("Practicing: {}\n\n{}", enabled.join(", "), card(snapshot)))
            }
            Command::Drill => drill_result(self.trainer.start_unfamiliar_drill()),
            Command::Focus(ids) => {
                drill_result(self.trainer.start_focused_drill(&ids, "Focused drill"))
            }
            Command::Leave => match self.trainer.leave_custom_session() {
                Ok(snapshot) => Step::Print(card(snapshot)),
                Err(e) => Step::Print(e.user_message()),
            },
            Command::Flag | Command::Unflag => {
                let flagged = command == Command::Flag;
                let id = self.trainer.current_item().id.clone();
                match self.trainer.set_manual_flag(&id, flagged) {
                    Ok(snapshot) if flagged => {
                        Step::Print(format!("Flagged {} as unfamiliar.", snapshot.item.script))
                    }
                    Ok(snapshot) => Step::Print(format!("Unflagged {}.", snapshot.item.script)),
                    Err(e) => Step::Print(e.to_string()),
                }
            }
            Command::Stats => Step::Print(render::stats(&self.trainer)),
            Command::Reset => {
                let snapshot = self.trainer.reset_all_progress();
                Step::Print(format!("Progress reset.\n\n{}", card(snapshot)))
            }
            Command::Help => Step::Print(render::HELP.to_string()),
            Command::Quit => Step::Quit,
            Command::Nop => Step::Print(String::new()),
        }
    }
}

fn drill_result(result: Result<Snapshot, SessionError>) -> Step {
    match result {
        Ok(snapshot) => Step::Print(render::card(&snapshot, TEXT_WIDTH)),
        Err(e) => Step::Print(e.user_message()),
    }
}
