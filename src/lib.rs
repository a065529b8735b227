//! thaiflash - An adaptive flashcard trainer for the Thai alphabet
//!
//! Items are drawn by how far they sit from mastery, categories unlock stage by
//! stage, and flagged items can be drilled on their own. All learning state lives in
//! a [`Trainer`] that persists through a pluggable key-value store.

pub mod app;
pub mod catalog;
pub mod config;
pub mod learning;
pub mod progress;
pub mod session;
pub mod storage;

pub use app::App;
pub use config::Config;
pub use session::Trainer;
