//! Multiple-choice quiz engine.
//!
//! A presentation layer drives [`QuizApp`] with [`Event`]s and renders the
//! [`AppState`] it exposes. Questions come from a chat-completion generator
//! when `CHATGPT_API_KEY` is configured, and from the bundled question bank
//! otherwise or whenever generation fails.
//!
//! ```no_run
//! use quiz_engine::{Config, Difficulty, Event, QuizApp};
//!
//! # async fn run() -> Result<(), quiz_engine::ConfigError> {
//! let config = Config::from_env()?;
//! let mut app = QuizApp::from_config(&config);
//! app.handle(Event::select("Algorithms", Difficulty::Easy)).await;
//! let question = app.state().session().and_then(|s| s.current_question());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod quiz;

pub use app::{AppState, Event, IgnoreReason, Outcome, QuizApp, Screen, Selection, SelectionError};
pub use config::{Config, ConfigError};
pub use quiz::bank::QuestionBank;
pub use quiz::provider::{Acquired, QuestionOrigin, QuestionProvider, QuestionSource};
pub use quiz::validator::ValidationError;
pub use quiz::{Difficulty, Feedback, Performance, Question, QuizResult, QuizSession, SessionError};
