//! Screen-level state machine driven by presentation events.

use std::fmt;

use log::{debug, info, warn};

use crate::config::Config;
use crate::quiz::ai_helper::QuizGenerator;
use crate::quiz::provider::{NoSource, QuestionOrigin, QuestionProvider, QuestionSource};
use crate::quiz::{Difficulty, QuizResult, QuizSession, SessionError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Selecting,
    Loading,
    InQuiz,
    ShowingResults,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub subject: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SelectSubject {
        subject: String,
        difficulty: Difficulty,
    },
    AnswerQuestion(usize),
    Advance,
    Retry,
    SelectNewSubject,
    DismissError,
}

impl Event {
    pub fn select(subject: impl Into<String>, difficulty: Difficulty) -> Self {
        Event::SelectSubject {
            subject: subject.into(),
            difficulty,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Event::SelectSubject { .. } => "SelectSubject",
            Event::AnswerQuestion(_) => "AnswerQuestion",
            Event::Advance => "Advance",
            Event::Retry => "Retry",
            Event::SelectNewSubject => "SelectNewSubject",
            Event::DismissError => "DismissError",
        }
    }
}

/// Selection problems shown to the user as an error banner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("Please choose a subject before starting the quiz.")]
    MissingSubject,
    #[error("No questions are available for {subject}.")]
    NoQuestions { subject: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IgnoreReason {
    #[error("{event} is not accepted on the {screen:?} screen")]
    WrongScreen { event: &'static str, screen: Screen },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("there is no error to dismiss")]
    NoError,
    #[error("there is no previous selection to retry")]
    NothingToRetry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The event was not valid in the current state; nothing changed.
    Ignored(IgnoreReason),
    /// The selection was refused and `AppState::error` now explains why.
    Rejected(SelectionError),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => f.write_str("applied"),
            Outcome::Ignored(reason) => write!(f, "ignored: {reason}"),
            Outcome::Rejected(err) => write!(f, "rejected: {err}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    screen: Screen,
    error: Option<String>,
    last_selection: Option<Selection>,
    session: Option<QuizSession>,
    last_result: Option<QuizResult>,
    last_origin: Option<QuestionOrigin>,
}

impl AppState {
    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_selection(&self) -> Option<&Selection> {
        self.last_selection.as_ref()
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    pub fn last_result(&self) -> Option<QuizResult> {
        self.last_result
    }

    /// Where the current question set came from. Diagnostics only.
    pub fn last_origin(&self) -> Option<QuestionOrigin> {
        self.last_origin
    }
}

/// Owns the application state. `handle` takes `&mut self`, so events are
/// processed strictly one after another, including the wait for questions.
pub struct QuizApp<S> {
    state: AppState,
    provider: QuestionProvider<S>,
    question_count: usize,
}

impl QuizApp<QuizGenerator> {
    /// Wires the generator when an API key is configured. A generator that
    /// cannot be built is logged and the app runs from the bank.
    pub fn from_config(config: &Config) -> Self {
        let generator = config.api_key.as_deref().and_then(|key| {
            match QuizGenerator::new(key, &config.model, config.api_url.as_ref(), config.timeout) {
                Ok(generator) => Some(generator),
                Err(err) => {
                    warn!("Question generator unavailable, using the bundled bank: {err}");
                    None
                }
            }
        });
        if generator.is_none() {
            info!("No question generator configured, quizzes will use the bundled bank");
        }

        let provider = QuestionProvider::new(generator).with_timeout(config.timeout);
        Self::new(provider, config.question_count)
    }
}

impl QuizApp<NoSource> {
    pub fn offline(question_count: usize) -> Self {
        Self::new(QuestionProvider::offline(), question_count)
    }
}

impl<S: QuestionSource> QuizApp<S> {
    pub fn new(provider: QuestionProvider<S>, question_count: usize) -> Self {
        Self {
            state: AppState::default(),
            provider,
            question_count,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn provider(&self) -> &QuestionProvider<S> {
        &self.provider
    }

    pub async fn handle(&mut self, event: Event) -> Outcome {
        let name = event.name();
        let outcome = match event {
            Event::SelectSubject {
                subject,
                difficulty,
            } => {
                if self.state.screen != Screen::Selecting {
                    self.wrong_screen(name)
                } else {
                    self.start(Selection {
                        subject,
                        difficulty,
                    })
                    .await
                }
            }
            Event::AnswerQuestion(option) => self.answer(name, option),
            Event::Advance => self.advance(name),
            Event::Retry => self.retry(name).await,
            Event::SelectNewSubject => {
                self.reset();
                Outcome::Applied
            }
            Event::DismissError => {
                if self.state.error.take().is_some() {
                    self.state.screen = Screen::Selecting;
                    Outcome::Applied
                } else {
                    Outcome::Ignored(IgnoreReason::NoError)
                }
            }
        };

        match &outcome {
            Outcome::Applied => debug!("{name} applied, now on {:?}", self.state.screen),
            Outcome::Ignored(reason) => debug!("{name} ignored: {reason}"),
            Outcome::Rejected(err) => info!("{name} rejected: {err}"),
        }
        outcome
    }

    fn wrong_screen(&self, event: &'static str) -> Outcome {
        Outcome::Ignored(IgnoreReason::WrongScreen {
            event,
            screen: self.state.screen,
        })
    }

    fn reject(&mut self, err: SelectionError) -> Outcome {
        self.state.error = Some(err.to_string());
        self.state.screen = Screen::Selecting;
        Outcome::Rejected(err)
    }

    async fn start(&mut self, selection: Selection) -> Outcome {
        let subject = selection.subject.trim().to_string();
        if subject.is_empty() {
            return self.reject(SelectionError::MissingSubject);
        }
        let difficulty = selection.difficulty;

        self.state.error = None;
        self.state.last_result = None;
        self.state.session = None;
        self.state.last_selection = Some(Selection {
            subject: subject.clone(),
            difficulty,
        });
        self.state.screen = Screen::Loading;

        let acquired = self
            .provider
            .acquire_questions(&subject, difficulty, self.question_count)
            .await;
        self.state.last_origin = Some(acquired.origin);

        if acquired.questions.is_empty() {
            return self.reject(SelectionError::NoQuestions { subject });
        }

        info!(
            "Starting {subject}/{difficulty} quiz with {} questions ({:?})",
            acquired.questions.len(),
            acquired.origin
        );
        self.state.session = Some(QuizSession::new(subject, difficulty, acquired.questions));
        self.state.screen = Screen::InQuiz;
        Outcome::Applied
    }

    fn answer(&mut self, name: &'static str, option: usize) -> Outcome {
        if self.state.screen != Screen::InQuiz {
            return self.wrong_screen(name);
        }
        let Some(session) = self.state.session.as_mut() else {
            return self.wrong_screen(name);
        };

        match session.answer(option) {
            Ok(feedback) => {
                debug!(
                    "Answered option {} (correct is {})",
                    feedback.chosen, feedback.correct_index
                );
                Outcome::Applied
            }
            Err(err) => Outcome::Ignored(err.into()),
        }
    }

    fn advance(&mut self, name: &'static str) -> Outcome {
        if self.state.screen != Screen::InQuiz {
            return self.wrong_screen(name);
        }
        let Some(session) = self.state.session.as_mut() else {
            return self.wrong_screen(name);
        };

        if let Err(err) = session.advance() {
            return Outcome::Ignored(err.into());
        }

        if session.is_finished() {
            let result = session.result();
            info!(
                "Quiz finished: {}/{} ({}%)",
                result.score,
                result.total,
                result.percentage()
            );
            self.state.last_result = Some(result);
            self.state.screen = Screen::ShowingResults;
        }
        Outcome::Applied
    }

    async fn retry(&mut self, name: &'static str) -> Outcome {
        if self.state.screen != Screen::ShowingResults {
            return self.wrong_screen(name);
        }
        let Some(selection) = self.state.last_selection.clone() else {
            return Outcome::Ignored(IgnoreReason::NothingToRetry);
        };

        self.start(selection).await
    }

    fn reset(&mut self) {
        self.state.screen = Screen::Selecting;
        self.state.session = None;
        self.state.error = None;
        self.state.last_result = None;
        self.state.last_origin = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn in_quiz() -> QuizApp<NoSource> {
        let mut app = QuizApp::offline(3);
        let outcome = app.handle(Event::select("Databases", Difficulty::Medium)).await;
        assert_eq!(outcome, Outcome::Applied);
        app
    }

    #[tokio::test]
    async fn selection_starts_a_fresh_session() {
        let app = in_quiz().await;
        let state = app.state();
        assert_eq!(state.screen(), Screen::InQuiz);
        assert_eq!(state.last_origin(), Some(QuestionOrigin::Bank));

        let session = state.session().unwrap();
        assert_eq!(session.total(), 3);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.answered_count(), 0);
        assert_eq!(
            state.last_selection(),
            Some(&Selection {
                subject: "Databases".to_string(),
                difficulty: Difficulty::Medium,
            })
        );
    }

    #[tokio::test]
    async fn blank_subject_shows_an_error_until_dismissed() {
        let mut app = QuizApp::offline(5);
        let outcome = app.handle(Event::select("   ", Difficulty::Easy)).await;

        assert_eq!(outcome, Outcome::Rejected(SelectionError::MissingSubject));
        assert_eq!(app.state().screen(), Screen::Selecting);
        assert!(app.state().error().is_some());
        assert!(app.state().session().is_none());
        assert!(app.state().last_origin().is_none());

        assert_eq!(app.handle(Event::DismissError).await, Outcome::Applied);
        assert!(app.state().error().is_none());
        assert_eq!(
            app.handle(Event::DismissError).await,
            Outcome::Ignored(IgnoreReason::NoError)
        );
    }

    #[tokio::test]
    async fn quiz_events_are_ignored_outside_the_quiz() {
        let mut app = QuizApp::offline(5);
        for event in [Event::AnswerQuestion(0), Event::Advance, Event::Retry] {
            let outcome = app.handle(event).await;
            assert!(matches!(
                outcome,
                Outcome::Ignored(IgnoreReason::WrongScreen {
                    screen: Screen::Selecting,
                    ..
                })
            ));
        }
    }

    #[tokio::test]
    async fn selecting_again_mid_quiz_is_ignored() {
        let mut app = in_quiz().await;
        let outcome = app.handle(Event::select("Algorithms", Difficulty::Hard)).await;
        assert!(matches!(outcome, Outcome::Ignored(IgnoreReason::WrongScreen { .. })));
        assert_eq!(app.state().session().unwrap().subject(), "Databases");
    }

    #[tokio::test]
    async fn repeated_answer_keeps_the_first_choice() {
        let mut app = in_quiz().await;
        assert!(app.handle(Event::AnswerQuestion(2)).await.is_applied());
        let outcome = app.handle(Event::AnswerQuestion(0)).await;

        assert_eq!(
            outcome,
            Outcome::Ignored(IgnoreReason::Session(SessionError::AlreadyAnswered { index: 0 }))
        );
        let session = app.state().session().unwrap();
        assert_eq!(session.answer_for(0), Some(2));
        assert_eq!(session.feedback().unwrap().chosen, 2);
    }

    #[tokio::test]
    async fn advance_waits_for_an_answer() {
        let mut app = in_quiz().await;
        let outcome = app.handle(Event::Advance).await;
        assert_eq!(
            outcome,
            Outcome::Ignored(IgnoreReason::Session(SessionError::NotAnswered { index: 0 }))
        );
        assert_eq!(app.state().session().unwrap().current_index(), 0);
    }

    #[tokio::test]
    async fn new_subject_clears_everything_from_any_screen() {
        let mut app = in_quiz().await;
        app.handle(Event::AnswerQuestion(0)).await;

        assert_eq!(app.handle(Event::SelectNewSubject).await, Outcome::Applied);
        let state = app.state();
        assert_eq!(state.screen(), Screen::Selecting);
        assert!(state.session().is_none());
        assert!(state.error().is_none());
        assert!(state.last_result().is_none());
    }
}
