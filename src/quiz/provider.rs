//! Question acquisition: one attempt at the generator, then the bundled bank.

use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;

use super::bank::QuestionBank;
use super::validator::{self, ValidationError};
use super::{Difficulty, Question};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest<'a> {
    pub subject: &'a str,
    pub difficulty: Difficulty,
    pub count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("question generation is not configured")]
    NotConfigured,
    #[error("generation request failed: {0}")]
    Api(String),
    #[error("generation request timed out after {0:?}")]
    Timeout(Duration),
    #[error("response is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("response is not a JSON array")]
    NotAnArray,
    #[error("response contains no questions")]
    EmptyBatch,
    #[error("question {index} is invalid: {source}")]
    Invalid {
        index: usize,
        source: ValidationError,
    },
}

/// Something that can produce raw generator output for a request.
#[allow(async_fn_in_trait)]
pub trait QuestionSource {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, RemoteError>;
}

/// Source type for a provider that never goes remote.
#[derive(Debug, Clone, Copy)]
pub enum NoSource {}

impl QuestionSource for NoSource {
    async fn generate(&self, _request: &GenerationRequest<'_>) -> Result<String, RemoteError> {
        match *self {}
    }
}

/// Where an acquired question set came from. Only used for logging and
/// diagnostics; the quiz behaves the same either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionOrigin {
    Remote,
    Bank,
}

#[derive(Debug, Clone)]
pub struct Acquired {
    pub questions: Vec<Question>,
    pub origin: QuestionOrigin,
}

pub struct QuestionProvider<S> {
    source: Option<S>,
    bank: &'static QuestionBank,
    timeout: Duration,
    rng: StdRng,
}

impl QuestionProvider<NoSource> {
    /// A provider that only serves questions from the bundled bank.
    pub fn offline() -> Self {
        Self::new(None)
    }
}

impl<S: QuestionSource> QuestionProvider<S> {
    pub fn new(source: Option<S>) -> Self {
        Self {
            source,
            bank: QuestionBank::bundled(),
            timeout: DEFAULT_TIMEOUT,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_bank(mut self, bank: &'static QuestionBank) -> Self {
        self.bank = bank;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn bank(&self) -> &'static QuestionBank {
        self.bank
    }

    pub fn is_remote_configured(&self) -> bool {
        self.source.is_some()
    }

    /// Always yields a usable question list. Generator failures of any kind
    /// are logged and answered from the bank instead.
    pub async fn acquire_questions(
        &mut self,
        subject: &str,
        difficulty: Difficulty,
        count: usize,
    ) -> Acquired {
        let request = GenerationRequest {
            subject,
            difficulty,
            count,
        };

        match self.generate(&request).await {
            Ok(questions) => {
                if questions.len() != count {
                    warn!(
                        "Generator returned {} questions for {subject}/{difficulty}, {count} were requested",
                        questions.len()
                    );
                }
                info!("Using {} generated questions for {subject}/{difficulty}", questions.len());
                Acquired {
                    questions,
                    origin: QuestionOrigin::Remote,
                }
            }
            Err(RemoteError::NotConfigured) => {
                debug!("Generator not configured, serving {subject}/{difficulty} from the bank");
                self.from_bank(&request)
            }
            Err(err) => {
                warn!("Question generation for {subject}/{difficulty} failed, falling back to the bank: {err}");
                self.from_bank(&request)
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<Vec<Question>, RemoteError> {
        let source = self.source.as_ref().ok_or(RemoteError::NotConfigured)?;
        let raw = tokio::time::timeout(self.timeout, source.generate(request))
            .await
            .map_err(|_| RemoteError::Timeout(self.timeout))??;
        parse_batch(&raw)
    }

    fn from_bank(&mut self, request: &GenerationRequest<'_>) -> Acquired {
        let (subject, mut pool) = self.bank.questions_for(request.subject, request.difficulty);
        pool.shuffle(&mut self.rng);

        let questions: Vec<Question> = pool.into_iter().take(request.count).cloned().collect();
        debug!(
            "Drew {} of the requested {} questions from bank subject {subject}",
            questions.len(),
            request.count
        );
        Acquired {
            questions,
            origin: QuestionOrigin::Bank,
        }
    }
}

/// Parses generator output into questions. The batch is accepted only if
/// every candidate validates.
pub fn parse_batch(raw: &str) -> Result<Vec<Question>, RemoteError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    let candidates = value.as_array().ok_or(RemoteError::NotAnArray)?;
    if candidates.is_empty() {
        return Err(RemoteError::EmptyBatch);
    }

    candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            validator::validate(candidate).map_err(|source| RemoteError::Invalid { index, source })
        })
        .collect()
}

/// Removes a surrounding ``` fence, with or without a `json` tag.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    inner.trim()
}
