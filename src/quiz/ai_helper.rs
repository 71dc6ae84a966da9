use std::time::Duration;

use chatgpt::client::ChatGPT;
use chatgpt::config::{ChatGPTEngine, ModelConfiguration};
use chatgpt::types::{ChatMessage, CompletionResponse, Role};
use log::debug;
use url::Url;

use crate::quiz::provider::{GenerationRequest, QuestionSource, RemoteError};
use crate::quiz::Difficulty;

const TEMPERATURE: f32 = 0.6;
const TOP_P: f32 = 0.9;
const MAX_TOKENS: u32 = 2500;

const SYSTEM_PROMPT: &str = "You are a quiz generator for computer science students. \
Respond with raw JSON only: a single JSON array and nothing else. \
Do not wrap the JSON in markdown, do not add commentary.";

const GENERIC_HINT: &str = "core concepts, common pitfalls and practical applications of the topic";

/// Topic focus handed to the model for the subjects the bank knows about.
fn subject_hint(subject: &str) -> &'static str {
    match subject.trim().to_lowercase().as_str() {
        "algorithms" => "sorting, searching, graph algorithms, dynamic programming, greedy methods and complexity analysis",
        "data structures" => "arrays, linked lists, stacks, queues, trees, heaps, hash tables and their operation costs",
        "operating systems" => "processes, threads, scheduling, synchronization, deadlocks, memory management and file systems",
        "computer networks" => "the OSI and TCP/IP models, routing, transport protocols, DNS, HTTP and network security basics",
        "databases" => "relational modeling, SQL, normalization, indexing, transactions and isolation levels",
        _ => GENERIC_HINT,
    }
}

fn difficulty_framing(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "introductory level: test definitions and basic recall, suitable for a first course",
        Difficulty::Medium => "intermediate level: require applying concepts to small scenarios and comparing approaches",
        Difficulty::Hard => "advanced level: require multi-step reasoning, edge cases and precise complexity or correctness arguments",
    }
}

fn user_prompt(request: &GenerationRequest<'_>) -> String {
    format!(
        "Generate exactly {count} multiple-choice questions about {subject}.
Difficulty: {difficulty} ({framing}).
Focus on: {hint}.
Every question must have exactly 4 distinct options and exactly one correct answer.
Return a JSON array in exactly this shape:
[
  {{
    \"question\": \"Question text?\",
    \"options\": [\"Option A\", \"Option B\", \"Option C\", \"Option D\"],
    \"correctAnswer\": 0,
    \"explanation\": \"Why the correct option is right.\"
  }}
]
correctAnswer is the zero-based index (0-3) of the correct option.",
        count = request.count,
        subject = request.subject,
        difficulty = request.difficulty,
        framing = difficulty_framing(request.difficulty),
        hint = subject_hint(request.subject),
    )
}

/// Maps a model name onto the client's engine list. Unknown names are passed
/// through verbatim.
fn engine_for(model: &str) -> ChatGPTEngine {
    match model {
        "gpt-3.5-turbo" => ChatGPTEngine::Gpt35Turbo,
        "gpt-4" => ChatGPTEngine::Gpt4,
        // The client only takes static model names; this runs once per generator.
        other => ChatGPTEngine::Custom(Box::leak(other.to_string().into_boxed_str())),
    }
}

/// Generates quiz questions through a chat-completion endpoint.
pub struct QuizGenerator {
    chat_gpt: ChatGPT,
}

impl QuizGenerator {
    pub fn new(
        api_key: &str,
        model: &str,
        api_url: Option<&Url>,
        timeout: Duration,
    ) -> Result<Self, chatgpt::err::Error> {
        let mut config = ModelConfiguration {
            engine: engine_for(model),
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: Some(MAX_TOKENS),
            timeout,
            ..Default::default()
        };
        if let Some(url) = api_url {
            config.api_url = url.clone();
        }

        let chat_gpt = ChatGPT::new_with_config(api_key, config)?;
        Ok(Self { chat_gpt })
    }
}

impl QuestionSource for QuizGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, RemoteError> {
        debug!(
            "Requesting {} {} questions about {:?}",
            request.count, request.difficulty, request.subject
        );
        let history = vec![
            ChatMessage {
                role: Role::System,
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: Role::User,
                content: user_prompt(request),
            },
        ];

        let response: CompletionResponse = self
            .chat_gpt
            .send_history(&history)
            .await
            .map_err(|err| RemoteError::Api(err.to_string()))?;
        let content = response.message().content.clone();

        debug!("Completion: {} bytes", content.len());

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(subject: &str, difficulty: Difficulty) -> GenerationRequest<'_> {
        GenerationRequest {
            subject,
            difficulty,
            count: 5,
        }
    }

    #[test]
    fn prompt_names_subject_count_and_schema() {
        let prompt = user_prompt(&request("Algorithms", Difficulty::Hard));
        assert!(prompt.contains("exactly 5 multiple-choice questions about Algorithms"));
        assert!(prompt.contains("Difficulty: hard (advanced level"));
        assert!(prompt.contains("dynamic programming"));
        assert!(prompt.contains("\"correctAnswer\": 0"));
    }

    #[test]
    fn unknown_subject_gets_generic_hint() {
        let prompt = user_prompt(&request("Quantum Computing", Difficulty::Easy));
        assert!(prompt.contains(GENERIC_HINT));
        assert_eq!(subject_hint("  DATABASES "), subject_hint("Databases"));
    }

    #[test]
    fn known_models_map_to_engines() {
        assert!(matches!(engine_for("gpt-4"), ChatGPTEngine::Gpt4));
        assert!(matches!(
            engine_for("llama-3.1-70b"),
            ChatGPTEngine::Custom("llama-3.1-70b")
        ));
    }
}
