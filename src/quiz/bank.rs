use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde_json::Value;

use super::validator::{self, ValidationError};
use super::{Difficulty, Question};

const BUNDLED_JSON: &str = include_str!("bank.json");

static BUNDLED: OnceLock<QuestionBank> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum BankError {
    #[error("question bank is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question {index} of {subject} ({tier}) is invalid: {source}")]
    Invalid {
        subject: String,
        tier: String,
        index: usize,
        source: ValidationError,
    },
    #[error("subject {0} has no questions")]
    EmptySubject(String),
    #[error("default subject {0} is not in the bank")]
    MissingDefault(String),
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct BankFile {
    default_subject: String,
    subjects: BTreeMap<String, RawEntries>,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawEntries {
    Flat(Vec<Value>),
    ByDifficulty(RawTiers),
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTiers {
    #[serde(default)]
    easy: Vec<Value>,
    #[serde(default)]
    medium: Vec<Value>,
    #[serde(default)]
    hard: Vec<Value>,
}

#[derive(Debug, Clone)]
pub enum SubjectQuestions {
    Flat(Vec<Question>),
    ByDifficulty(BTreeMap<Difficulty, Vec<Question>>),
}

impl SubjectQuestions {
    fn all(&self) -> Vec<&Question> {
        match self {
            SubjectQuestions::Flat(questions) => questions.iter().collect(),
            SubjectQuestions::ByDifficulty(tiers) => tiers.values().flatten().collect(),
        }
    }

    fn for_difficulty(&self, difficulty: Difficulty) -> Vec<&Question> {
        match self {
            SubjectQuestions::ByDifficulty(tiers) => match tiers.get(&difficulty) {
                Some(tier) if !tier.is_empty() => tier.iter().collect(),
                _ => self.all(),
            },
            SubjectQuestions::Flat(_) => self.all(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            SubjectQuestions::Flat(questions) => questions.is_empty(),
            SubjectQuestions::ByDifficulty(tiers) => tiers.values().all(Vec::is_empty),
        }
    }
}

/// Static fallback questions, keyed by subject.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    default_subject: String,
    subjects: BTreeMap<String, SubjectQuestions>,
}

impl QuestionBank {
    /// The bank compiled into the library.
    pub fn bundled() -> &'static QuestionBank {
        BUNDLED.get_or_init(|| {
            QuestionBank::from_json(BUNDLED_JSON).expect("Bundled question bank must be valid")
        })
    }

    /// Parses a bank and validates every entry with the same rules applied to
    /// generated questions.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let file: BankFile = serde_json::from_str(json)?;

        let mut subjects = BTreeMap::new();
        for (subject, entries) in file.subjects {
            let questions = match entries {
                RawEntries::Flat(raw) => SubjectQuestions::Flat(validate_all(&subject, "all", &raw)?),
                RawEntries::ByDifficulty(tiers) => {
                    let mut by_difficulty = BTreeMap::new();
                    for (difficulty, raw) in [
                        (Difficulty::Easy, tiers.easy),
                        (Difficulty::Medium, tiers.medium),
                        (Difficulty::Hard, tiers.hard),
                    ] {
                        let questions = validate_all(&subject, difficulty.as_str(), &raw)?;
                        by_difficulty.insert(difficulty, questions);
                    }
                    SubjectQuestions::ByDifficulty(by_difficulty)
                }
            };
            if questions.is_empty() {
                return Err(BankError::EmptySubject(subject));
            }
            subjects.insert(subject, questions);
        }

        if !subjects.contains_key(&file.default_subject) {
            return Err(BankError::MissingDefault(file.default_subject));
        }

        Ok(Self {
            default_subject: file.default_subject,
            subjects,
        })
    }

    pub fn default_subject(&self) -> &str {
        &self.default_subject
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.resolve(subject).is_some()
    }

    /// Exact match first, then case-insensitive.
    fn resolve(&self, subject: &str) -> Option<(&str, &SubjectQuestions)> {
        let subject = subject.trim();
        self.subjects
            .get_key_value(subject)
            .or_else(|| {
                self.subjects
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(subject))
            })
            .map(|(name, questions)| (name.as_str(), questions))
    }

    /// Questions for a subject and difficulty. Unknown subjects resolve to the
    /// default subject. Returns the subject name that was actually used.
    pub fn questions_for(&self, subject: &str, difficulty: Difficulty) -> (&str, Vec<&Question>) {
        let (name, questions) = match self.resolve(subject) {
            Some(found) => found,
            None => {
                log::debug!(
                    "Subject {:?} is not in the bank, using {:?}",
                    subject,
                    self.default_subject
                );
                let default = &self.subjects[&self.default_subject];
                (self.default_subject.as_str(), default)
            }
        };
        (name, questions.for_difficulty(difficulty))
    }
}

fn validate_all(subject: &str, tier: &str, raw: &[Value]) -> Result<Vec<Question>, BankError> {
    raw.iter()
        .enumerate()
        .map(|(index, candidate)| {
            validator::validate(candidate).map_err(|source| BankError::Invalid {
                subject: subject.to_string(),
                tier: tier.to_string(),
                index,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "default_subject": "Flat",
        "subjects": {
            "Flat": [
                {"question": "q1", "options": ["a", "b", "c", "d"], "correctAnswer": 0, "explanation": "e"}
            ],
            "Tiered": {
                "easy": [
                    {"question": "easy q", "options": ["a", "b", "c", "d"], "correctAnswer": 1, "explanation": "e"}
                ],
                "hard": [
                    {"question": "hard q", "options": ["a", "b", "c", "d"], "correctAnswer": 2, "explanation": "e"}
                ]
            }
        }
    }"#;

    #[test]
    fn bundled_bank_loads() {
        let bank = QuestionBank::bundled();
        assert_eq!(bank.default_subject(), "Algorithms");
        assert!(bank.subjects().count() >= 5);
    }

    #[test]
    fn bundled_bank_has_enough_questions_everywhere() {
        let bank = QuestionBank::bundled();
        for subject in bank.subjects() {
            for difficulty in Difficulty::ALL {
                let (_, questions) = bank.questions_for(subject, difficulty);
                assert!(questions.len() >= 5, "{subject} {difficulty} has {}", questions.len());
            }
        }
    }

    #[test]
    fn tiered_subject_uses_its_difficulty() {
        let bank = QuestionBank::from_json(SMALL).unwrap();
        let (name, questions) = bank.questions_for("Tiered", Difficulty::Hard);
        assert_eq!(name, "Tiered");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text(), "hard q");
    }

    #[test]
    fn empty_tier_falls_back_to_whole_subject() {
        let bank = QuestionBank::from_json(SMALL).unwrap();
        let (_, questions) = bank.questions_for("Tiered", Difficulty::Medium);
        assert_eq!(questions.len(), 2);
    }

    #[test]
    fn lookup_ignores_case_and_unknown_goes_to_default() {
        let bank = QuestionBank::from_json(SMALL).unwrap();
        assert_eq!(bank.questions_for("tiered", Difficulty::Easy).0, "Tiered");
        assert_eq!(bank.questions_for("Astrophysics", Difficulty::Easy).0, "Flat");
        assert!(!bank.contains("Astrophysics"));
    }

    #[test]
    fn invalid_entry_names_its_location() {
        let json = r#"{
            "default_subject": "S",
            "subjects": {"S": [{"question": "q", "options": ["a", "b"], "correctAnswer": 0, "explanation": "e"}]}
        }"#;
        match QuestionBank::from_json(json) {
            Err(BankError::Invalid { subject, index, source, .. }) => {
                assert_eq!(subject, "S");
                assert_eq!(index, 0);
                assert_eq!(source, ValidationError::OptionCount { found: 2 });
            }
            other => panic!("expected invalid entry, got {other:?}"),
        }
    }

    #[test]
    fn default_subject_must_exist() {
        let json = r#"{"default_subject": "Missing", "subjects": {"S": [
            {"question": "q", "options": ["a", "b", "c", "d"], "correctAnswer": 0, "explanation": "e"}
        ]}}"#;
        assert!(matches!(
            QuestionBank::from_json(json),
            Err(BankError::MissingDefault(name)) if name == "Missing"
        ));
    }
}
