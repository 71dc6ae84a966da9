pub mod ai_helper;
pub mod bank;
pub mod provider;
pub mod validator;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use validator::ValidationError;

/// Every question carries exactly this many options.
pub const OPTION_COUNT: usize = 4;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Lenient parse for labels coming from the outside: anything unknown is
    /// treated as medium.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty {0:?}, expected easy, medium or hard")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

/// A validated multiple-choice question. Only the validator can build one, so
/// every instance has trimmed, non-empty text and four distinct options.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Question {
    #[serde(rename = "question")]
    text: String,
    options: [String; OPTION_COUNT],
    #[serde(rename = "correctAnswer")]
    correct_index: usize,
    explanation: String,
}

impl Question {
    /// Builds a question from plain parts, applying the same rules as a
    /// candidate received from the generator.
    pub fn new(
        text: &str,
        options: [&str; OPTION_COUNT],
        correct_index: usize,
        explanation: &str,
    ) -> Result<Self, ValidationError> {
        validator::validate(&serde_json::json!({
            "question": text,
            "options": options,
            "correctAnswer": correct_index,
            "explanation": explanation,
        }))
    }

    pub(crate) fn from_parts(
        text: String,
        options: [String; OPTION_COUNT],
        correct_index: usize,
        explanation: String,
    ) -> Self {
        Self {
            text,
            options,
            correct_index,
            explanation,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("question {index} has already been answered")]
    AlreadyAnswered { index: usize },
    #[error("question {index} has not been answered yet")]
    NotAnswered { index: usize },
    #[error("option {option} does not exist, questions have {OPTION_COUNT} options")]
    OptionOutOfRange { option: usize },
    #[error("the session has no questions left")]
    Finished,
}

/// What the user sees right after answering the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback<'a> {
    pub chosen: usize,
    pub correct_index: usize,
    pub is_correct: bool,
    pub explanation: &'a str,
}

/// One line of the end-of-quiz review.
#[derive(Debug, Clone, Copy)]
pub struct Review<'a> {
    pub question: &'a Question,
    pub chosen: Option<usize>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Performance {
    Excellent,
    Good,
    Fair,
    NeedsPractice,
}

impl Performance {
    pub fn message(&self) -> &'static str {
        match self {
            Performance::Excellent => "Excellent work, you have mastered this topic!",
            Performance::Good => "Good job, a little more practice and you will master it.",
            Performance::Fair => "Not bad, review the explanations and try again.",
            Performance::NeedsPractice => "Keep practicing, every attempt makes you better.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
}

impl QuizResult {
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.score * 100) as f64 / self.total as f64).round() as u32
    }

    pub fn performance(&self) -> Performance {
        match self.percentage() {
            p if p >= 80 => Performance::Excellent,
            p if p >= 60 => Performance::Good,
            p if p >= 40 => Performance::Fair,
            _ => Performance::NeedsPractice,
        }
    }
}

/// One run through a fixed, ordered list of questions.
#[derive(Debug, Clone)]
pub struct QuizSession {
    subject: String,
    difficulty: Difficulty,
    questions: Vec<Question>,
    current_index: usize,
    answers: BTreeMap<usize, usize>,
}

impl QuizSession {
    pub fn new(subject: impl Into<String>, difficulty: Difficulty, questions: Vec<Question>) -> Self {
        Self {
            subject: subject.into(),
            difficulty,
            questions,
            current_index: 0,
            answers: BTreeMap::new(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn answer_for(&self, index: usize) -> Option<usize> {
        self.answers.get(&index).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn is_current_answered(&self) -> bool {
        self.answers.contains_key(&self.current_index)
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    /// Records the answer for the current question. A question can only be
    /// answered once.
    pub fn answer(&mut self, option: usize) -> Result<Feedback<'_>, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        if self.is_current_answered() {
            return Err(SessionError::AlreadyAnswered {
                index: self.current_index,
            });
        }
        if option >= OPTION_COUNT {
            return Err(SessionError::OptionOutOfRange { option });
        }

        self.answers.insert(self.current_index, option);
        self.feedback().ok_or(SessionError::Finished)
    }

    /// Feedback for the current question, once it has been answered.
    pub fn feedback(&self) -> Option<Feedback<'_>> {
        let question = self.current_question()?;
        let chosen = self.answer_for(self.current_index)?;
        Some(Feedback {
            chosen,
            correct_index: question.correct_index(),
            is_correct: question.is_correct(chosen),
            explanation: question.explanation(),
        })
    }

    /// Moves past the current, answered question. After the last question the
    /// session is finished.
    pub fn advance(&mut self) -> Result<(), SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        if !self.is_current_answered() {
            return Err(SessionError::NotAnswered {
                index: self.current_index,
            });
        }

        self.current_index += 1;
        Ok(())
    }

    pub fn score(&self) -> usize {
        self.questions
            .iter()
            .enumerate()
            .filter(|(i, q)| self.answer_for(*i).is_some_and(|a| q.is_correct(a)))
            .count()
    }

    pub fn result(&self) -> QuizResult {
        QuizResult {
            score: self.score(),
            total: self.total(),
        }
    }

    pub fn review(&self) -> impl Iterator<Item = Review<'_>> + '_ {
        self.questions.iter().enumerate().map(|(i, question)| {
            let chosen = self.answer_for(i);
            Review {
                question,
                chosen,
                is_correct: chosen.is_some_and(|a| question.is_correct(a)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: usize) -> Question {
        Question::new(
            "Which structure is LIFO?",
            ["Queue", "Stack", "Heap", "Tree"],
            correct,
            "A stack pops the most recently pushed element first.",
        )
        .unwrap()
    }

    fn session(n: usize) -> QuizSession {
        QuizSession::new("Data Structures", Difficulty::Easy, (0..n).map(|_| question(1)).collect())
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(" easy ".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert!("extreme".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::from_label("extreme"), Difficulty::Medium);
    }

    #[test]
    fn second_answer_is_rejected_and_keeps_the_first() {
        let mut s = session(2);
        let feedback = s.answer(0).unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.correct_index, 1);

        assert_eq!(s.answer(1), Err(SessionError::AlreadyAnswered { index: 0 }));
        assert_eq!(s.answer_for(0), Some(0));
        assert_eq!(s.answered_count(), 1);
    }

    #[test]
    fn advance_requires_an_answer() {
        let mut s = session(2);
        assert_eq!(s.advance(), Err(SessionError::NotAnswered { index: 0 }));
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn option_out_of_range_is_not_recorded() {
        let mut s = session(1);
        assert_eq!(s.answer(4), Err(SessionError::OptionOutOfRange { option: 4 }));
        assert!(!s.is_current_answered());
    }

    #[test]
    fn score_counts_only_correct_answers() {
        let mut s = session(3);
        for option in [1, 2, 1] {
            s.answer(option).unwrap();
            s.advance().unwrap();
        }
        assert!(s.is_finished());
        assert_eq!(s.result(), QuizResult { score: 2, total: 3 });
        assert_eq!(s.advance(), Err(SessionError::Finished));

        let review: Vec<_> = s.review().map(|r| r.is_correct).collect();
        assert_eq!(review, vec![true, false, true]);
    }

    #[test]
    fn unanswered_questions_count_as_incorrect() {
        let s = session(2);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn performance_bands() {
        let band = |score| QuizResult { score, total: 5 }.performance();
        assert_eq!(band(5), Performance::Excellent);
        assert_eq!(band(4), Performance::Excellent);
        assert_eq!(band(3), Performance::Good);
        assert_eq!(band(2), Performance::Fair);
        assert_eq!(band(1), Performance::NeedsPractice);
        assert_eq!(QuizResult { score: 0, total: 0 }.percentage(), 0);
    }
}
