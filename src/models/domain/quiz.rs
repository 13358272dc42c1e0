use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

pub const MAX_QUESTION_POINTS: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice, // exactly one correct option
    MultipleSelect, // the exact set of correct options
    TrueFalse,      // one of "true" / "false"
    ShortAnswer,    // free text against accepted answers
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answers: Vec<String>,
    pub points: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    pub questions: Vec<Question>,
    pub time_limit_seconds: Option<u32>,
    pub passing_score: u8, // percentage, 0-100
    pub max_attempts: Option<u32>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn new(title: &str, created_by: &str, questions: Vec<Question>, passing_score: u8) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            course_id: None,
            lesson_id: None,
            questions,
            time_limit_seconds: None,
            passing_score,
            max_attempts: None,
            created_by: created_by.to_string(),
            created_at: Some(Utc::now()),
        }
    }

    /// `None` when the weights do not fit in a `u32`.
    pub fn total_points(&self) -> Option<u32> {
        self.questions
            .iter()
            .try_fold(0u32, |total, q| total.checked_add(q.points))
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Rejects answer keys the scoring rules cannot evaluate.
    pub fn validate_answer_key(&self) -> AppResult<()> {
        if self.passing_score > 100 {
            return Err(AppError::ValidationError(
                "Passing score must be between 0 and 100".to_string(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(AppError::ValidationError(
                "Maximum attempts must be at least 1 when set".to_string(),
            ));
        }

        let mut ids = std::collections::HashSet::new();
        for question in &self.questions {
            if !ids.insert(question.id.as_str()) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate question id '{}'",
                    question.id
                )));
            }
            question.validate_answer_key()?;
        }
        if self.total_points().is_none() {
            return Err(AppError::ValidationError(
                "Question points add up to more than can be scored".to_string(),
            ));
        }
        Ok(())
    }
}

impl Question {
    fn validate_answer_key(&self) -> AppResult<()> {
        let invalid = |reason: &str| {
            Err(AppError::ValidationError(format!(
                "Question '{}': {}",
                self.id, reason
            )))
        };

        if self.points > MAX_QUESTION_POINTS {
            return invalid(&format!("points must be at most {}", MAX_QUESTION_POINTS));
        }

        match self.question_type {
            QuestionType::MultipleChoice => {
                if self.correct_answers.len() != 1 {
                    return invalid("multiple-choice needs exactly one correct answer");
                }
                if !self.options.contains(&self.correct_answers[0]) {
                    return invalid("correct answer is not one of the options");
                }
            }
            QuestionType::MultipleSelect => {
                if self.correct_answers.is_empty() {
                    return invalid("multiple-select needs at least one correct answer");
                }
                if self
                    .correct_answers
                    .iter()
                    .any(|answer| !self.options.contains(answer))
                {
                    return invalid("correct answer is not one of the options");
                }
            }
            QuestionType::TrueFalse => {
                let valid = self.correct_answers.len() == 1
                    && matches!(
                        self.correct_answers[0].trim().to_lowercase().as_str(),
                        "true" | "false"
                    );
                if !valid {
                    return invalid("true-false needs a single 'true' or 'false' answer");
                }
            }
            QuestionType::ShortAnswer => {
                if self.correct_answers.iter().all(|a| a.trim().is_empty()) {
                    return invalid("short-answer needs at least one accepted answer");
                }
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn question_type_uses_kebab_case() {
        let json = serde_json::to_string(&QuestionType::MultipleSelect).unwrap();
        assert_eq!(json, "\"multiple-select\"");

        let parsed: QuestionType = serde_json::from_str("\"short-answer\"").unwrap();
        assert_eq!(parsed, QuestionType::ShortAnswer);
    }

    #[test]
    fn question_type_rejects_unknown_variant() {
        assert!(serde_json::from_str::<QuestionType>("\"essay\"").is_err());
    }

    #[test]
    fn total_points_sums_questions() {
        assert_eq!(mixed_quiz("q1").total_points(), Some(5));
    }

    #[test]
    fn oversized_question_weight_is_rejected() {
        let mut quiz = mixed_quiz("q1");
        quiz.questions[0].points = u32::MAX;
        assert!(matches!(
            quiz.validate_answer_key(),
            Err(AppError::ValidationError(_))
        ));

        quiz.questions[0].points = MAX_QUESTION_POINTS;
        assert!(quiz.validate_answer_key().is_ok());
    }

    #[test]
    fn total_points_reports_overflow() {
        let mut quiz = mixed_quiz("q1");
        quiz.questions[0].points = u32::MAX;
        assert_eq!(quiz.total_points(), None);
    }

    #[test]
    fn valid_answer_key_passes() {
        assert!(mixed_quiz("q1").validate_answer_key().is_ok());
    }

    #[test]
    fn multiple_choice_with_two_answers_is_rejected() {
        let mut quiz = mixed_quiz("q1");
        quiz.questions[0].correct_answers = vec!["A".to_string(), "B".to_string()];
        assert!(quiz.validate_answer_key().is_err());
    }

    #[test]
    fn correct_answer_outside_options_is_rejected() {
        let mut quiz = mixed_quiz("q1");
        quiz.questions[1].correct_answers.push("Z".to_string());
        assert!(quiz.validate_answer_key().is_err());
    }

    #[test]
    fn true_false_needs_boolean_answer() {
        let mut quiz = mixed_quiz("q1");
        quiz.questions[2].correct_answers = vec!["maybe".to_string()];
        assert!(quiz.validate_answer_key().is_err());
    }

    #[test]
    fn duplicate_question_ids_are_rejected() {
        let mut quiz = mixed_quiz("q1");
        quiz.questions[1].id = "mc".to_string();
        assert!(quiz.validate_answer_key().is_err());
    }

    #[test]
    fn zero_attempt_cap_is_rejected() {
        let mut quiz = mixed_quiz("q1");
        quiz.max_attempts = Some(0);
        assert!(quiz.validate_answer_key().is_err());
    }
}
