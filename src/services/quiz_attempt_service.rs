use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Question, QuestionResult, QuestionType, Quiz, QuizAttempt, SubmittedAnswer},
        dto::{
            request::SubmitQuizAttemptInput,
            response::{EnrollmentProgress, QuizSubmissionResponse},
        },
    },
    repositories::{QuizAttemptRepository, QuizRepository},
    services::{
        enrollment_service::EnrollmentService,
        key_lock::{pair_key, KeyedLocks},
    },
};

const APPEND_ATTEMPTS: usize = 2;
const START_CLOCK_SKEW_SECONDS: i64 = 30;

/// Outcome of grading a set of answers against a quiz's answer key.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub results: Vec<QuestionResult>,
    pub points_awarded: u32,
    pub points_possible: u32,
    pub score: f64,
    pub passed: bool,
}

impl Grade {
    fn timed_out(mut self) -> Self {
        for result in &mut self.results {
            result.correct = false;
            result.points_awarded = 0;
        }
        self.points_awarded = 0;
        self.score = 0.0;
        self.passed = false;
        self
    }
}

pub struct QuizAttemptService {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    enrollments: Arc<EnrollmentService>,
    locks: KeyedLocks,
}

impl QuizAttemptService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        enrollments: Arc<EnrollmentService>,
    ) -> Self {
        Self {
            quizzes,
            attempts,
            enrollments,
            locks: KeyedLocks::new(),
        }
    }

    /// Scores and records one attempt.
    ///
    /// The attempt cap is checked before anything is graded; a rejected
    /// submission leaves no record. Every accepted submission is appended with
    /// the next ordinal, identical answers included.
    pub async fn submit(&self, input: SubmitQuizAttemptInput) -> AppResult<QuizSubmissionResponse> {
        input.validate()?;

        let quiz = self
            .quizzes
            .find_by_id(&input.quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz '{}' not found", input.quiz_id)))?;

        let learner_id = input.learner_id.clone();
        let started_at = input.started_at;
        check_started_at(&quiz, started_at)?;
        let answers: Vec<SubmittedAnswer> = input.answers.into_iter().map(Into::into).collect();

        let attempt = {
            let _guard = self.locks.lock(pair_key(&learner_id, &quiz.id)).await;
            self.append_scored(&quiz, &learner_id, answers, started_at)
                .await?
        };

        log::info!(
            "Learner {} scored {:.1} on quiz {} (attempt {}, passed: {})",
            attempt.learner_id,
            attempt.score,
            attempt.quiz_id,
            attempt.ordinal,
            attempt.passed
        );

        let lesson_progress = if attempt.passed {
            self.complete_linked_lesson(&quiz, &learner_id).await
        } else {
            None
        };

        Ok(QuizSubmissionResponse::new(&attempt, lesson_progress))
    }

    pub async fn list_attempts(&self, learner_id: &str, quiz_id: &str) -> AppResult<Vec<QuizAttempt>> {
        self.attempts.list(learner_id, quiz_id).await
    }

    async fn append_scored(
        &self,
        quiz: &Quiz,
        learner_id: &str,
        answers: Vec<SubmittedAnswer>,
        started_at: Option<DateTime<Utc>>,
    ) -> AppResult<QuizAttempt> {
        for attempt in 1..=APPEND_ATTEMPTS {
            let prior = self.attempts.count(learner_id, &quiz.id).await?;
            if let Some(max) = quiz.max_attempts {
                if prior >= max {
                    log::info!(
                        "Learner {} hit the attempt limit on quiz {}",
                        learner_id,
                        quiz.id
                    );
                    return Err(AppError::AttemptLimitExceeded(max));
                }
            }

            let submitted_at = Utc::now();
            let timed_out = exceeded_time_limit(quiz, started_at, submitted_at);
            let mut grade = Self::grade_attempt(quiz, &answers)?;
            if timed_out {
                grade = grade.timed_out();
            }

            let record = QuizAttempt {
                id: Uuid::new_v4().to_string(),
                learner_id: learner_id.to_string(),
                quiz_id: quiz.id.clone(),
                ordinal: prior + 1,
                answers: answers.clone(),
                results: grade.results,
                points_awarded: grade.points_awarded,
                points_possible: grade.points_possible,
                score: grade.score,
                passed: grade.passed,
                timed_out,
                started_at,
                submitted_at,
            };

            match self.attempts.append(record).await {
                Ok(stored) => return Ok(stored),
                Err(AppError::Conflict(reason)) => {
                    log::warn!("Append attempt {} lost a race: {}", attempt, reason);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Transient(format!(
            "Attempts on quiz '{}' are busy, try again",
            quiz.id
        )))
    }

    async fn complete_linked_lesson(&self, quiz: &Quiz, learner_id: &str) -> Option<EnrollmentProgress> {
        let (Some(course_id), Some(lesson_id)) = (&quiz.course_id, &quiz.lesson_id) else {
            return None;
        };

        match self
            .enrollments
            .mark_lesson_complete(learner_id, course_id, lesson_id)
            .await
        {
            Ok(enrollment) => Some(EnrollmentProgress::from(enrollment)),
            Err(
                e @ (AppError::NotEnrolled(_)
                | AppError::EnrollmentComplete(_)
                | AppError::UnknownLesson(_)),
            ) => {
                log::debug!("Quiz {} pass left progress unchanged: {}", quiz.id, e);
                None
            }
            Err(e) => {
                log::warn!(
                    "Could not record lesson {} for learner {}: {}",
                    lesson_id,
                    learner_id,
                    e
                );
                None
            }
        }
    }

    /// Grades answers without touching storage.
    ///
    /// Each answer must name a question of the quiz at most once; questions
    /// left unanswered score zero.
    pub fn grade_attempt(quiz: &Quiz, answers: &[SubmittedAnswer]) -> AppResult<Grade> {
        let points_possible = quiz.total_points().ok_or_else(|| {
            AppError::ValidationError(format!(
                "Question points of quiz '{}' add up to more than can be scored",
                quiz.id
            ))
        })?;

        let mut by_question: HashMap<&str, &SubmittedAnswer> = HashMap::new();
        for answer in answers {
            if quiz.question(&answer.question_id).is_none() {
                return Err(AppError::ValidationError(format!(
                    "Question '{}' is not part of quiz '{}'",
                    answer.question_id, quiz.id
                )));
            }
            if by_question.insert(&answer.question_id, answer).is_some() {
                return Err(AppError::ValidationError(format!(
                    "Question '{}' was answered more than once",
                    answer.question_id
                )));
            }
        }

        let results: Vec<QuestionResult> = quiz
            .questions
            .iter()
            .map(|question| {
                let correct = by_question
                    .get(question.id.as_str())
                    .is_some_and(|answer| Self::grade_question(question, &answer.values));
                QuestionResult {
                    question_id: question.id.clone(),
                    correct,
                    points_awarded: if correct { question.points } else { 0 },
                    points_possible: question.points,
                }
            })
            .collect();

        // Bounded by `points_possible`, which fit.
        let points_awarded: u32 = results.iter().map(|r| r.points_awarded).sum();

        let (score, passed) = if points_possible == 0 {
            (0.0, false)
        } else {
            let score = f64::from(points_awarded) * 100.0 / f64::from(points_possible);
            let passed = u64::from(points_awarded) * 100
                >= u64::from(quiz.passing_score) * u64::from(points_possible);
            (score, passed)
        };

        Ok(Grade {
            results,
            points_awarded,
            points_possible,
            score,
            passed,
        })
    }

    /// All-or-nothing comparison by question type.
    fn grade_question(question: &Question, values: &[String]) -> bool {
        let submitted: Vec<&str> = values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();

        match question.question_type {
            QuestionType::MultipleChoice => match (submitted.as_slice(), question.correct_answers.first()) {
                ([only], Some(key)) => *only == key.trim(),
                _ => false,
            },
            QuestionType::MultipleSelect => {
                let chosen: BTreeSet<&str> = submitted.iter().copied().collect();
                let key: BTreeSet<&str> =
                    question.correct_answers.iter().map(|a| a.trim()).collect();
                !key.is_empty() && chosen.len() == submitted.len() && chosen == key
            }
            QuestionType::TrueFalse => match (submitted.as_slice(), question.correct_answers.first()) {
                ([only], Some(key)) => only.eq_ignore_ascii_case(key.trim()),
                _ => false,
            },
            QuestionType::ShortAnswer => match submitted.as_slice() {
                [only] => {
                    let given = only.to_lowercase();
                    question
                        .correct_answers
                        .iter()
                        .any(|accepted| accepted.trim().to_lowercase() == given)
                }
                _ => false,
            },
        }
    }
}

/// A timed quiz needs a start time that is not in the future.
fn check_started_at(quiz: &Quiz, started_at: Option<DateTime<Utc>>) -> AppResult<()> {
    if quiz.time_limit_seconds.is_none() {
        return Ok(());
    }
    match started_at {
        None => Err(AppError::ValidationError(format!(
            "Quiz '{}' is timed and requires started_at",
            quiz.id
        ))),
        Some(started) if started > Utc::now() + Duration::seconds(START_CLOCK_SKEW_SECONDS) => {
            Err(AppError::ValidationError(
                "started_at cannot be in the future".to_string(),
            ))
        }
        Some(_) => Ok(()),
    }
}

fn exceeded_time_limit(quiz: &Quiz, started_at: Option<DateTime<Utc>>, submitted_at: DateTime<Utc>) -> bool {
    match (quiz.time_limit_seconds, started_at) {
        (Some(limit), Some(started)) => {
            submitted_at - started > Duration::seconds(i64::from(limit))
        }
        _ => false,
    }
}
