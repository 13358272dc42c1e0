use chrono::Utc;

use seeyc_learn::{
    auth::IdentityStore,
    errors::AppError,
    models::domain::{
        Course, CourseLevel, CourseModule, Enrollment, EnrollmentStatus, Lesson, LessonType,
        Question, QuestionType, Quiz, QuizAttempt, Role, User,
    },
    repositories::{
        memory::{
            InMemoryCourseRepository, InMemoryEnrollmentRepository, InMemoryQuizAttemptRepository,
            InMemoryQuizRepository, InMemoryUserRepository,
        },
        CourseRepository, EnrollmentRepository, QuizAttemptRepository, QuizRepository,
        UserRepository,
    },
};

fn make_course(id: &str, lesson_ids: &[&str]) -> Course {
    Course {
        id: id.to_string(),
        title: format!("Course {}", id),
        category: "engineering".to_string(),
        level: CourseLevel::Intermediate,
        modules: vec![CourseModule {
            order: 1,
            title: "Basics".to_string(),
            lessons: lesson_ids
                .iter()
                .map(|l| Lesson {
                    id: l.to_string(),
                    title: format!("Lesson {}", l),
                    lesson_type: LessonType::Text,
                    duration_minutes: 5,
                    preview: false,
                })
                .collect(),
        }],
        created_at: Some(Utc::now()),
        modified_at: None,
    }
}

fn make_quiz(id: &str, course_id: Option<&str>) -> Quiz {
    let mut quiz = Quiz::new(
        &format!("Quiz {}", id),
        "instructor-1",
        vec![Question {
            id: "q1".to_string(),
            prompt: "2 + 2?".to_string(),
            question_type: QuestionType::MultipleChoice,
            options: vec!["3".to_string(), "4".to_string()],
            correct_answers: vec!["4".to_string()],
            points: 1,
            difficulty: Default::default(),
        }],
        50,
    );
    quiz.id = id.to_string();
    quiz.course_id = course_id.map(str::to_string);
    quiz
}

fn make_attempt(id: &str, learner_id: &str, quiz_id: &str, ordinal: u32) -> QuizAttempt {
    QuizAttempt {
        id: id.to_string(),
        learner_id: learner_id.to_string(),
        quiz_id: quiz_id.to_string(),
        ordinal,
        answers: vec![],
        results: vec![],
        points_awarded: 0,
        points_possible: 1,
        score: 0.0,
        passed: false,
        timed_out: false,
        started_at: None,
        submitted_at: Utc::now(),
    }
}

#[tokio::test]
async fn user_repository_enforces_unique_email_and_updates_roles() {
    let repo = InMemoryUserRepository::new();

    let alice = User::new("Alice", "alice@example.com", Role::Learner, "hash-a");
    repo.create(alice.clone()).await.expect("create alice");

    let duplicate = repo
        .create(User::new("Other", "alice@example.com", Role::Learner, "hash-b"))
        .await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let by_email = repo
        .find_by_email("  ALICE@example.com")
        .await
        .expect("lookup should work");
    assert_eq!(by_email.map(|u| u.id), Some(alice.id.clone()));

    let promoted = repo
        .update_role(&alice.id, Role::Instructor)
        .await
        .expect("role update should work");
    assert_eq!(promoted.role, Role::Instructor);

    let found = repo.find_by_id(&alice.id).await.expect("find should work");
    assert_eq!(found.map(|u| u.role), Some(Role::Instructor));

    let missing = repo.update_role("nobody", Role::Admin).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn course_repository_create_update_and_error_paths() {
    let repo = InMemoryCourseRepository::new();

    let course = make_course("c1", &["l1", "l2"]);
    repo.create(course.clone()).await.expect("create course");

    let duplicate = repo.create(course.clone()).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    let mut renamed = course.clone();
    renamed.title = "Renamed".to_string();
    repo.update(renamed).await.expect("update should work");

    let found = repo
        .find_by_id("c1")
        .await
        .expect("find should work")
        .expect("course should exist");
    assert_eq!(found.title, "Renamed");

    let missing = repo.update(make_course("c-missing", &[])).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn enrollment_repository_is_unique_per_pair_and_versioned() {
    let repo = InMemoryEnrollmentRepository::new();

    let enrollment = Enrollment::new("learner-1", "c1");
    let stored = repo.insert(enrollment.clone()).await.expect("insert");
    assert_eq!(stored.version, 0);

    let duplicate = repo.insert(Enrollment::new("learner-1", "c1")).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let mut updated = stored.clone();
    updated.record_lesson("l1");
    let saved = repo.replace(updated.clone(), 0).await.expect("replace");
    assert_eq!(saved.version, 1);

    // A writer still holding version 0 loses.
    let stale = repo.replace(updated, 0).await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));

    let found = repo
        .find("learner-1", "c1")
        .await
        .expect("find")
        .expect("enrollment should exist");
    assert!(found.completed_lesson_ids.contains("l1"));
    assert_eq!(found.version, 1);

    let absent = repo.replace(Enrollment::new("learner-2", "c1"), 0).await;
    assert!(matches!(absent, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn enrollment_repository_listing_and_delete() {
    let repo = InMemoryEnrollmentRepository::new();

    repo.insert(Enrollment::new("learner-1", "c1")).await.unwrap();
    repo.insert(Enrollment::new("learner-1", "c2")).await.unwrap();
    repo.insert(Enrollment::new("learner-2", "c1")).await.unwrap();

    let mut dropped = repo.find("learner-2", "c1").await.unwrap().unwrap();
    dropped.status = EnrollmentStatus::Dropped;
    repo.replace(dropped, 0).await.unwrap();

    let for_learner = repo.list_by_learner("learner-1").await.unwrap();
    assert_eq!(for_learner.len(), 2);

    let active = repo.list_active_by_course("c1").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].learner_id, "learner-1");

    assert!(repo.delete("learner-1", "c2").await.unwrap());
    assert!(!repo.delete("learner-1", "c2").await.unwrap());
    assert!(repo.find("learner-1", "c2").await.unwrap().is_none());
}

#[tokio::test]
async fn quiz_repository_lookup_by_id_and_course() {
    let repo = InMemoryQuizRepository::new();

    repo.create(make_quiz("quiz-1", Some("c1"))).await.unwrap();
    repo.create(make_quiz("quiz-2", Some("c1"))).await.unwrap();
    repo.create(make_quiz("quiz-3", None)).await.unwrap();

    let duplicate = repo.create(make_quiz("quiz-1", None)).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    assert!(repo.find_by_id("quiz-3").await.unwrap().is_some());
    assert!(repo.find_by_id("quiz-missing").await.unwrap().is_none());

    let for_course = repo.find_by_course("c1").await.unwrap();
    assert_eq!(for_course.len(), 2);
}

#[tokio::test]
async fn quiz_attempt_repository_is_append_only_per_ordinal() {
    let repo = InMemoryQuizAttemptRepository::new();

    repo.append(make_attempt("a-2", "learner-1", "quiz-1", 2)).await.unwrap();
    repo.append(make_attempt("a-1", "learner-1", "quiz-1", 1)).await.unwrap();
    repo.append(make_attempt("b-1", "learner-1", "quiz-2", 1)).await.unwrap();

    let reused_ordinal = repo
        .append(make_attempt("a-dup", "learner-1", "quiz-1", 2))
        .await;
    assert!(matches!(reused_ordinal, Err(AppError::Conflict(_))));

    assert_eq!(repo.count("learner-1", "quiz-1").await.unwrap(), 2);
    assert_eq!(repo.count("learner-1", "quiz-2").await.unwrap(), 1);
    assert_eq!(repo.count("learner-2", "quiz-1").await.unwrap(), 0);

    let ordinals: Vec<u32> = repo
        .list("learner-1", "quiz-1")
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.ordinal)
        .collect();
    assert_eq!(ordinals, vec![1, 2]);

    let found = repo.find_by_id("b-1").await.unwrap();
    assert_eq!(found.map(|a| a.quiz_id), Some("quiz-2".to_string()));
}
