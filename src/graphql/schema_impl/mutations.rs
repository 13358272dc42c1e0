use async_graphql::{Context, ErrorExtensions, Object, Result, ID};

use crate::{
    app_state::AppState,
    auth::{extract_claims_from_context, require_self_or_admin},
    models::dto::{
        request::SubmitQuizAttemptInput,
        response::{EnrollmentProgress, QuizSubmissionResponse},
    },
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn enroll(
        &self,
        ctx: &Context<'_>,
        course_id: ID,
        learner_id: Option<String>,
    ) -> Result<EnrollmentProgress> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx).map_err(|e| e.extend())?;

        let learner_id = learner_id.unwrap_or_else(|| claims.sub.clone());
        require_self_or_admin(&claims, &learner_id).map_err(|e| e.extend())?;

        let enrollment = state
            .enrollment_service
            .enroll(&learner_id, &course_id)
            .await
            .map_err(|e| e.extend())?;
        Ok(enrollment.into())
    }

    async fn complete_lesson(
        &self,
        ctx: &Context<'_>,
        course_id: ID,
        lesson_id: String,
        learner_id: Option<String>,
    ) -> Result<EnrollmentProgress> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx).map_err(|e| e.extend())?;

        let learner_id = learner_id.unwrap_or_else(|| claims.sub.clone());
        require_self_or_admin(&claims, &learner_id).map_err(|e| e.extend())?;

        let enrollment = state
            .enrollment_service
            .mark_lesson_complete(&learner_id, &course_id, &lesson_id)
            .await
            .map_err(|e| e.extend())?;
        Ok(enrollment.into())
    }

    async fn drop_course(
        &self,
        ctx: &Context<'_>,
        course_id: ID,
        learner_id: Option<String>,
    ) -> Result<EnrollmentProgress> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx).map_err(|e| e.extend())?;

        let learner_id = learner_id.unwrap_or_else(|| claims.sub.clone());
        require_self_or_admin(&claims, &learner_id).map_err(|e| e.extend())?;

        let enrollment = state
            .enrollment_service
            .drop_course(&learner_id, &course_id)
            .await
            .map_err(|e| e.extend())?;
        Ok(enrollment.into())
    }

    async fn submit_quiz_attempt(
        &self,
        ctx: &Context<'_>,
        input: SubmitQuizAttemptInput,
    ) -> Result<QuizSubmissionResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx).map_err(|e| e.extend())?;

        require_self_or_admin(&claims, &input.learner_id).map_err(|e| e.extend())?;

        state
            .quiz_attempt_service
            .submit(input)
            .await
            .map_err(|e| e.extend())
    }
}
