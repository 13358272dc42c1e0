use async_graphql::{Context, ErrorExtensions, Object, Result, ID};

use crate::{
    app_state::AppState,
    auth::{extract_claims_from_context, require_self_or_admin},
    models::{
        domain::Course,
        dto::response::{EnrollmentProgress, PrincipalDto, QuizAttemptSummary, QuizForTaking},
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn me(&self, ctx: &Context<'_>) -> Result<PrincipalDto> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx).map_err(|e| e.extend())?;

        let user = state
            .user_service
            .get_user(&claims.sub)
            .await
            .map_err(|e| e.extend())?;
        Ok(user.into())
    }

    async fn course(&self, ctx: &Context<'_>, id: ID) -> Result<Course> {
        let state = ctx.data::<AppState>()?;

        state
            .course_service
            .get_course(&id)
            .await
            .map_err(|e| e.extend())
    }

    /// Defaults to the caller's own enrollments.
    async fn enrollments(
        &self,
        ctx: &Context<'_>,
        learner_id: Option<String>,
    ) -> Result<Vec<EnrollmentProgress>> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx).map_err(|e| e.extend())?;

        let learner_id = learner_id.unwrap_or_else(|| claims.sub.clone());
        require_self_or_admin(&claims, &learner_id).map_err(|e| e.extend())?;

        state
            .enrollment_service
            .list_for_learner(&learner_id)
            .await
            .map_err(|e| e.extend())
    }

    async fn quiz_for_taking(&self, ctx: &Context<'_>, id: ID) -> Result<QuizForTaking> {
        let state = ctx.data::<AppState>()?;
        extract_claims_from_context(ctx).map_err(|e| e.extend())?;

        state
            .quiz_service
            .quiz_for_taking(&id)
            .await
            .map_err(|e| e.extend())
    }

    async fn quiz_attempts(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
        learner_id: Option<String>,
    ) -> Result<Vec<QuizAttemptSummary>> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx).map_err(|e| e.extend())?;

        let learner_id = learner_id.unwrap_or_else(|| claims.sub.clone());
        require_self_or_admin(&claims, &learner_id).map_err(|e| e.extend())?;

        let attempts = state
            .quiz_attempt_service
            .list_attempts(&learner_id, &quiz_id)
            .await
            .map_err(|e| e.extend())?;
        Ok(attempts.into_iter().map(QuizAttemptSummary::from).collect())
    }
}
