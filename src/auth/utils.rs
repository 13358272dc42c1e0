use async_graphql::Context;

use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
    models::domain::user::Role,
};

pub fn require_admin(claims: &Claims) -> AppResult<()> {
    if claims.role != Role::Admin {
        return Err(AppError::Forbidden(
            "Only admins can perform this action".to_string(),
        ));
    }
    Ok(())
}

/// Instructors and admins manage course and quiz content.
pub fn require_staff(claims: &Claims) -> AppResult<()> {
    if !claims.role.is_staff() {
        return Err(AppError::Forbidden(
            "Only instructors and admins can manage content".to_string(),
        ));
    }
    Ok(())
}

pub fn require_self_or_admin(claims: &Claims, learner_id: &str) -> AppResult<()> {
    if claims.role != Role::Admin && claims.sub != learner_id {
        return Err(AppError::Forbidden(
            "You can only act on your own records".to_string(),
        ));
    }
    Ok(())
}

pub fn extract_claims_from_context(ctx: &Context<'_>) -> AppResult<Claims> {
    ctx.data::<Claims>()
        .cloned()
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))
}
