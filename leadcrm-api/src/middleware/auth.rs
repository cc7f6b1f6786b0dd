/// Bearer authentication and role gates
///
/// [`require_actor`] validates the access token, then loads the caller's
/// role, organization and agent record from the database. The resulting
/// [`Actor`] is inserted into the request extensions; handlers take
/// `Extension<Actor>` and pass it explicitly to the scope resolver.
///
/// Role gates run as route layers, so a caller without the required role is
/// rejected before the request body or path is parsed.
///
/// A token whose user has been deleted is rejected with 401.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use leadcrm_shared::auth::{authorization::Actor, middleware::authenticate};

/// Authenticates the request and resolves its [`Actor`]
///
/// Accounts without a role are refused here: no scoped endpoint admits them.
pub async fn require_actor(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;
    let actor = Actor::resolve(&state.db, auth.user_id).await?;

    tracing::debug!(user_id = %auth.user_id, ?actor, "Resolved actor");

    actor.organization_id()?;

    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

/// Admits organizers only; layered under [`require_actor`]
pub async fn require_organizer(
    Extension(actor): Extension<Actor>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    actor.require_organizer()?;

    Ok(next.run(req).await)
}
