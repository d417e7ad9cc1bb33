//! Bot Framework messaging endpoint
//!
//! Receives one activity per request. Replies travel back through the reply
//! channel, so the HTTP response is always an empty 202 once the activity has
//! been dispatched.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use super::ApiState;
use crate::channels::Activity;
use crate::router::RouteOutcome;

/// Handle an incoming Bot Framework activity
pub async fn handle_activity(
    State(state): State<Arc<ApiState>>,
    Json(activity): Json<Activity>,
) -> StatusCode {
    tracing::debug!(
        activity_type = ?activity.activity_type,
        id = ?activity.id,
        channel = ?activity.channel_id,
        "received activity"
    );

    match state.router.route(&activity, state.channel.as_ref()).await {
        Ok(RouteOutcome::Pipeline(report)) => {
            tracing::info!(
                conversation = activity.conversation_id().unwrap_or_default(),
                outcome = ?report.outcome,
                replies = report.replies.len(),
                "turn finished"
            );
        }
        Ok(RouteOutcome::Welcomed) => {}
        Ok(RouteOutcome::Ignored(activity_type)) => {
            tracing::debug!(?activity_type, "activity ignored");
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                conversation = activity.conversation_id().unwrap_or_default(),
                "turn abandoned"
            );
        }
    }

    StatusCode::ACCEPTED
}
