use async_stream::stream;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use log::*;
use relay::{ChannelDestination, StreamPump};
use service::AppState;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;

/// SSE handler that opens a long-lived stream of relayed messages.
///
/// A pump task takes messages off the relay queue and hands each framed event
/// to the response body through a one-slot channel. When the client goes
/// away the body is dropped, which cancels the session and stops the pump
/// before it takes anything else.
pub(crate) async fn sse_handler(State(app_state): State<AppState>) -> impl IntoResponse {
    let (tx, mut rx) = mpsc::channel::<String>(1);

    let session = app_state.sessions.open(ChannelDestination::new(tx));
    let session_id = session.id().clone();
    let disconnect_guard = session.cancellation_token().drop_guard();

    debug!("Establishing SSE connection {session_id}");

    let pump = StreamPump::new(Arc::clone(app_state.relay_queue_ref()), session);
    let sessions = Arc::clone(&app_state.sessions);
    tokio::spawn(async move {
        let summary = pump.run().await;
        sessions.close(&summary.session_id);
    });

    // Frames arrive from the pump; the stream holds the guard so dropping it cancels the session
    let stream = stream! {
        let _disconnect_guard = disconnect_guard;

        while let Some(frame) = rx.recv().await {
            yield Ok::<_, Infallible>(frame);
        }

        debug!("SSE connection {session_id} ended by the server");
    };

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
            (CONNECTION, "keep-alive"),
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Body::from_stream(stream),
    )
}
