// Live event stream route (NDJSON)
// Decision: One JSON event per line; the retained backlog is written first,
//           then live events as they are recorded
// Decision: The listener is removed when the response body is dropped, which
//           is how a client disconnect reaches us

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::stream::{self, StreamExt};
use tokio_stream::wrappers::ReceiverStream;

use alarmrelay_core::{Event, ListenerId, Relay};

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

pub fn routes(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/alarm", get(stream_events))
        .with_state(relay)
}

/// Unsubscribes its listener when dropped
struct ListenerGuard {
    relay: Arc<Relay>,
    id: ListenerId,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if self.relay.unsubscribe(self.id) {
            tracing::info!(listener_id = self.id, "Event stream closed");
        }
    }
}

fn encode(event: &Event) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(line)
}

pub async fn stream_events(State(relay): State<Arc<Relay>>) -> Response {
    let subscription = relay.subscribe();
    tracing::info!(
        listener_id = subscription.id,
        backlog = subscription.backlog.len(),
        "Starting event stream"
    );

    let guard = ListenerGuard {
        relay,
        id: subscription.id,
    };
    let events =
        stream::iter(subscription.backlog).chain(ReceiverStream::new(subscription.receiver));

    let body = stream::unfold((events, guard), |(mut events, guard)| async move {
        let event = events.next().await?;
        let chunk = match encode(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode event");
                Vec::new()
            }
        };
        Some((Ok::<_, Infallible>(chunk), (events, guard)))
    });

    (
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}
