//! Server-Sent Events stream
//!
//! Pushes reader events (state changes, verse boundaries, errors) to the
//! browser UI. Slow consumers that lag the broadcast channel simply miss
//! events; the UI re-reads the state endpoint on reconnect.

use crate::api::server::AppContext;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use futures::StreamExt;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;

pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = ctx.state.subscribe_events();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = match serde_json::to_string(&event) {
                    Ok(data) => data,
                    Err(e) => {
                        tracing::error!("failed to serialize event: {}", e);
                        return None;
                    }
                };
                Some(Ok(Event::default().event(event.event_type()).data(data)))
            }
            Err(e) => {
                tracing::debug!("SSE subscriber lagged: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
