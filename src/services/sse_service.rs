use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::ServerEvent,
    state::{SharedState, SseHub, match_state::MatchState},
};

/// Name of the SSE event carrying a full match document.
pub const STATE_EVENT: &str = "state";

/// Subscribe to the state stream, returning the current document as the first event.
pub fn subscribe_state(state: &SharedState) -> (Option<ServerEvent>, broadcast::Receiver<ServerEvent>) {
    let receiver = state.sse().subscribe();
    let initial = state_event(&state.store().snapshot());
    (initial, receiver)
}

/// Publish `match_state` to every connected overlay.
pub fn broadcast_state(hub: &SseHub, match_state: &MatchState) {
    if let Some(event) = state_event(match_state) {
        hub.broadcast(event);
    }
}

fn state_event(match_state: &MatchState) -> Option<ServerEvent> {
    match ServerEvent::json(Some(STATE_EVENT.to_string()), match_state) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize match state for SSE");
            None
        }
    }
}

/// Convert a broadcast receiver into an SSE response, forwarding events until
/// the client disconnects or the process shuts down.
pub fn to_sse_stream(
    initial: Option<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if let Some(payload) = initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        // Every event carries the full document, so the next one catches up.
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        info!("state SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
