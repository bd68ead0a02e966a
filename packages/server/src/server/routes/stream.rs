//! SSE streaming endpoint.
//!
//! GET /events
//!
//! Streams every published session snapshot as a `session` event, starting
//! with the current one. Intermediate snapshots may be skipped under load;
//! the latest one is always delivered.

use std::convert::Infallible;

use axum::{
    extract::Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, StreamExt};
use tokio_stream::wrappers::WatchStream;

use crate::server::app::AppState;

pub async fn events_handler(
    Extension(state): Extension<AppState>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.session.subscribe();

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    let snapshots = WatchStream::new(rx).filter_map(|snapshot| async move {
        Event::default()
            .event("session")
            .json_data(&snapshot)
            .ok()
            .map(Ok)
    });

    Sse::new(connected.chain(snapshots)).keep_alive(KeepAlive::default())
}
