// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented event ingestion

use serde_json::{json, Value};
use sift_core::{Clock, Event};
use sift_engine::{Bus, BusError};
use sift_pattern::sql::timestamp;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Turn one input line into an event tagged with `topic`
///
/// Lines that are not JSON are wrapped as `{"raw": line}`.
pub fn normalize<C: Clock>(line: &str, topic: &str, clock: &C) -> Event {
    let payload = serde_json::from_str::<Value>(line).unwrap_or_else(|_| json!({ "raw": line }));
    Event::new(payload)
        .with_kind(topic)
        .with_id(timestamp(clock.now()))
}

/// Publish every non-empty line of `reader` until EOF
///
/// Returns the number of events published. A read error ends ingestion
/// like EOF does.
pub async fn ingest<R, C>(
    bus: Bus,
    cancel: CancellationToken,
    reader: R,
    topic: String,
    clock: C,
) -> Result<usize, BusError>
where
    R: AsyncBufRead + Unpin,
    C: Clock,
{
    let mut lines = reader.lines();
    let mut published = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BusError::Canceled),
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "ingest read failed");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = normalize(line, &topic, &clock);
        debug!(id = ?event.id, "ingested");
        bus.publish(&cancel, vec![event]).await?;
        published += 1;
    }

    info!(topic = %topic, events = published, "ingest reached end of input");
    Ok(published)
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
