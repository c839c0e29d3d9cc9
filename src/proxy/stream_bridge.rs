//! Stream bridge: byte-exact passthrough of a streaming upstream response.
//!
//! A producer task reads the upstream body and pushes each chunk into a
//! bounded channel; the client-facing [`Body`] drains that channel. When the
//! channel is full the producer stops reading, so a slow client applies
//! backpressure all the way to the upstream socket.
//!
//! The producer exits, dropping the upstream response and closing its
//! connection, when
//! - the upstream finishes,
//! - the upstream fails, or
//! - the client goes away (the receiver is dropped).
//!
//! A failure after the first chunk cannot become an error response because
//! status and headers are already on the wire. The body is terminated with
//! an error instead, which aborts the chunked transfer so the client sees a
//! truncated response rather than a clean end of stream.

use std::io;

use axum::body::Body;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub fn relay(upstream_resp: reqwest::Response, capacity: usize) -> Body {
    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(capacity.max(1));

    tokio::spawn(async move {
        let mut byte_stream = upstream_resp.bytes_stream();
        let mut relayed: usize = 0;

        loop {
            let next = tokio::select! {
                biased;
                _ = tx.closed() => {
                    tracing::debug!(bytes_relayed = relayed, "client disconnected; closing upstream stream");
                    break;
                }
                next = byte_stream.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    relayed += bytes.len();
                    if tx.send(Ok(bytes)).await.is_err() {
                        tracing::debug!(bytes_relayed = relayed, "client disconnected; closing upstream stream");
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        bytes_relayed = relayed,
                        "upstream stream interrupted after response was committed; client receives a truncated body: {}",
                        e
                    );
                    let _ = tx
                        .send(Err(io::Error::new(io::ErrorKind::BrokenPipe, e.to_string())))
                        .await;
                    break;
                }
                None => {
                    tracing::debug!(bytes_relayed = relayed, "upstream stream complete");
                    break;
                }
            }
        }
    });

    Body::from_stream(ReceiverStream::new(rx))
}
