use futures::{Stream, StreamExt};
use relay_monitor_types::{Coordinate, Root, Slot};
use serde::Deserialize;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::api::BeaconApi;
use crate::{ConsensusError, Result};

/// Event topic announcing a new canonical head.
pub const HEAD_TOPIC: &str = "head";

#[derive(Debug, Deserialize)]
struct HeadEvent {
    slot: String,
    block: Root,
}

/// Decode the `data` of a `head` event.
pub fn decode_head_event(data: &str) -> Result<Coordinate> {
    let event: HeadEvent = serde_json::from_str(data).map_err(|e| {
        ConsensusError::MalformedHeadEvent(format!("could not unmarshal `head` node event: {}", e))
    })?;
    
    let slot: Slot = event.slot.parse().map_err(|e| {
        ConsensusError::MalformedHeadEvent(format!("invalid slot {:?}: {}", event.slot, e))
    })?;
    
    Ok(Coordinate::new(slot, event.block))
}

/// Sequence of canonical heads produced by a background subscription task.
///
/// At most one undelivered head is buffered. Cancelling the token given to
/// [`HeadStream::spawn`], calling [`HeadStream::cancel`] or dropping the
/// stream stops the task.
pub struct HeadStream {
    receiver: mpsc::Receiver<Coordinate>,
    cancel: CancellationToken,
}

impl HeadStream {
    pub fn spawn(api: Arc<dyn BeaconApi>, cancel: CancellationToken) -> Self {
        let (sender, receiver) = mpsc::channel(1);
        let cancel = cancel.child_token();
        tokio::spawn(produce_heads(api, sender, cancel.clone()));
        
        Self { receiver, cancel }
    }
    
    /// Next head, or `None` once the producer has stopped.
    pub async fn recv(&mut self) -> Option<Coordinate> {
        self.receiver.recv().await
    }
    
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Stream for HeadStream {
    type Item = Coordinate;
    
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for HeadStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn produce_heads(
    api: Arc<dyn BeaconApi>,
    sender: mpsc::Sender<Coordinate>,
    cancel: CancellationToken,
) {
    let subscription = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        subscription = api.subscribe_events(HEAD_TOPIC) => subscription,
    };
    
    let mut events = match subscription {
        Ok(events) => events,
        Err(e) => {
            error!(error = %e, "could not subscribe to head event");
            return;
        }
    };
    
    loop {
        let data = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.next() => match event {
                Some(Ok(data)) => data,
                Some(Err(e)) => {
                    error!(error = %e, "head event subscription failed");
                    break;
                }
                None => {
                    warn!("head event subscription closed by node");
                    break;
                }
            },
        };
        
        let head = match decode_head_event(&data) {
            Ok(head) => head,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };
        
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = sender.send(head) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    
    debug!("head stream stopped");
}
