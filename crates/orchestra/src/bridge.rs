//! Runs a pipeline on a background task and streams its events

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;

use crate::{
    events::{EventEmitter, OrchestrationEvent},
    orchestrator::Orchestrator,
};

/// Consumer side of a running orchestration.
///
/// Yields events in emission order and ends right after `done`, or when the
/// producer disappears without sending one.
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<OrchestrationEvent>,
    finished: bool,
}

impl EventStream {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<OrchestrationEvent>) -> Self {
        Self {
            receiver,
            finished: false,
        }
    }

    /// Next event, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<OrchestrationEvent> {
        if self.finished {
            return None;
        }
        let event = self.receiver.recv().await;
        self.observe(event)
    }

    fn observe(&mut self, event: Option<OrchestrationEvent>) -> Option<OrchestrationEvent> {
        match event {
            Some(event) => {
                if event.is_done() {
                    self.finished = true;
                    self.receiver.close();
                }
                Some(event)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl Stream for EventStream {
    type Item = OrchestrationEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(event) => Poll::Ready(self.observe(event)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Spawn `orchestrator` on its own task and return its event stream.
///
/// The producer always finishes with exactly one `done`. A failed or
/// panicked run emits one `error` right before it.
pub fn spawn_orchestration(mut orchestrator: Orchestrator, scenario: impl Into<String>) -> EventStream {
    let (sender, receiver) = mpsc::unbounded_channel();
    let emitter = EventEmitter::new(sender);
    let scenario = scenario.into();

    tokio::spawn(async move {
        let pipeline_events = emitter.clone();
        let pipeline = tokio::spawn(async move {
            orchestrator
                .execute(&scenario, &pipeline_events)
                .await
                .map(|_| ())
        });

        match pipeline.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("Orchestration failed: {}", e);
                emitter.error(e.to_string());
            }
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    "Orchestration task panicked".to_string()
                } else {
                    format!("Orchestration task was cancelled: {}", join_error)
                };
                tracing::error!("{}", message);
                emitter.error(message);
            }
        }

        emitter.done();
    });

    EventStream::new(receiver)
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn test_stream_ends_after_done() {
        let (tx, rx) = mpsc::unbounded_channel();
        let emitter = EventEmitter::new(tx);
        emitter.status("working");
        emitter.done();
        // anything after done is never observed
        emitter.status("late");

        let events: Vec<_> = EventStream::new(rx).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_done());
    }

    #[tokio::test]
    async fn test_stream_ends_when_producer_drops() {
        let (tx, rx) = mpsc::unbounded_channel();
        EventEmitter::new(tx).status("only event");

        let mut stream = EventStream::new(rx);
        assert_eq!(stream.recv().await.unwrap().kind(), "status");
        assert!(stream.recv().await.is_none());
        assert!(stream.next().await.is_none());
    }
}
