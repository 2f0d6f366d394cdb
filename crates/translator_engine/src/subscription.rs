use std::collections::VecDeque;
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::Poll;

use futures_util::{stream, Stream, StreamExt};
use reqwest::header::ACCEPT;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use translator_core::Generation;
use translator_logging::{engine_debug, engine_info, engine_trace, engine_warn};

use crate::http::{build_client, describe_reqwest_error, error_parts};
use crate::parse::parse_progress_message;
use crate::sink::EventGate;
use crate::{EngineEvent, EventSink, SseDecoder, StreamError, TransportSettings};

/// Raw `data` payloads of a server-push channel. Dropping it releases the connection.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<String, StreamError>> + Send>>;

#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    async fn connect(&self, job_id: &str) -> Result<MessageStream, StreamError>;
}

/// `GET /translation-progress?id=...` as a `text/event-stream`.
#[derive(Debug, Clone)]
pub struct SseEventSource {
    settings: TransportSettings,
}

impl SseEventSource {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl EventSource for SseEventSource {
    async fn connect(&self, job_id: &str) -> Result<MessageStream, StreamError> {
        // Long-lived channel: connect timeout only.
        let client = build_client(&self.settings, false)
            .map_err(|err| StreamError::Transport(err.to_string()))?;
        let mut url = self.settings.endpoint(&["translation-progress"]);
        url.query_pairs_mut().append_pair("id", job_id);

        let response = client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|err| StreamError::Transport(describe_reqwest_error(&err)))?;

        if !response.status().is_success() {
            let (status, message) = error_parts(response).await;
            return Err(StreamError::Server { status, message });
        }

        let bytes = Box::pin(response.bytes_stream());
        let messages = stream::unfold(
            (bytes, SseDecoder::new(), VecDeque::new()),
            |(mut bytes, mut decoder, mut pending)| async move {
                loop {
                    if let Some(data) = pending.pop_front() {
                        return Some((Ok(data), (bytes, decoder, pending)));
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => match decoder.push(&chunk) {
                            Ok(events) => pending.extend(events),
                            Err(error) => return Some((Err(error), (bytes, decoder, pending))),
                        },
                        Some(Err(err)) => {
                            let error = StreamError::Transport(describe_reqwest_error(&err));
                            return Some((Err(error), (bytes, decoder, pending)));
                        }
                        None => return None,
                    }
                }
            },
        );
        Ok(Box::pin(messages))
    }
}

/// Holds the connected stream so `close` can drop it without waiting on the pump task.
#[derive(Default)]
struct StreamSlot {
    stream: Mutex<Option<MessageStream>>,
}

impl StreamSlot {
    /// Stores the stream unless the subscription was cancelled meanwhile.
    fn fill(&self, stream: MessageStream, token: &CancellationToken) -> bool {
        let mut slot = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if token.is_cancelled() {
            return false;
        }
        *slot = Some(stream);
        true
    }

    /// `None` once the stream was released.
    async fn next(&self) -> Option<Option<Result<String, StreamError>>> {
        poll_fn(|cx| {
            let mut slot = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_mut() {
                Some(stream) => stream.poll_next_unpin(cx).map(Some),
                None => Poll::Ready(None),
            }
        })
        .await
    }

    fn release(&self) -> bool {
        self.stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }
}

/// A progress channel scoped to one backend job. Dropping it closes the channel.
pub struct ProgressSubscription {
    job_id: String,
    generation: Generation,
    token: CancellationToken,
    gate: Arc<EventGate>,
    slot: Arc<StreamSlot>,
    task: JoinHandle<()>,
}

impl ProgressSubscription {
    pub fn open(
        runtime: &Handle,
        source: Arc<dyn EventSource>,
        job_id: impl Into<String>,
        generation: Generation,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let job_id = job_id.into();
        let token = CancellationToken::new();
        let gate = Arc::new(EventGate::new(sink));
        let slot = Arc::new(StreamSlot::default());
        engine_info!(
            "Progress subscription opened job_id={} generation={}",
            job_id,
            generation
        );

        let task = runtime.spawn(pump(
            source,
            job_id.clone(),
            generation,
            gate.clone(),
            slot.clone(),
            token.clone(),
        ));

        Self {
            job_id,
            generation,
            token,
            gate,
            slot,
            task,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Stops dispatch and drops the connection before returning. Safe to call repeatedly.
    pub fn close(&self) {
        self.gate.close();
        self.token.cancel();
        let released = self.slot.release();
        self.task.abort();
        engine_debug!(
            "Progress subscription closed job_id={} generation={} released={}",
            self.job_id,
            self.generation,
            released
        );
    }

    /// True once a terminal message, a failure or `close` ended the subscription.
    pub fn is_closed(&self) -> bool {
        self.gate.is_closed() || self.task.is_finished()
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        if !self.token.is_cancelled() {
            self.close();
        }
    }
}

async fn pump(
    source: Arc<dyn EventSource>,
    job_id: String,
    generation: Generation,
    gate: Arc<EventGate>,
    slot: Arc<StreamSlot>,
    token: CancellationToken,
) {
    let fail = |error: StreamError| {
        engine_warn!(
            "Progress subscription failed job_id={} generation={}: {}",
            job_id,
            generation,
            error
        );
        gate.emit(EngineEvent::StreamFailed { generation, error });
        gate.close();
        slot.release();
    };

    let connected = tokio::select! {
        _ = token.cancelled() => return,
        connected = source.connect(&job_id) => connected,
    };
    match connected {
        Ok(messages) => {
            if !slot.fill(messages, &token) {
                return;
            }
        }
        Err(error) => return fail(error),
    }

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => return,
            next = slot.next() => next,
        };
        let payload = match next {
            None => return,
            Some(Some(Ok(payload))) => payload,
            Some(Some(Err(error))) => return fail(error),
            Some(None) => return fail(StreamError::ConnectionLost),
        };
        match parse_progress_message(&payload) {
            Ok(None) => engine_trace!("Heartbeat job_id={}", job_id),
            Ok(Some(event)) => {
                let terminal = event.is_terminal();
                gate.emit(EngineEvent::Stream { generation, event });
                if terminal {
                    gate.close();
                    slot.release();
                    engine_info!(
                        "Progress subscription finished job_id={} generation={}",
                        job_id,
                        generation
                    );
                    return;
                }
            }
            Err(error) => return fail(error),
        }
    }
}
