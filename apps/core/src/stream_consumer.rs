use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::contract::{PromptRequest, TranslateRequest};
use crate::relay::RelayClient;
use crate::session::{SessionEvent, SessionId};

pub struct StreamParams {
    pub relay: Arc<dyn RelayClient>,
    pub request: PromptRequest,
    pub use_high_capability_model: bool,
    pub session: SessionId,
    pub cancel: CancellationToken,
    pub events: UnboundedSender<SessionEvent>,
}

pub struct TranslationParams {
    pub relay: Arc<dyn RelayClient>,
    pub request: TranslateRequest,
    pub session: SessionId,
    pub cancel: CancellationToken,
    pub events: UnboundedSender<SessionEvent>,
}

/// Forwards every decoded chunk as a tagged event until end-of-stream,
/// the first failure, or cancellation. Cancellation emits nothing.
pub fn spawn_stream(params: StreamParams) -> JoinHandle<()> {
    let StreamParams {
        relay,
        request,
        use_high_capability_model,
        session,
        cancel,
        events,
    } = params;

    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(session_id = %session, "stream cancelled");
            }
            _ = consume_stream(relay, request, use_high_capability_model, session, &events) => {}
        }
    })
}

async fn consume_stream(
    relay: Arc<dyn RelayClient>,
    request: PromptRequest,
    use_high_capability_model: bool,
    session: SessionId,
    events: &UnboundedSender<SessionEvent>,
) {
    let mut stream = match relay
        .stream_prompt(request, use_high_capability_model)
        .await
    {
        Ok(stream) => stream,
        Err(error) => {
            warn!(session_id = %session, error = %error, "prompt request failed");
            let _ = events.send(SessionEvent::Failed {
                session,
                message: error.user_message(),
            });
            return;
        }
    };

    let mut received = 0_usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(text) => {
                if text.is_empty() {
                    continue;
                }
                received += text.len();
                if events.send(SessionEvent::Chunk { session, text }).is_err() {
                    return;
                }
            }
            Err(error) => {
                warn!(session_id = %session, error = %error, bytes = received, "stream failed");
                let _ = events.send(SessionEvent::Failed {
                    session,
                    message: error.user_message(),
                });
                return;
            }
        }
    }

    debug!(session_id = %session, bytes = received, "stream complete");
    let _ = events.send(SessionEvent::Finished { session });
}

/// Single-shot translation. Same tagging and cancellation as a stream.
pub fn spawn_translation(params: TranslationParams) -> JoinHandle<()> {
    let TranslationParams {
        relay,
        request,
        session,
        cancel,
        events,
    } = params;

    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(session_id = %session, "translation cancelled");
            }
            result = relay.translate(request) => {
                let event = match result {
                    Ok(response) => SessionEvent::Translated {
                        session,
                        text: response.translation,
                    },
                    Err(error) => {
                        warn!(session_id = %session, error = %error, "translation failed");
                        SessionEvent::Failed {
                            session,
                            message: error.user_message(),
                        }
                    }
                };
                let _ = events.send(event);
            }
        }
    })
}
