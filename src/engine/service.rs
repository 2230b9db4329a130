// service.rs: request/reply loop between the controller and the engine

use crate::engine::filter::{FilterEngine, FilterStatus};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Wire-shaped message from the controller. `settings.enabled` carries the
/// desired state the engine reconciles toward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum FilterMessage {
    ToggleFilter { settings: Settings },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReply {
    pub status: FilterStatus,
}

/// Channel envelope: the message plus a reply slot.
pub struct FilterRequest {
    pub message: FilterMessage,
    pub reply: oneshot::Sender<FilterReply>,
}

/// Serve engine requests until the channel closes or shutdown fires.
/// Runs on the document's thread; the engine handles are not `Send`.
pub async fn run(
    engine: FilterEngine,
    mut requests: mpsc::Receiver<FilterRequest>,
    mut shutdown: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            maybe_request = requests.recv() => {
                let Some(request) = maybe_request else { break };
                let status = match &request.message {
                    FilterMessage::ToggleFilter { settings } => engine.handle_toggle(settings),
                };
                if request.reply.send(FilterReply { status }).is_err() {
                    tracing::debug!("requester went away before the reply");
                }
            }
        }
    }
    tracing::debug!("engine service stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::engine::filter::MARKER_CLASS;
    use std::rc::Rc;

    async fn round_trip(tx: &mpsc::Sender<FilterRequest>, settings: Settings) -> FilterReply {
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(FilterRequest {
            message: FilterMessage::ToggleFilter { settings },
            reply: reply_tx,
        })
        .await
        .expect("service alive");
        reply_rx.await.expect("reply")
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let document = Rc::new(Document::parse("<p>abc</p>"));
                let engine = FilterEngine::new(document.clone(), false);
                let (tx, rx) = mpsc::channel(8);
                let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);
                tokio::task::spawn_local(run(engine, rx, shutdown_rx));

                let on = Settings {
                    enabled: true,
                    ..Settings::default()
                };
                let reply = round_trip(&tx, on.clone()).await;
                assert_eq!(reply.status, FilterStatus::Enabled);
                assert_eq!(document.elements_with_class(MARKER_CLASS).len(), 1);

                let off = Settings {
                    enabled: false,
                    ..on
                };
                let reply = round_trip(&tx, off).await;
                assert_eq!(reply.status, FilterStatus::Disabled);
                assert!(document.elements_with_class(MARKER_CLASS).is_empty());
            })
            .await;
    }

    #[test]
    fn test_message_wire_shape() {
        let message = FilterMessage::ToggleFilter {
            settings: Settings::default(),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["action"], "toggleFilter");
        assert_eq!(value["settings"]["colorA"], "#FF0000");
        assert_eq!(value["settings"]["isEnabled"], false);

        let reply = FilterReply {
            status: FilterStatus::Enabled,
        };
        assert_eq!(serde_json::to_value(&reply).unwrap()["status"], "enabled");
    }
}
