use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{error::Result, training::SharedClassifier};

/// Outbound events a slow subscriber may fall behind by before it starts skipping.
pub const EVENT_BUFFER: usize = 64;

/// Frames sent by clients: `{"event": "predictSample", "data": [..]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
  /// An already-normalized feature vector.
  PredictSample(Vec<f32>),
}

/// Frames broadcast to every connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
  PredictResult(String),
  TrainingComplete(bool),
}

/// Turns inbound events into broadcasts. There is no per-client addressing.
#[derive(Debug, Clone)]
pub struct EventHub {
  sender: broadcast::Sender<ServerEvent>,
  classifier: SharedClassifier,
}

impl EventHub {
  pub fn new(classifier: SharedClassifier) -> Self {
    let (sender, _) = broadcast::channel(EVENT_BUFFER);
    Self { sender, classifier }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
    self.sender.subscribe()
  }

  pub fn broadcast(&self, event: ServerEvent) {
    if self.sender.send(event).is_err() {
      debug!("no listeners connected, event dropped");
    }
  }

  /// Runs the request against the current model and broadcasts its answer.
  pub async fn handle(&self, event: ClientEvent) -> Result<()> {
    match event {
      ClientEvent::PredictSample(sample) => {
        let label = self.classifier.predict_sample(sample).await?;
        self.broadcast(ServerEvent::PredictResult(label.to_owned()));
      }
    }
    Ok(())
  }

  /// Parses and handles one text frame. Bad frames are logged and dropped.
  pub async fn handle_text(&self, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
      Ok(event) => event,
      Err(err) => {
        warn!("ignoring malformed frame {:?}: {}", text, err);
        return;
      }
    };
    if let Err(err) = self.handle(event).await {
      warn!("rejected request: {}", err);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{PitchType, UNKNOWN_PITCH};

  fn hub() -> EventHub {
    EventHub::new(SharedClassifier::spawn(Some(9)).unwrap())
  }

  #[test]
  fn test_wire_format() {
    let inbound: ClientEvent =
      serde_json::from_str(r#"{"event":"predictSample","data":[0.1,0.2,0.3,0.4,0.5,0.6,0.7,1]}"#).unwrap();
    assert_eq!(inbound, ClientEvent::PredictSample(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 1.0]));

    let result = serde_json::to_string(&ServerEvent::PredictResult("Slider".to_owned())).unwrap();
    assert_eq!(result, r#"{"event":"predictResult","data":"Slider"}"#);
    let complete = serde_json::to_string(&ServerEvent::TrainingComplete(true)).unwrap();
    assert_eq!(complete, r#"{"event":"trainingComplete","data":true}"#);
  }

  #[tokio::test]
  async fn test_predict_sample_broadcasts_one_result() {
    let hub = hub();
    let mut first = hub.subscribe();
    let mut second = hub.subscribe();

    hub.handle(ClientEvent::PredictSample(vec![0.5; 8])).await.unwrap();

    for listener in [&mut first, &mut second] {
      match listener.try_recv().unwrap() {
        ServerEvent::PredictResult(label) => assert!(
          label == UNKNOWN_PITCH || PitchType::ALL.iter().any(|pitch| pitch.label() == label)
        ),
        other => panic!("unexpected event {:?}", other),
      }
      assert!(listener.try_recv().is_err());
    }
  }

  #[tokio::test]
  async fn test_wrong_length_is_rejected_without_broadcast() {
    let hub = hub();
    let mut listener = hub.subscribe();
    assert!(hub.handle(ClientEvent::PredictSample(vec![0.5; 3])).await.is_err());
    assert!(listener.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_malformed_frames_are_ignored() {
    let hub = hub();
    let mut listener = hub.subscribe();
    hub.handle_text("not json").await;
    hub.handle_text(r#"{"event":"unknownEvent","data":1}"#).await;
    assert!(listener.try_recv().is_err());

    hub.handle_text(r#"{"event":"predictSample","data":[0,0,0,0,0,0,0,0]}"#).await;
    assert!(matches!(listener.try_recv(), Ok(ServerEvent::PredictResult(_))));
  }

  #[test]
  fn test_broadcast_without_listeners_is_fine() {
    hub().broadcast(ServerEvent::TrainingComplete(true));
  }
}
