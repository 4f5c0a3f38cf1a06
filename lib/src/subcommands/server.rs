use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket, WebSocketUpgrade},
    State,
  },
  response::Response,
  routing::get,
  Json, Router,
};
use tokio::{
  net::TcpListener,
  sync::{broadcast::error::RecvError, watch},
};
use tracing::{debug, info, warn};

use super::{EventHub, ServerEvent};
use crate::{
  error::Result,
  model::{accuracy_json, EvaluationResult, PitchDatasets},
  training::{SharedClassifier, Trainer, TrainingState},
};

pub const DEFAULT_PORT: u16 = 8001;

/// Trains the model while serving predictions over a websocket at `/socket`.
pub struct Server {
  port: u16,
  datasets: Arc<PitchDatasets>,
  report_validation: bool,
  seed: Option<u64>,
}

#[derive(Clone)]
pub struct AppState {
  hub: EventHub,
  training: watch::Receiver<TrainingState>,
}

impl AppState {
  pub fn new(hub: EventHub, training: watch::Receiver<TrainingState>) -> Self {
    Self { hub, training }
  }
}

enum SocketStep {
  Inbound(Option<Result<Message, axum::Error>>),
  Outbound(Result<ServerEvent, RecvError>),
}

impl Server {
  pub fn new(port: u16, datasets: PitchDatasets, report_validation: bool, seed: Option<u64>) -> Self {
    Self {
      port,
      datasets: Arc::new(datasets),
      report_validation,
      seed,
    }
  }

  /// Serves until the listener fails. Training runs once; predictions stay available after it.
  pub async fn run(self) -> Result<()> {
    let classifier = SharedClassifier::spawn(self.seed)?;
    let mut trainer = Trainer::new(classifier.clone(), self.datasets, self.seed)
      .report_validation(self.report_validation);
    let hub = EventHub::new(classifier);
    let app = Self::router(AppState::new(hub.clone(), trainer.subscribe()));

    let tcp_listener = TcpListener::bind(("0.0.0.0", self.port)).await?;
    info!("Running socket on port: {}", self.port);
    let server = tokio::spawn(async move { axum::serve(tcp_listener, app).await });

    train_and_announce(&mut trainer, &hub).await?;

    server.await??;
    Ok(())
  }

  pub fn router(state: AppState) -> Router {
    Router::new()
      .route("/", get(Self::status))
      .route("/socket", get(Self::socket))
      .with_state(state)
  }

  async fn status(State(state): State<AppState>) -> Json<TrainingState> {
    Json(*state.training.borrow())
  }

  async fn socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| Self::handle_socket(socket, state.hub))
  }

  async fn handle_socket(mut socket: WebSocket, hub: EventHub) {
    let mut events = hub.subscribe();
    debug!("client connected");
    loop {
      let step = tokio::select! {
        inbound = socket.recv() => SocketStep::Inbound(inbound),
        outbound = events.recv() => SocketStep::Outbound(outbound),
      };
      match step {
        SocketStep::Inbound(Some(Ok(Message::Text(text)))) => hub.handle_text(&text).await,
        SocketStep::Inbound(Some(Ok(Message::Close(_)))) | SocketStep::Inbound(None) => break,
        SocketStep::Inbound(Some(Ok(_))) => {}
        SocketStep::Inbound(Some(Err(err))) => {
          debug!("socket error: {}", err);
          break;
        }
        SocketStep::Outbound(Ok(event)) => {
          let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(err) => {
              warn!("cannot encode {:?}: {}", event, err);
              continue;
            }
          };
          if socket.send(Message::Text(text)).await.is_err() {
            break;
          }
        }
        SocketStep::Outbound(Err(RecvError::Lagged(skipped))) => {
          warn!("client fell behind, skipped {} events", skipped)
        }
        SocketStep::Outbound(Err(RecvError::Closed)) => break,
      }
    }
    debug!("client disconnected");
  }
}

/// Runs the full training loop, then tells every connected client it finished.
pub async fn train_and_announce(trainer: &mut Trainer, hub: &EventHub) -> Result<EvaluationResult> {
  let result = trainer.run().await?;
  hub.broadcast(ServerEvent::TrainingComplete(true));
  info!("Training complete, accuracyPerClass {}", accuracy_json(&result));
  Ok(result)
}
