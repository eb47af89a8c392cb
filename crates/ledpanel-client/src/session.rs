//! A connected panel session.
//!
//! [`Session::connect`] loads the schema and the current values, then starts
//! the live sync and the write dispatcher. The front end drives it by calling
//! [`Session::next_event`] in its event loop and [`Session::edit`] for user
//! input; the session keeps the [`PanelState`] in step with both.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ledpanel_core::{
    ApplyOutcome, ControlRegistry, Edit, PanelSettings, PanelState, RegistryError, WriteRequest,
};
use ledpanel_protocol::DeviceMessage;

use crate::dispatch::{WriteDispatcher, WriteOutcome};
use crate::error::ClientError;
use crate::http::DeviceApi;
use crate::live::{self, LiveConfig, LiveEvent, LiveHandle};

pub const STATUS_CONNECTING: &str = "Connecting, please wait...";
pub const STATUS_LOADING: &str = "Loading, please wait...";
pub const STATUS_STRUCTURE_READY: &str = "Structure ready, updating values";
pub const STATUS_LOADING_VALUES: &str = "Loading, current values...";
pub const STATUS_READY: &str = "Ready";
pub const STATUS_VALUES_FAILED: &str = "Error loading the current values!";

const EVENT_QUEUE: usize = 256;
const WRITE_QUEUE: usize = 256;

/// Something that changed the panel state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Live(LiveEvent),
    Write(WriteOutcome),
    /// A debounce, liveness or status timer fired.
    Timer,
}

/// Current time on the tokio clock, so paused test clocks apply.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Apply a message pushed by the device.
///
/// Any message counts as link activity. Only field updates change the form.
pub fn apply_device_message(
    state: &mut PanelState,
    msg: &DeviceMessage,
    now: Instant,
) -> Option<ApplyOutcome> {
    state.on_link_message(now);

    match msg {
        DeviceMessage::FieldUpdate(update) => {
            let outcome = state.apply_update(&update.name, &update.value);
            match outcome {
                ApplyOutcome::Applied => {}
                ApplyOutcome::UnknownField => {
                    debug!(name = %update.name, "Update for unknown field")
                }
                ApplyOutcome::Ignored => {}
                ApplyOutcome::Invalid => {
                    warn!(
                        name = %update.name,
                        value = %update.value,
                        "Update does not fit the field"
                    )
                }
            }
            Some(outcome)
        }
        DeviceMessage::ClientInfo(info) => {
            debug!(client = %info.client, status = ?info.status, "Client info");
            None
        }
        DeviceMessage::Other(value) => {
            debug!(%value, "Unhandled device message");
            None
        }
    }
}

/// Load the schema and the current values.
///
/// `progress` sees every load message, including the ones shown before the
/// form exists. A schema failure aborts the load; a value failure leaves the
/// form with its schema values and a transient error status.
pub async fn load_state<F>(
    api: &DeviceApi,
    settings: &PanelSettings,
    mut progress: F,
) -> Result<PanelState, ClientError>
where
    F: FnMut(&str),
{
    progress(STATUS_CONNECTING);
    info!(base = api.base_url(), "Loading field schema");

    let fields = match api.fetch_schema().await {
        Ok(fields) => fields,
        Err(e) => {
            error!(error = %e, "Failed to load field schema");
            return Err(e);
        }
    };

    progress(STATUS_LOADING);
    let mut state = PanelState::from_schema(fields, settings);

    let mut stage = |state: &mut PanelState, message: &str| {
        state.set_status(message, true, now());
        progress(message);
    };

    stage(&mut state, STATUS_STRUCTURE_READY);
    match api.fetch_values().await {
        Ok(values) => {
            stage(&mut state, STATUS_LOADING_VALUES);
            let shown = state.apply_values(values.pairs());
            debug!(shown, total = values.values.len(), "Current values applied");
            stage(&mut state, STATUS_READY);
        }
        Err(e) => {
            warn!(error = %e, "Failed to load current values");
            state.set_status(STATUS_VALUES_FAILED, false, now());
            progress(STATUS_VALUES_FAILED);
        }
    }

    Ok(state)
}

pub struct Session {
    state: PanelState,
    live_rx: mpsc::Receiver<LiveEvent>,
    outcome_rx: mpsc::Receiver<WriteOutcome>,
    write_tx: mpsc::Sender<WriteRequest>,
    live: Option<LiveHandle>,
    dispatcher: Option<JoinHandle<()>>,
}

impl Session {
    /// Load the form, then start live sync and write dispatch.
    pub async fn connect<F>(settings: &PanelSettings, progress: F) -> Result<Self, ClientError>
    where
        F: FnMut(&str),
    {
        let api = DeviceApi::new(settings)?;
        let state = load_state(&api, settings, progress).await?;

        let (live_tx, live_rx) = mpsc::channel(EVENT_QUEUE);
        let live = live::spawn(LiveConfig::from_settings(settings), live_tx);

        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE);
        let (outcome_tx, outcome_rx) = mpsc::channel(EVENT_QUEUE);
        let dispatcher =
            WriteDispatcher::new(api, Some(live.echo_sender())).spawn(write_rx, outcome_tx);

        let mut session = Self::from_parts(state, live_rx, outcome_rx, write_tx);
        session.live = Some(live);
        session.dispatcher = Some(dispatcher);
        Ok(session)
    }

    pub(crate) fn from_parts(
        state: PanelState,
        live_rx: mpsc::Receiver<LiveEvent>,
        outcome_rx: mpsc::Receiver<WriteOutcome>,
        write_tx: mpsc::Sender<WriteRequest>,
    ) -> Self {
        Self {
            state,
            live_rx,
            outcome_rx,
            write_tx,
            live: None,
            dispatcher: None,
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PanelState {
        &mut self.state
    }

    /// Run a user edit. Immediate writes are handed to the dispatcher now.
    pub fn edit<F>(&mut self, f: F) -> Result<Edit, RegistryError>
    where
        F: FnOnce(&mut ControlRegistry) -> Result<Edit, RegistryError>,
    {
        let now = now();
        let edit = self.state.edit(now, f)?;
        self.flush_writes(now);
        Ok(edit)
    }

    /// Wait for the next event and apply it to the state.
    ///
    /// Cancel safe, so it can sit in a `select!` next to terminal input.
    /// Returns `None` once the background tasks are gone and no timer is
    /// pending.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let deadline = self.state.next_deadline(now());
        let timer = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => std::future::pending::<()>().await,
            }
        };

        let event = tokio::select! {
            Some(event) = self.live_rx.recv() => SessionEvent::Live(event),
            Some(outcome) = self.outcome_rx.recv() => SessionEvent::Write(outcome),
            _ = timer, if deadline.is_some() => SessionEvent::Timer,
            else => return None,
        };

        let now = now();
        self.handle(&event, now);
        self.flush_writes(now);
        Some(event)
    }

    fn handle(&mut self, event: &SessionEvent, now: Instant) {
        match event {
            SessionEvent::Live(LiveEvent::Opened) => self.state.on_link_open(now),
            SessionEvent::Live(LiveEvent::Closed) => {
                info!("WebSocket closed, reconnecting");
                self.state.on_link_closed();
            }
            SessionEvent::Live(LiveEvent::Message(msg)) => {
                apply_device_message(&mut self.state, msg, now);
            }
            // unparseable traffic does not count as link activity
            SessionEvent::Live(LiveEvent::Malformed(_)) => {}
            SessionEvent::Write(WriteOutcome::Succeeded { write, state }) => {
                self.state.on_write_succeeded(write, state.as_ref(), now);
            }
            SessionEvent::Write(WriteOutcome::Failed { write, .. }) => {
                self.state.on_write_failed(write, now);
            }
            SessionEvent::Timer => {}
        }
        self.state.tick(now);
    }

    fn flush_writes(&mut self, now: Instant) {
        for write in self.state.take_writes(now) {
            self.state.on_write_started(&write, now);
            match self.write_tx.try_send(write) {
                Ok(()) => {}
                Err(TrySendError::Full(write)) | Err(TrySendError::Closed(write)) => {
                    warn!(name = %write.name, "Write queue unavailable, dropping write");
                    self.state.on_write_failed(&write, now);
                }
            }
        }
    }

    /// Stop the background tasks.
    pub fn shutdown(&mut self) {
        if let Some(live) = self.live.take() {
            live.shutdown();
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use ledpanel_core::{Channel, FieldDescriptor, FieldType, FieldValue, LinkState, Rgb};
    use ledpanel_protocol::FieldUpdate;
    use serde_json::json;

    struct Harness {
        session: Session,
        live_tx: mpsc::Sender<LiveEvent>,
        outcome_tx: mpsc::Sender<WriteOutcome>,
        write_rx: mpsc::Receiver<WriteRequest>,
    }

    fn harness() -> Harness {
        let fields = vec![
            FieldDescriptor::new("power", "On/Off", FieldType::Boolean),
            FieldDescriptor {
                min: Some(0),
                max: Some(255),
                ..FieldDescriptor::new("brightness", "Brightness", FieldType::Number)
            },
            FieldDescriptor::new("solidColor", "Color", FieldType::Color),
        ];
        let state = PanelState::from_schema(fields, &PanelSettings::default());

        let (live_tx, live_rx) = mpsc::channel(16);
        let (outcome_tx, outcome_rx) = mpsc::channel(16);
        let (write_tx, write_rx) = mpsc::channel(16);

        Harness {
            session: Session::from_parts(state, live_rx, outcome_rx, write_tx),
            live_tx,
            outcome_tx,
            write_rx,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slider_burst_is_written_once() {
        let mut h = harness();

        for v in [10, 80, 160, 220] {
            h.session.edit(|r| r.set_number("brightness", v)).unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(h.write_rx.try_recv().is_err());

        let event = h.session.next_event().await;
        assert_eq!(event, Some(SessionEvent::Timer));

        let write = h.write_rx.try_recv().unwrap();
        assert_eq!(write.value, FieldValue::Number(220));
        assert!(h.write_rx.try_recv().is_err());
        assert_eq!(
            h.session.state().status(now()),
            Some("Set brightness: 220, please wait...")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_is_written_immediately() {
        let mut h = harness();

        h.session.edit(|r| r.toggle("power")).unwrap();
        let write = h.write_rx.try_recv().unwrap();
        assert_eq!(write.value, FieldValue::Boolean(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_color_channels_coalesce() {
        let mut h = harness();

        h.session
            .edit(|r| r.set_color_channel("solidColor", Channel::Red, 255))
            .unwrap();
        h.session
            .edit(|r| r.set_color_channel("solidColor", Channel::Blue, 64))
            .unwrap();

        h.session.next_event().await;
        let write = h.write_rx.try_recv().unwrap();
        assert_eq!(write.value, FieldValue::Color(Rgb::new(255, 0, 64)));
        assert!(h.write_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_update_applies_without_writing() {
        let mut h = harness();

        h.live_tx.send(LiveEvent::Opened).await.unwrap();
        h.live_tx
            .send(LiveEvent::Message(DeviceMessage::FieldUpdate(FieldUpdate {
                name: "brightness".to_string(),
                value: json!(42),
            })))
            .await
            .unwrap();

        h.session.next_event().await;
        h.session.next_event().await;

        assert_eq!(
            h.session.state().registry().value("brightness"),
            Some(FieldValue::Number(42))
        );
        assert_eq!(h.session.state().link_state(now()), LinkState::Alive);
        assert!(h.write_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_marks_link_stale_then_dead() {
        let mut h = harness();

        h.live_tx.send(LiveEvent::Opened).await.unwrap();
        h.session.next_event().await;

        assert_eq!(h.session.next_event().await, Some(SessionEvent::Timer));
        assert_eq!(h.session.state().link_state(now()), LinkState::Stale);

        assert_eq!(h.session.next_event().await, Some(SessionEvent::Timer));
        assert_eq!(h.session.state().link_state(now()), LinkState::Dead);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frames_do_not_keep_link_alive() {
        let mut h = harness();

        h.live_tx.send(LiveEvent::Opened).await.unwrap();
        h.session.next_event().await;

        tokio::time::sleep(Duration::from_millis(1000)).await;
        h.live_tx
            .send(LiveEvent::Malformed("not json".to_string()))
            .await
            .unwrap();
        assert_eq!(
            h.session.next_event().await,
            Some(SessionEvent::Live(LiveEvent::Malformed("not json".to_string())))
        );

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(h.session.state().link_state(now()), LinkState::Dead);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_outcome_updates_status() {
        let mut h = harness();
        let write = WriteRequest {
            name: "solidColor".to_string(),
            value: FieldValue::Color(Rgb::new(1, 2, 3)),
        };

        h.outcome_tx
            .send(WriteOutcome::Failed {
                write,
                error: "timed out".to_string(),
            })
            .await
            .unwrap();
        h.session.next_event().await;

        assert_eq!(h.session.state().status(now()), Some("Error sending the Color!"));
    }

    #[test]
    fn test_client_info_only_refreshes_liveness() {
        let fields = vec![FieldDescriptor::new("power", "On/Off", FieldType::Boolean)];
        let mut state = PanelState::from_schema(fields, &PanelSettings::default());
        let t0 = Instant::now();

        let msg: DeviceMessage =
            serde_json::from_str(r#"{"Client": 1, "Status": "connected"}"#).unwrap();
        assert_eq!(apply_device_message(&mut state, &msg, t0), None);
        assert_eq!(state.link_state(t0), LinkState::Alive);
        assert!(!state.has_pending_writes());
    }
}
