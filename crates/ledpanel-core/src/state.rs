//! Application state of the panel.
//!
//! `PanelState` gathers everything the form needs between events: the schema,
//! the control registry, section navigation, the status line, the liveness
//! monitor and the pending writes. The async layer feeds it device events and
//! user edits, asks it which writes are due, and sleeps until
//! [`PanelState::next_deadline`].

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::PanelSettings;
use crate::debounce::Debouncer;
use crate::liveness::{LinkState, LivenessMonitor};
use crate::model::{FieldDescriptor, FieldType, FieldValue};
use crate::registry::{ApplyOutcome, ControlRegistry, Edit, RegistryError};
use crate::section::{NavigationState, SectionLayout, SectionMode};
use crate::status::StatusLine;

/// How long a write confirmation stays on screen.
pub const SUCCESS_STATUS_TIMEOUT: Duration = Duration::from_millis(3000);

/// A value that has to be sent to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub name: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone)]
pub struct PanelState {
    fields: Vec<FieldDescriptor>,
    registry: ControlRegistry,
    layout: SectionLayout,
    nav: NavigationState,
    mode: SectionMode,
    status: StatusLine,
    status_timeout: Duration,
    liveness: LivenessMonitor,
    debouncer: Debouncer<String, FieldValue>,
    outbox: Vec<WriteRequest>,
}

impl PanelState {
    /// Build the form for a freshly fetched schema.
    pub fn from_schema(fields: Vec<FieldDescriptor>, settings: &PanelSettings) -> Self {
        let registry = ControlRegistry::build(&fields);
        let layout = SectionLayout::from_descriptors(&fields);

        Self {
            fields,
            registry,
            layout,
            nav: NavigationState::new(),
            mode: settings.section_mode,
            status: StatusLine::new(),
            status_timeout: settings.status_timeout(),
            liveness: LivenessMonitor::new(),
            debouncer: Debouncer::new(settings.write_delay()),
            outbox: Vec::new(),
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &SectionLayout {
        &self.layout
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn section_mode(&self) -> SectionMode {
        self.mode
    }

    pub fn set_section_mode(&mut self, mode: SectionMode) {
        self.mode = mode;
    }

    /// Field names to render for the current section selection.
    pub fn visible_fields(&self) -> Vec<&str> {
        self.layout.visible_fields(self.mode, &self.nav)
    }

    pub fn next_section(&mut self) {
        self.nav.next(&self.layout);
    }

    pub fn previous_section(&mut self) {
        self.nav.previous(&self.layout);
    }

    pub fn select_section(&mut self, index: usize) {
        self.nav.select(index, &self.layout);
    }

    fn store_descriptor_value(&mut self, name: &str, value: FieldValue) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.value = Some(value.to_json());
        }
    }

    /// Show a value that came from the device. Never schedules a write.
    pub fn apply_update(&mut self, name: &str, value: &Value) -> ApplyOutcome {
        let outcome = self.registry.apply_remote(name, value);
        if outcome == ApplyOutcome::Applied {
            if let Some(current) = self.registry.value(name) {
                self.store_descriptor_value(name, current);
            }
        }
        outcome
    }

    /// Apply a batch of `{name, value}` pairs, returning how many were shown.
    pub fn apply_values<'a, I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        values
            .into_iter()
            .filter(|(name, value)| self.apply_update(name, value) == ApplyOutcome::Applied)
            .count()
    }

    /// Run a local edit and queue its write.
    ///
    /// Debounced edits restart that field's timer; immediate edits go to the
    /// outbox and drop any pending debounced value for the same field.
    pub fn edit<F>(&mut self, now: Instant, f: F) -> Result<Edit, RegistryError>
    where
        F: FnOnce(&mut ControlRegistry) -> Result<Edit, RegistryError>,
    {
        let edit = f(&mut self.registry)?;
        self.store_descriptor_value(&edit.name, edit.value);

        if edit.debounced {
            self.debouncer.schedule(edit.name.clone(), edit.value, now);
        } else {
            self.debouncer.cancel(&edit.name);
            self.outbox.push(WriteRequest {
                name: edit.name.clone(),
                value: edit.value,
            });
        }
        Ok(edit)
    }

    /// Writes that should be sent now: immediate edits, then due debounced ones.
    pub fn take_writes(&mut self, now: Instant) -> Vec<WriteRequest> {
        let mut writes: Vec<WriteRequest> = self.outbox.drain(..).collect();
        writes.extend(
            self.debouncer
                .take_due(now)
                .into_iter()
                .map(|(name, value)| WriteRequest { name, value }),
        );
        writes
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.outbox.is_empty() || !self.debouncer.is_empty()
    }

    /// Earliest moment something changes without new input.
    pub fn next_deadline(&self, now: Instant) -> Option<Instant> {
        [
            self.debouncer.next_deadline(),
            self.liveness.next_transition(now),
            self.status.next_expiry(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // ------------------------------------------------------------------
    // Status line
    // ------------------------------------------------------------------

    pub fn status(&self, now: Instant) -> Option<&str> {
        self.status.current(now)
    }

    /// Show a message with the configured timeout, or keep it until replaced.
    pub fn set_status(&mut self, message: impl Into<String>, keep: bool, now: Instant) {
        self.status.show(message, keep, self.status_timeout, now);
    }

    pub fn tick(&mut self, now: Instant) {
        self.status.tick(now);
    }

    pub fn on_write_started(&mut self, write: &WriteRequest, now: Instant) {
        self.set_status(
            format!("Set {}: {}, please wait...", write.name, write.value),
            true,
            now,
        );
    }

    /// `state` is the device's `currentState` echo when it sent one.
    pub fn on_write_succeeded(
        &mut self,
        write: &WriteRequest,
        state: Option<&Value>,
        now: Instant,
    ) {
        let detail = match state {
            Some(state) => state.to_string(),
            None => format!("{}: {}", write.name, write.value),
        };
        self.status.show(
            format!("success setting {detail}"),
            false,
            SUCCESS_STATUS_TIMEOUT,
            now,
        );
    }

    pub fn on_write_failed(&mut self, write: &WriteRequest, now: Instant) {
        let message = match write.value.field_type() {
            FieldType::Color => "Error sending the Color!",
            _ => "Error sending the value!",
        };
        self.set_status(message, true, now);
    }

    // ------------------------------------------------------------------
    // WebSocket liveness
    // ------------------------------------------------------------------

    pub fn on_link_open(&mut self, now: Instant) {
        self.liveness.on_open(now);
    }

    pub fn on_link_message(&mut self, now: Instant) {
        self.liveness.on_message(now);
    }

    pub fn on_link_closed(&mut self) {
        self.liveness.on_close();
    }

    pub fn link_state(&self, now: Instant) -> LinkState {
        self.liveness.state(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Channel, Rgb};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn panel() -> PanelState {
        let fields = vec![
            FieldDescriptor::new("power", "On/Off", FieldType::Boolean),
            FieldDescriptor::new("S_basic", "Basic", FieldType::Section),
            FieldDescriptor {
                min: Some(0),
                max: Some(255),
                ..FieldDescriptor::new("brightness", "Brightness", FieldType::Number)
            },
            FieldDescriptor {
                min: Some(0),
                max: Some(255),
                ..FieldDescriptor::new("speed", "Speed", FieldType::Number)
            },
            FieldDescriptor {
                options: Some(vec!["Static".into(), "Ease".into()]),
                ..FieldDescriptor::new("effect", "Effect", FieldType::Select)
            },
            FieldDescriptor::new("S_color", "Color", FieldType::Section),
            FieldDescriptor::new("solidColor", "Color", FieldType::Color),
        ];
        PanelState::from_schema(fields, &PanelSettings::default())
    }

    #[test]
    fn test_slider_burst_writes_once_with_last_value() {
        let t0 = Instant::now();
        let mut state = panel();

        for (i, v) in [10, 60, 120, 240].into_iter().enumerate() {
            state
                .edit(t0 + ms(40 * i as u64), |r| r.set_number("brightness", v))
                .unwrap();
        }

        assert!(state.take_writes(t0 + ms(250)).is_empty());
        assert_eq!(
            state.take_writes(t0 + ms(420)),
            vec![WriteRequest {
                name: "brightness".into(),
                value: FieldValue::Number(240),
            }]
        );
        assert!(!state.has_pending_writes());
    }

    #[test]
    fn test_distinct_fields_each_get_written() {
        let t0 = Instant::now();
        let mut state = panel();

        state.edit(t0, |r| r.set_number("brightness", 100)).unwrap();
        state.edit(t0 + ms(10), |r| r.set_number("speed", 5)).unwrap();
        state
            .edit(t0 + ms(20), |r| r.set_color_channel("solidColor", Channel::Red, 9))
            .unwrap();

        let names: Vec<String> = state
            .take_writes(t0 + ms(400))
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, ["brightness", "speed", "solidColor"]);
    }

    #[test]
    fn test_immediate_edits_skip_the_debouncer() {
        let t0 = Instant::now();
        let mut state = panel();

        state.edit(t0, |r| r.toggle("power")).unwrap();
        state.edit(t0, |r| r.select_next("effect")).unwrap();

        let writes = state.take_writes(t0);
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].value, FieldValue::Boolean(true));
        assert_eq!(writes[1].value, FieldValue::Select(1));
        assert_eq!(state.field("power").unwrap().value, Some(json!(1)));
    }

    #[test]
    fn test_remote_updates_never_queue_writes() {
        let t0 = Instant::now();
        let mut state = panel();

        let shown = state.apply_values([
            ("brightness", &json!(42)),
            ("solidColor", &json!(0x00FF00)),
            ("ghost", &json!(1)),
        ]);

        assert_eq!(shown, 2);
        assert!(!state.has_pending_writes());
        assert!(state.take_writes(t0 + ms(10_000)).is_empty());
        assert_eq!(
            state.registry().value("solidColor"),
            Some(FieldValue::Color(Rgb::new(0, 255, 0)))
        );
        assert_eq!(state.field("brightness").unwrap().value, Some(json!(42)));
    }

    #[test]
    fn test_remote_update_during_drag_keeps_pending_write() {
        let t0 = Instant::now();
        let mut state = panel();

        state.edit(t0, |r| r.set_number("brightness", 200)).unwrap();
        state.apply_update("brightness", &json!(10));

        // The pending local value still goes out
        let writes = state.take_writes(t0 + ms(300));
        assert_eq!(writes[0].value, FieldValue::Number(200));
    }

    #[test]
    fn test_write_status_messages() {
        let t0 = Instant::now();
        let mut state = panel();
        let write = WriteRequest {
            name: "brightness".into(),
            value: FieldValue::Number(80),
        };

        state.on_write_started(&write, t0);
        assert_eq!(state.status(t0), Some("Set brightness: 80, please wait..."));

        state.on_write_succeeded(&write, Some(&json!({"brightness": 80})), t0);
        assert_eq!(state.status(t0), Some(r#"success setting {"brightness":80}"#));
        assert_eq!(state.status(t0 + ms(3000)), None);

        let color = WriteRequest {
            name: "solidColor".into(),
            value: FieldValue::Color(Rgb::new(1, 2, 3)),
        };
        state.on_write_failed(&color, t0);
        assert_eq!(state.status(t0 + ms(60_000)), Some("Error sending the Color!"));
    }

    #[test]
    fn test_next_deadline_covers_all_timers() {
        let t0 = Instant::now();
        let mut state = panel();
        assert_eq!(state.next_deadline(t0), None);

        state.on_link_open(t0);
        state.edit(t0, |r| r.set_number("speed", 3)).unwrap();
        assert_eq!(state.next_deadline(t0), Some(t0 + ms(300)));

        state.take_writes(t0 + ms(300));
        assert_eq!(state.next_deadline(t0 + ms(300)), Some(t0 + ms(1801)));
        assert_eq!(state.link_state(t0 + ms(1801)), LinkState::Stale);
    }

    #[test]
    fn test_section_navigation() {
        let mut state = panel();
        assert_eq!(state.visible_fields(), ["power", "brightness", "speed", "effect"]);

        state.next_section();
        assert_eq!(state.visible_fields(), ["power", "solidColor"]);

        state.set_section_mode(SectionMode::Accordion);
        assert_eq!(state.visible_fields().len(), 7);
    }
}
