//! Form state of the terminal UI on top of a [`Session`].

use tracing::warn;

use ledpanel_client::session::now;
use ledpanel_client::Session;
use ledpanel_core::{Channel, Control, ControlRegistry, Edit, PanelState, RegistryError};

use crate::input::Action;

/// Fields the cursor can land on, in display order.
pub fn selectable_fields(state: &PanelState) -> Vec<&str> {
    state
        .visible_fields()
        .into_iter()
        .filter(|name| {
            state
                .registry()
                .get(name)
                .is_some_and(|h| h.control.field_type().is_editable())
        })
        .collect()
}

/// New channel value after moving it by `delta`.
pub fn nudge_channel(value: u8, delta: i64) -> u8 {
    (i64::from(value) + delta).clamp(0, 255) as u8
}

pub struct App {
    session: Session,
    host: String,
    focus: Option<String>,
    channel: Channel,
}

impl App {
    pub fn new(session: Session, host: impl Into<String>) -> Self {
        let mut app = Self {
            session,
            host: host.into(),
            focus: None,
            channel: Channel::Red,
        };
        app.keep_focus_visible();
        app
    }

    pub fn state(&self) -> &PanelState {
        self.session.state()
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Apply a key action. Returns false when the app should quit.
    pub fn handle(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::Up => self.move_focus(-1),
            Action::Down => self.move_focus(1),
            Action::NextSection => {
                self.session.state_mut().next_section();
                self.focus = None;
            }
            Action::PreviousSection => {
                self.session.state_mut().previous_section();
                self.focus = None;
            }
            Action::SelectSection(index) => {
                self.session.state_mut().select_section(index);
                self.focus = None;
            }
            Action::PickChannel(channel) => self.channel = channel,
            Action::Adjust(steps) => self.adjust(steps),
            Action::Activate => self.activate(),
        }
        self.keep_focus_visible();
        true
    }

    /// Refocus after the visible set changed.
    pub fn keep_focus_visible(&mut self) {
        let state = self.session.state();
        let selectable = selectable_fields(state);
        let still_visible = self
            .focus
            .as_deref()
            .is_some_and(|f| selectable.contains(&f));
        if !still_visible {
            self.focus = selectable.first().map(|s| s.to_string());
        }
    }

    fn move_focus(&mut self, delta: isize) {
        let selectable = selectable_fields(self.session.state());
        if selectable.is_empty() {
            self.focus = None;
            return;
        }
        let current = self
            .focus
            .as_deref()
            .and_then(|f| selectable.iter().position(|s| *s == f))
            .unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(selectable.len() - 1);
        self.focus = Some(selectable[next].to_string());
    }

    fn focused_control(&self) -> Option<(String, Control)> {
        let name = self.focus.clone()?;
        let control = self.session.state().registry().get(&name)?.control.clone();
        Some((name, control))
    }

    fn adjust(&mut self, steps: i64) {
        let Some((name, control)) = self.focused_control() else {
            return;
        };
        let channel = self.channel;
        match control {
            Control::Number(_) => self.run_edit(|r| r.nudge_number(&name, steps)),
            Control::Boolean(_) => self.run_edit(|r| r.toggle(&name)),
            Control::Select(_) if steps < 0 => self.run_edit(|r| r.select_previous(&name)),
            Control::Select(_) => self.run_edit(|r| r.select_next(&name)),
            Control::Color(c) => {
                let value = nudge_channel(c.rgb.channel(channel), steps);
                self.run_edit(|r| r.set_color_channel(&name, channel, value))
            }
            Control::Title | Control::Section => {}
        }
    }

    fn activate(&mut self) {
        let Some((name, control)) = self.focused_control() else {
            return;
        };
        match control {
            Control::Color(_) => {
                // cycle the channel the arrows edit
                let index = Channel::ALL.iter().position(|c| *c == self.channel).unwrap_or(0);
                self.channel = Channel::ALL[(index + 1) % Channel::ALL.len()];
            }
            Control::Number(_) => self.run_edit(|r| r.nudge_number(&name, 1)),
            Control::Select(_) => self.run_edit(|r| r.select_next(&name)),
            Control::Boolean(_) => self.run_edit(|r| r.toggle(&name)),
            Control::Title | Control::Section => {}
        }
    }

    fn run_edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut ControlRegistry) -> Result<Edit, RegistryError>,
    {
        if let Err(e) = self.session.edit(f) {
            warn!(error = %e, "Edit rejected");
            self.session.state_mut().set_status(e.to_string(), false, now());
        }
    }
}
