//! Drawing of the settings form.

use std::time::Instant;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use ratatui::Frame;

use ledpanel_client::session::now;
use ledpanel_core::registry::NumberControl;
use ledpanel_core::{Channel, Control, LinkState, PanelState, SectionMode};

use crate::app::App;

const LABEL_WIDTH: usize = 22;
const GAUGE_WIDTH: usize = 24;

/// Plain text form of a control's value, used by `dump` as well.
pub fn value_text(control: &Control) -> String {
    match control {
        Control::Number(c) => c.value.to_string(),
        Control::Boolean(c) => (if c.on { "On" } else { "Off" }).to_string(),
        Control::Select(c) => match c.selected_label() {
            Some(label) => label.to_string(),
            None => c.selected.to_string(),
        },
        Control::Color(c) => format!("{} ({})", c.rgb, c.rgb.to_hex()),
        Control::Title | Control::Section => String::new(),
    }
}

fn gauge(c: &NumberControl) -> String {
    let span = (i128::from(c.max) - i128::from(c.min)).max(1);
    let offset = (i128::from(c.value) - i128::from(c.min)).clamp(0, span);
    let filled = usize::try_from(offset * GAUGE_WIDTH as i128 / span)
        .unwrap_or(GAUGE_WIDTH)
        .min(GAUGE_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(GAUGE_WIDTH - filled))
}

fn link_badge(state: LinkState) -> Span<'static> {
    let color = match state {
        LinkState::Alive => Color::Green,
        LinkState::Stale => Color::DarkGray,
        LinkState::Dead => Color::Red,
    };
    Span::styled(format!("● {}", state.label()), Style::default().fg(color))
}

pub fn draw_loading(f: &mut Frame, message: &str) {
    let block = Block::default().borders(Borders::ALL).title(" ledpanel ");
    f.render_widget(Paragraph::new(message.to_string()).block(block), f.size());
}

pub fn draw(f: &mut Frame, app: &App) {
    let now = now();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.size());

    draw_header(f, chunks[0], app, now);
    draw_sections(f, chunks[1], app.state());
    draw_fields(f, chunks[2], app);
    draw_status(f, chunks[3], app.state(), now);

    let hints =
        "↑/↓ field  ←/→ adjust  Shift faster  Space toggle  r/g/b channel  Tab/1-9 section  q quit";
    f.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        chunks[4],
    );
}

fn draw_header(f: &mut Frame, area: Rect, app: &App, now: Instant) {
    let line = Line::from(vec![
        Span::styled("LED panel ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(app.host().to_string()),
        Span::raw("   "),
        link_badge(app.state().link_state(now)),
    ]);
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn draw_sections(f: &mut Frame, area: Rect, state: &PanelState) {
    let block = Block::default().borders(Borders::ALL).title(" Sections ");
    match state.section_mode() {
        SectionMode::Navigation => {
            let titles: Vec<Line> = state
                .layout()
                .sections()
                .iter()
                .map(|s| Line::from(s.label.clone()))
                .collect();
            let tabs = Tabs::new(titles)
                .block(block)
                .select(state.navigation().selected())
                .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            f.render_widget(tabs, area);
        }
        SectionMode::Accordion => {
            f.render_widget(Paragraph::new("all sections open").block(block), area);
        }
    }
}

fn control_spans(control: &Control, focused: bool, channel: Channel) -> Vec<Span<'static>> {
    match control {
        Control::Number(c) => vec![
            Span::styled(gauge(c), Style::default().fg(Color::Cyan)),
            Span::raw(format!(" {}", c.value)),
        ],
        Control::Boolean(c) => {
            let on = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
            let off = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
            let dim = Style::default().fg(Color::DarkGray);
            if c.on {
                vec![Span::styled("[On]", on), Span::styled(" Off ", dim)]
            } else {
                vec![Span::styled(" On ", dim), Span::styled("[Off]", off)]
            }
        }
        Control::Select(c) => {
            let label = c
                .selected_label()
                .map(str::to_string)
                .unwrap_or_else(|| c.selected.to_string());
            vec![Span::raw(format!("< {label} >"))]
        }
        Control::Color(c) => {
            let mut spans: Vec<Span> = Channel::ALL
                .iter()
                .map(|ch| {
                    let text = format!("{}:{:>3} ", ch.key().to_uppercase(), c.rgb.channel(*ch));
                    if focused && *ch == channel {
                        Span::styled(text, Style::default().add_modifier(Modifier::REVERSED))
                    } else {
                        Span::raw(text)
                    }
                })
                .collect();
            spans.push(Span::styled(
                "      ",
                Style::default().bg(Color::Rgb(c.rgb.r, c.rgb.g, c.rgb.b)),
            ));
            spans.push(Span::raw(format!(" {}", c.rgb.to_hex())));
            spans
        }
        Control::Title | Control::Section => Vec::new(),
    }
}

fn draw_fields(f: &mut Frame, area: Rect, app: &App) {
    let state = app.state();
    let mut lines: Vec<Line> = Vec::new();
    let mut focus_line = 0;

    for name in state.visible_fields() {
        let Some(handle) = state.registry().get(name) else {
            continue;
        };
        match &handle.control {
            Control::Section => {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    handle.label.clone(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                )));
            }
            Control::Title => {
                lines.push(Line::from(Span::styled(
                    handle.label.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                )));
            }
            control => {
                let focused = app.focus() == Some(name);
                if focused {
                    focus_line = lines.len();
                }
                let marker = if focused { "> " } else { "  " };
                let label_style = if focused {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                let mut spans = vec![
                    Span::raw(marker),
                    Span::styled(
                        format!("{:<width$}", handle.label, width = LABEL_WIDTH),
                        label_style,
                    ),
                ];
                spans.extend(control_spans(control, focused, app.channel()));
                lines.push(Line::from(spans));
            }
        }
    }

    // keep the focused row on screen
    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = focus_line.saturating_sub(inner_height.saturating_sub(1));

    let block = Block::default().borders(Borders::ALL).title(" Settings ");
    f.render_widget(
        Paragraph::new(lines).block(block).scroll((scroll as u16, 0)),
        area,
    );
}

fn draw_status(f: &mut Frame, area: Rect, state: &PanelState, now: Instant) {
    let text = state.status(now).unwrap_or_default().to_string();
    f.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(" Status ")),
        area,
    );
}
