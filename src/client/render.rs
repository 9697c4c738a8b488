//! Turning local state into what the dashboard shows.
//!
//! [`render`] is a pure function of the state and the current time; painting
//! is a separate step behind [`RenderSink`].

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::models::{GateState, TrainStatus};

use super::agent::LocalState;

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub gate: Option<GateView>,
    pub trains: Vec<TrainRow>,
    pub feed: Vec<FeedLine>,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateView {
    pub location: String,
    pub status: GateState,
    pub headline: &'static str,
    pub updated: String,
    pub next_opening: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainRow {
    pub number: String,
    pub route: String,
    pub arrival: String,
    pub gate_closure: String,
    pub duration: String,
    pub status: TrainStatus,
    pub status_label: &'static str,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedLine {
    pub icon: String,
    pub title: String,
    pub message: String,
    pub time_label: String,
    pub just_arrived: bool,
}

/// Receives every freshly rendered view.
pub trait RenderSink: Send {
    fn paint(&mut self, view: &View);
}

pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{} min ago", minutes)
    } else {
        format!("{} h ago", minutes / 60)
    }
}

pub fn render(state: &LocalState, now: DateTime<Utc>) -> View {
    let gate = state.gate.as_ref().map(|gate| GateView {
        location: gate.location.clone(),
        status: gate.status,
        headline: match gate.status {
            GateState::Open => "Gate is OPEN - safe to cross",
            GateState::Closed => "Gate is CLOSED - train crossing",
        },
        updated: relative_time(gate.last_updated, now),
        next_opening: gate.next_opening.clone(),
    });

    let trains = state
        .trains
        .iter()
        .map(|t| TrainRow {
            number: t.train_number.clone(),
            route: t.route.clone(),
            arrival: t.arrival_time.clone(),
            gate_closure: t.gate_closure_time.clone(),
            duration: format!("{} min", t.crossing_duration),
            status: t.status,
            status_label: t.status.label(),
            platform: t.platform.clone(),
        })
        .collect();

    let feed = state
        .feed
        .iter()
        .map(|e| FeedLine {
            icon: e.icon.clone(),
            title: e.title.clone(),
            message: e.message.clone(),
            time_label: relative_time(e.created_at, now),
            just_arrived: e.just_arrived,
        })
        .collect();

    View {
        gate,
        trains,
        feed,
        notice: state.notice.clone(),
    }
}

/// Write a view as plain text.
pub fn write_view<W: Write>(view: &View, out: &mut W) -> std::io::Result<()> {
    if let Some(notice) = &view.notice {
        writeln!(out, "!! {}", notice)?;
    }

    match &view.gate {
        Some(gate) => {
            writeln!(out, "{} ({})", gate.headline, gate.location)?;
            write!(out, "   updated {}", gate.updated)?;
            if let Some(next) = &gate.next_opening {
                write!(out, ", next opening {}", next)?;
            }
            writeln!(out)?;
        }
        None => writeln!(out, "Waiting for gate status...")?,
    }

    writeln!(out)?;
    for row in &view.trains {
        writeln!(
            out,
            "{:<10} {:<26} arr {}  gate {}  {:>6}  pf {}  {}",
            row.number,
            row.route,
            row.arrival,
            row.gate_closure,
            row.duration,
            row.platform,
            row.status_label
        )?;
    }

    writeln!(out)?;
    for line in &view.feed {
        let marker = if line.just_arrived { "*" } else { " " };
        writeln!(
            out,
            "{} [{}] {} - {} ({})",
            marker, line.icon, line.title, line.message, line.time_label
        )?;
    }
    out.flush()
}

/// Paints views to a writer, typically stdout.
pub struct TerminalSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> RenderSink for TerminalSink<W> {
    fn paint(&mut self, view: &View) {
        // Clear screen and home the cursor before each frame.
        let painted =
            write!(self.out, "\x1b[2J\x1b[H").and_then(|_| write_view(view, &mut self.out));
        if let Err(e) = painted {
            tracing::warn!("Failed to paint dashboard: {}", e);
        }
    }
}
