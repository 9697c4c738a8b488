//! Gate closure windows, wait advice, traffic outlook and alerts derived
//! from the train list and the local time of day.

use chrono::{Duration, NaiveTime, Timelike};
use serde::Serialize;

use crate::models::{Train, TrainStatus};

/// Minutes the gate closes ahead of a train's arrival.
pub const CLOSURE_LEAD_MINUTES: u32 = 5;

/// Closures longer than this are flagged as long.
const LONG_CLOSURE_MINUTES: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureWindow {
    pub train_number: String,
    pub closure_start: String,
    pub closure_end: String,
    pub duration_minutes: u32,
    pub platform: String,
    /// Minutes from `now` until the gate closes; absent once it has started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes_until_closure: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub priority: AlertPriority,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub train_number: Option<String>,
}

/// Road traffic around the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficIntensity {
    Low,
    Medium,
    High,
}

impl TrafficIntensity {
    pub fn label(&self) -> &'static str {
        match self {
            TrafficIntensity::Low => "low",
            TrafficIntensity::Medium => "medium",
            TrafficIntensity::High => "high",
        }
    }
}

/// Rush hours, as published on the dashboard.
pub const PEAK_HOURS: [&str; 2] = ["08:00-09:30", "17:30-19:00"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficOutlook {
    pub time: String,
    pub intensity: TrafficIntensity,
    pub next_hour_intensity: TrafficIntensity,
    pub peak_hours: [&'static str; 2],
    pub recommended_window: &'static str,
}

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Closure windows for every train with a parseable arrival time, sorted by
/// closure start.
pub fn closure_schedule(trains: &[Train], now: NaiveTime) -> Vec<ClosureWindow> {
    let mut windows: Vec<(NaiveTime, ClosureWindow)> = trains
        .iter()
        .filter_map(|train| {
            let arrival = parse_hhmm(&train.arrival_time)?;
            let start = arrival - Duration::minutes(CLOSURE_LEAD_MINUTES as i64);
            let end = arrival + Duration::minutes(train.crossing_duration as i64);
            let duration = train.crossing_duration + CLOSURE_LEAD_MINUTES;

            let minutes_until = minutes_between(now, start);
            Some((
                start,
                ClosureWindow {
                    train_number: train.train_number.clone(),
                    closure_start: format_hhmm(start),
                    closure_end: format_hhmm(end),
                    duration_minutes: duration,
                    platform: train.platform.clone(),
                    minutes_until_closure: minutes_until,
                    recommended_action: minutes_until
                        .map(|until| wait_recommendation(until, duration)),
                },
            ))
        })
        .collect();

    windows.sort_by_key(|(start, _)| *start);
    windows.into_iter().map(|(_, w)| w).collect()
}

/// Whole minutes from `now` until `then` on the same day, if `then` is later.
fn minutes_between(now: NaiveTime, then: NaiveTime) -> Option<u32> {
    let now = now.with_second(0).unwrap_or(now).with_nanosecond(0).unwrap_or(now);
    if then > now {
        Some((then - now).num_minutes() as u32)
    } else {
        None
    }
}

pub fn wait_recommendation(minutes_until: u32, duration: u32) -> &'static str {
    if minutes_until <= 2 {
        "STOP - Gate closing very soon"
    } else if minutes_until <= 5 {
        "CAUTION - Consider alternative route"
    } else if duration > LONG_CLOSURE_MINUTES {
        "PLAN - Long closure expected, use alternative route"
    } else {
        "PROCEED - Sufficient time to cross"
    }
}

/// Traffic intensity for an hour of the day. Hours past 23 read as low.
pub fn traffic_intensity(hour: u32) -> TrafficIntensity {
    match hour {
        7..=9 | 17..=19 => TrafficIntensity::High,
        10..=16 | 20..=21 => TrafficIntensity::Medium,
        _ => TrafficIntensity::Low,
    }
}

/// Best window to cross, given the current hour.
pub fn recommended_window(hour: u32) -> &'static str {
    match hour {
        0..=6 => "07:00-07:30 (Before morning rush)",
        7..=9 => "10:00-11:00 (After morning rush)",
        10..=16 => "Now - Good time to travel",
        17..=19 => "20:00-21:00 (After evening rush)",
        _ => "Now - Light traffic period",
    }
}

pub fn traffic_outlook(now: NaiveTime) -> TrafficOutlook {
    let hour = now.hour();
    TrafficOutlook {
        time: format_hhmm(now),
        intensity: traffic_intensity(hour),
        next_hour_intensity: traffic_intensity(hour + 1),
        peak_hours: PEAK_HOURS,
        recommended_window: recommended_window(hour),
    }
}

/// Alerts for delayed trains, long closures and rush-hour traffic.
///
/// Train records carry no delay amount, so every delayed train raises a
/// delay alert.
pub fn alerts(trains: &[Train], now: NaiveTime) -> Vec<Alert> {
    let mut out: Vec<Alert> = trains
        .iter()
        .filter(|t| t.status == TrainStatus::Delayed)
        .map(|t| Alert {
            kind: "delay_alert",
            priority: AlertPriority::High,
            message: format!("Train {} is running late", t.train_number),
            train_number: Some(t.train_number.clone()),
        })
        .collect();

    for train in trains {
        let duration = train.crossing_duration + CLOSURE_LEAD_MINUTES;
        if duration > LONG_CLOSURE_MINUTES {
            out.push(Alert {
                kind: "long_closure_alert",
                priority: AlertPriority::Medium,
                message: format!(
                    "Extended gate closure expected: {} minutes for {}",
                    duration, train.train_number
                ),
                train_number: Some(train.train_number.clone()),
            });
        }
    }

    if traffic_intensity(now.hour()) == TrafficIntensity::High {
        out.push(Alert {
            kind: "traffic_alert",
            priority: AlertPriority::Medium,
            message: "High traffic intensity detected. Consider alternative routes.".to_string(),
            train_number: None,
        });
    }

    out
}

/// Mean time a commuter caught by a closure waits, in minutes.
pub fn average_wait_minutes(trains: &[Train]) -> u32 {
    if trains.is_empty() {
        return 0;
    }
    let total: u32 = trains
        .iter()
        .map(|t| t.crossing_duration + CLOSURE_LEAD_MINUTES)
        .sum();
    (total as f64 / trains.len() as f64).round() as u32
}
