//! Async driver for a [`SyncAgent`].
//!
//! One task owns the agent. The push channel, the poll timer and visibility
//! changes are multiplexed with `select!`, so each input is fully reconciled
//! before the next is looked at.

use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use tokio::time::MissedTickBehavior;

use crate::error::SyncError;
use crate::protocol::UpdateEvent;

use super::agent::SyncAgent;
use super::render::{render, RenderSink};
use super::transport::{PushChannel, SyncTransport};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub poll_interval: Duration,
    /// Try to reopen the push channel on each poll tick.
    pub reconnect: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            reconnect: true,
        }
    }
}

fn paint<S: RenderSink>(agent: &mut SyncAgent, sink: &mut S) {
    let view = render(agent.local(), Utc::now());
    sink.paint(&view);
    agent.local_mut().feed.settle();
}

async fn next_message(
    channel: &mut Option<PushChannel>,
) -> Option<Result<UpdateEvent, SyncError>> {
    match channel.as_mut() {
        Some(channel) => channel.next().await,
        None => std::future::pending().await,
    }
}

async fn connect<T: SyncTransport>(agent: &mut SyncAgent, transport: &T) -> Option<PushChannel> {
    agent.begin_connect();
    match transport.open_channel().await {
        Ok(channel) => Some(channel),
        Err(e) => {
            agent.channel_unavailable(&e);
            None
        }
    }
}

async fn pull<T: SyncTransport>(agent: &mut SyncAgent, transport: &T) {
    match transport.pull_snapshot().await {
        Ok(snapshot) => agent.apply_poll(snapshot),
        Err(e) => agent.poll_failed(&e),
    }
}

/// Open the push channel, or pull and paint when it cannot be opened.
async fn first_sync<T, S>(
    agent: &mut SyncAgent,
    transport: &T,
    sink: &mut S,
) -> Option<PushChannel>
where
    T: SyncTransport,
    S: RenderSink,
{
    let channel = connect(agent, transport).await;
    if channel.is_none() {
        pull(agent, transport).await;
        paint(agent, sink);
    }
    channel
}

/// Keep `agent` in sync until `shutdown` fires or the visibility sender is
/// dropped.
pub async fn run_agent<T, S>(
    agent: &mut SyncAgent,
    transport: &T,
    options: RunOptions,
    mut visibility: watch::Receiver<bool>,
    sink: &mut S,
    mut shutdown: oneshot::Receiver<()>,
) where
    T: SyncTransport,
    S: RenderSink,
{
    let mut poll = tokio::time::interval(options.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    poll.reset();

    agent.set_visible(*visibility.borrow_and_update());
    let mut channel = None;
    if agent.is_visible() {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Sync agent stopped before the first sync");
                return;
            }
            opened = first_sync(agent, transport, sink) => channel = opened,
        }
    }

    loop {
        let polling = channel.is_none() && agent.is_visible();

        tokio::select! {
            _ = &mut shutdown => break,

            changed = visibility.changed() => {
                if changed.is_err() {
                    break;
                }
                let visible = *visibility.borrow_and_update();
                if agent.set_visible(visible) {
                    tracing::debug!("Dashboard visible again, resyncing");
                    poll.reset();
                    let reopened = if channel.is_none() && options.reconnect {
                        channel = connect(agent, transport).await;
                        channel.is_some()
                    } else {
                        false
                    };
                    // A reopened channel starts with its own snapshot.
                    if !reopened {
                        pull(agent, transport).await;
                        paint(agent, sink);
                    }
                } else if !visible {
                    tracing::debug!("Dashboard hidden, suspending updates");
                }
            }

            message = next_message(&mut channel) => match message {
                Some(Ok(event)) => {
                    if agent.apply_event(event) {
                        paint(agent, sink);
                    }
                }
                Some(Err(SyncError::Decode(e))) => {
                    tracing::warn!("Skipping malformed server message: {}", e);
                }
                Some(Err(e)) => {
                    tracing::debug!("Push channel error: {}", e);
                    channel = None;
                    agent.channel_lost();
                    poll.reset();
                }
                None => {
                    channel = None;
                    agent.channel_lost();
                    poll.reset();
                }
            },

            _ = poll.tick(), if polling => {
                if options.reconnect {
                    channel = connect(agent, transport).await;
                    if channel.is_some() {
                        continue;
                    }
                }
                pull(agent, transport).await;
                paint(agent, sink);
            }
        }
    }

    tracing::info!("Sync agent stopped");
}
