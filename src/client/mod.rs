//! Dashboard client: keeps a local copy of server state fresh and renders it.

pub mod agent;
pub mod feed;
pub mod render;
pub mod runner;
pub mod session;
pub mod transport;

pub use agent::{LocalState, SyncAgent, SyncMode, SyncState};
pub use feed::{Feed, FeedEntry, FEED_CAPACITY};
pub use render::{render, RenderSink, TerminalSink, View};
pub use runner::{run_agent, RunOptions};
pub use session::{Session, SessionStore};
pub use transport::{HttpTransport, PushChannel, SyncTransport};
