//! WebSocket server and turn relay
//!
//! One logical session per connected client: the socket handler receives
//! client events, the [`relay::TurnOrchestrator`] drives a turn through
//! validation, streaming, persistence, and enrichment, and every outbound
//! event goes through an [`relay::EventSink`] so the relay never touches the
//! socket directly.

pub mod health;
pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod relay;
pub mod state;
pub mod ws;

pub use health::HealthMonitor;
pub use http::create_router;
pub use metrics::init_metrics;
pub use relay::{ChannelSink, EventSink, TurnOrchestrator};
pub use state::AppState;
