//! Authenticating SSE relay.
//!
//! Clients log in for a code/token pair, then call the chat-completions
//! endpoint with `Authorization: {idx}-{token}`. Verified requests are
//! normalized and forwarded upstream, and the upstream event stream is relayed
//! frame by frame.

pub mod body;
pub mod bridge;
pub mod client_addr;
pub mod completion;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod upstream;

pub use bridge::{BridgeSession, BridgeState};
pub use client_addr::ClientAddr;
pub use completion::{normalize, Completion};
pub use config::RelayConfig;
pub use envelope::ErrorEnvelope;
pub use error::BridgeError;
pub use models::{KnownModels, ModelEntry};
pub use server::{AppState, RelayServer};
pub use upstream::OpenAiUpstream;
