//! HTTP client for upstream calls.
//!
//! Requests either buffer and decode the body into [`Content`], or, for
//! `text/event-stream` responses, hand back a [`FrameStream`] of
//! newline-delimited frames fed by a background reader.

mod agent;
mod client;
mod content;
mod error;
mod frame;
mod params;
mod stream;

pub use agent::{os_arch, os_name, user_agent};
pub use client::{
    HttpClient, Payload, RequestSpec, ResponseBody, UpstreamResponse, DEFAULT_GET_TIMEOUT,
    DEFAULT_POST_TIMEOUT,
};
pub use content::{Content, ContentKind};
pub use error::{HttpError, BODY_READ_FAILURE, TRANSPORT_FAILURE};
pub use frame::{FrameReassembler, DEFAULT_MAX_FRAME, DEFAULT_MAX_READ};
pub use params::{ParamValue, QueryParams};
pub use stream::{FrameStream, StreamEvent, StreamOptions, DEFAULT_STREAM_IDLE_TIMEOUT};

pub use reqwest::Method;
