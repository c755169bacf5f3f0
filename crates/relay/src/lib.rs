//! Frame delivery to the device reply channel.
//!
//! The reply channel is fire-and-forget HTTP: the device network accepts a
//! form post per short text message and gives back only an HTTP status.
//! [`RelayDispatcher`] paces an ordered frame sequence through a
//! [`ReplyTransport`] and reports a per-frame outcome.

pub mod dispatcher;
pub mod error;
pub mod transport;

pub use {
    dispatcher::{DeliveryOutcome, FailurePolicy, RelayDispatcher, extract_token},
    error::{Error, Result},
    transport::{GarminReplyTransport, ReplyForm, ReplyTransport, TransportReply},
};
