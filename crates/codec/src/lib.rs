//! Frame codec for the satellite reply channel.
//!
//! The channel only carries short plain-text messages, so binary payloads
//! are base64-encoded, split into bounded chunks, and wrapped in a
//! self-describing three-line wire format that survives out-of-order
//! store-and-forward delivery.

pub mod error;
pub mod frame;

pub use {
    error::{Error, Result},
    frame::{Frame, decode, encode, unwrap, wrap},
};
