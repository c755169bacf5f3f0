//! Correlation-and-transport core.
//!
//! One [`Orchestrator`] invocation processes at most one inbound device
//! request: parse → issue the downstream query → poll for the correlated
//! reply → encode the payload into frames → deliver → commit idempotency.
//! Invocations are periodic and independent; no failure escapes one.

pub mod chat;
pub mod error;
pub mod orchestrator;
pub mod parse;
pub mod poller;
pub mod tracker;

pub use {
    chat::ChatResponder,
    error::{Error, Result},
    orchestrator::{FailureCategory, Orchestrator, RunOutcome},
    parse::{InboundRequest, ParseError, RequestKind},
    poller::{CorrelationPoller, PollOutcome},
    tracker::{HandledLogTracker, IdempotencyTracker, MailboxFlagTracker},
};
