//! Mailbox access for the relay.
//!
//! The [`MailGateway`] trait is the capability seam the core components
//! poll and send through. Production deployments use the Microsoft Graph
//! implementation; tests use the in-memory gateway.

pub mod error;
pub mod gateway;
pub mod graph;
pub mod html;
pub mod memory;

pub use {
    error::{Error, Result},
    gateway::{MailGateway, MailMessage, SearchFilter},
    graph::GraphMailGateway,
    memory::{MemoryMailGateway, OutboundMail},
};
