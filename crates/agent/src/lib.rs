//! SSH authentication agent for the Vigil project.
//!
//! This crate implements the agent side of the SSH agent protocol: a
//! long-lived in-process service that holds private keys, answers identity
//! enumeration queries, and performs signing and challenge-response
//! operations for multiple concurrent clients over a framed byte stream.
//! Both the legacy SSH-1 RSA protocol and the modern SSH-2 protocol are
//! supported.
//!
//! # Architecture
//!
//! ```text
//! AgentListener ──accept──► per-connection driver (connection.rs)
//!                                │
//!               raw bytes ──► FrameDecoder ──► RequestHandler (handler.rs)
//!                                │                  │ consults KeyStore
//!                                └── ResponseQueue ◄┘
//!                                      │ strict FIFO egress
//!                                      ▼
//!                                  socket writes
//! ```
//!
//! Replies on a connection are always emitted in request-arrival order,
//! even when handlers complete out of order; see [`agent::queue`].

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod agent;

pub use agent::handler::{Agent, AgentCore, RequestHandler};
pub use agent::keystore::KeyStore;
pub use agent::listener::{AgentConfig, AgentListener};
