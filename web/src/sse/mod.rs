//! Event-stream HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the stream endpoint.
//! Taking messages off the relay queue and framing them is the job of the
//! `relay` crate's `StreamPump`; the handler just connects a pump to the
//! response body and ties the session's lifetime to the connection.

pub mod handler;
