//! This module holds typed parameters for various endpoint inputs.
//!
//! By decoding request bodies into typed parameters, handlers only ever see
//! inputs that have already been checked for shape, and every decode failure
//! is reported through the same `Error` path.

pub(crate) mod webhook;
