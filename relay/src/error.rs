//! Error types for the `relay` crate.
use std::error::Error as StdError;
use std::fmt;

/// Errors raised by the relay core. Queue outcomes that are part of normal
/// operation (a timed-out offer, a cancelled stream) are not errors; this
/// type only covers construction mistakes and failed writes to a consumer.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: RelayErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum RelayErrorKind {
    /// A queue was requested with room for zero messages.
    InvalidCapacity,
    /// The consumer side of a stream session has gone away.
    DestinationClosed,
}

impl Error {
    pub fn invalid_capacity() -> Self {
        Self {
            source: None,
            error_kind: RelayErrorKind::InvalidCapacity,
        }
    }

    pub fn destination_closed<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            source: Some(Box::new(source)),
            error_kind: RelayErrorKind::DestinationClosed,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.error_kind {
            RelayErrorKind::InvalidCapacity => {
                write!(f, "Relay Error: queue capacity must be at least 1")
            }
            RelayErrorKind::DestinationClosed => {
                write!(f, "Relay Error: stream destination is closed")
            }
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}
