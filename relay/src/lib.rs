//! Message relay core: a bounded hand-off queue between webhook producers and
//! streaming consumers.
//!
//! # Architecture
//!
//! - **Relay queue**: one bounded FIFO buffer shared by every producer and
//!   consumer for the lifetime of the server. Offers wait for room up to a
//!   timeout, takes wait for a message indefinitely.
//! - **Submission gate**: the producer-facing entry point. Offers a message
//!   under a fixed grace period and reports `Success` or `Busy`.
//! - **Stream pump**: one per open stream. Races the session's cancellation
//!   token against the next take and writes each message it wins as a
//!   `data: <message>\n\n` frame.
//! - **Competing consumers**: every accepted message goes to exactly one
//!   pump, whichever is waiting first. There is no broadcast.
//!
//! # Message Flow
//!
//! 1. A producer posts a message; the web layer hands it to the gate
//! 2. The gate offers it to the queue, waiting while the queue is full
//! 3. A pump blocked in `take` receives it and writes it to its destination
//! 4. When the consumer disconnects the session token is cancelled and the
//!    pump stops without taking anything else
//!
//! # Modules
//!
//! - `queue`: `RelayQueue` with `offer`/`take`
//! - `gate`: `SubmissionGate` applying the submission timeout
//! - `pump`: `StreamPump` and the `Destination` it writes to
//! - `session`: `StreamSession` and the `SessionRegistry` of open streams
//! - `message`: the opaque `Message` payload and its wire framing

pub mod error;
pub mod gate;
pub mod message;
pub mod pump;
pub mod queue;
pub mod session;

pub use gate::{Submission, SubmissionGate};
pub use message::{frame, Message};
pub use pump::{ChannelDestination, Destination, StreamPump};
pub use queue::{Offer, RelayQueue};
pub use session::{SessionId, SessionRegistry, StreamSession};
