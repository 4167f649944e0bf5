use crate::error::Error;
use crate::message::frame;
use crate::queue::RelayQueue;
use crate::session::{SessionId, StreamSession};
use async_trait::async_trait;
use log::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;

/// Writable end of a stream session.
///
/// The pump calls `ready` before every take, so a destination that cannot
/// accept another frame holds the pump back without pulling a message off the
/// queue. `write_frame` resolves once the frame has been handed to the
/// connection, and fails once the consumer side is gone.
#[async_trait]
pub trait Destination: Send {
    /// Waits until the next frame can be written without further waiting.
    async fn ready(&mut self) -> Result<(), Error> {
        Ok(())
    }

    async fn write_frame(&mut self, frame: String) -> Result<(), Error>;
}

/// Destination backed by a bounded channel read by the response body.
///
/// `ready` reserves a slot in the channel, so at most one frame is ever
/// buffered between the pump and the connection.
pub struct ChannelDestination {
    sender: mpsc::Sender<String>,
    permit: Option<mpsc::OwnedPermit<String>>,
}

impl ChannelDestination {
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self {
            sender,
            permit: None,
        }
    }
}

#[async_trait]
impl Destination for ChannelDestination {
    async fn ready(&mut self) -> Result<(), Error> {
        if self.permit.is_none() {
            let permit = self
                .sender
                .clone()
                .reserve_owned()
                .await
                .map_err(Error::destination_closed)?;
            self.permit = Some(permit);
        }
        Ok(())
    }

    async fn write_frame(&mut self, frame: String) -> Result<(), Error> {
        if self.sender.is_closed() {
            self.permit = None;
            return Err(Error::destination_closed(SendError(frame)));
        }

        match self.permit.take() {
            Some(permit) => {
                let _ = permit.send(frame);
                Ok(())
            }
            None => self
                .sender
                .send(frame)
                .await
                .map_err(Error::destination_closed),
        }
    }
}

/// Why a pump stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The session's cancellation token fired.
    Cancelled,
    /// A write to the destination failed; the consumer is gone.
    DestinationClosed,
}

/// What a pump did over the lifetime of its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpSummary {
    pub session_id: SessionId,
    pub delivered: u64,
    pub reason: CloseReason,
}

/// Moves messages from the relay queue to a single stream session.
///
/// `run` consumes the pump, so a session that has closed can never be pumped
/// again.
pub struct StreamPump<D> {
    queue: Arc<RelayQueue>,
    session: StreamSession<D>,
}

impl<D: Destination> StreamPump<D> {
    pub fn new(queue: Arc<RelayQueue>, session: StreamSession<D>) -> Self {
        Self { queue, session }
    }

    /// Takes and writes messages until the session is cancelled or its
    /// destination stops accepting writes.
    ///
    /// Cancellation is checked ahead of every take, and nothing is taken
    /// until the destination is ready for it. A message that has
    /// already been taken is never put back: if the session dies while it is
    /// being written, that message is lost.
    pub async fn run(self) -> PumpSummary {
        let (session_id, cancellation, mut destination) = self.session.into_parts();
        let mut delivered = 0;

        debug!("Stream session {session_id} waiting for messages");

        let reason = loop {
            let ready = tokio::select! {
                biased;
                _ = cancellation.cancelled() => break CloseReason::Cancelled,
                ready = destination.ready() => ready,
            };

            if let Err(e) = ready {
                debug!("Stream session {session_id} destination gone before take: {e}");
                break CloseReason::DestinationClosed;
            }

            let message = tokio::select! {
                biased;
                _ = cancellation.cancelled() => break CloseReason::Cancelled,
                message = self.queue.take() => message,
            };

            trace!("Stream session {session_id} delivering: {message}");

            let written = tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    debug!("Stream session {session_id} cancelled mid-write, dropping: {message}");
                    break CloseReason::Cancelled;
                }
                written = destination.write_frame(frame(&message)) => written,
            };

            match written {
                Ok(()) => {
                    delivered += 1;
                    info!("Stream session {session_id} sent: {message}");
                }
                Err(e) => {
                    debug!("Stream session {session_id} dropped message '{message}': {e}");
                    break CloseReason::DestinationClosed;
                }
            }
        };

        info!("Stream session {session_id} closed ({reason:?}) after delivering {delivered} message(s)");

        PumpSummary {
            session_id,
            delivered,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Offer;
    use std::sync::Mutex;
    use std::time::Duration;

    const NO_WAIT: Duration = Duration::from_millis(0);

    /// Destination that records every frame written to it.
    #[derive(Clone, Default)]
    struct Recorder {
        frames: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn frames(&self) -> Vec<String> {
            self.frames.lock().unwrap().clone()
        }

        async fn wait_for(&self, count: usize) {
            while self.frames.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    }

    #[async_trait]
    impl Destination for Recorder {
        async fn write_frame(&mut self, frame: String) -> Result<(), Error> {
            self.frames.lock().unwrap().push(frame);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_writes_framed_messages_until_cancelled() {
        let queue = Arc::new(RelayQueue::new(4).unwrap());
        let recorder = Recorder::default();
        let session = StreamSession::new(recorder.clone());
        let token = session.cancellation_token();

        let pump = tokio::spawn(StreamPump::new(Arc::clone(&queue), session).run());

        assert_eq!(queue.offer("a".into(), NO_WAIT).await, Offer::Accepted);
        assert_eq!(queue.offer("b".into(), NO_WAIT).await, Offer::Accepted);
        recorder.wait_for(2).await;

        token.cancel();
        let summary = pump.await.unwrap();

        assert_eq!(summary.reason, CloseReason::Cancelled);
        assert_eq!(summary.delivered, 2);
        assert_eq!(recorder.frames(), vec!["data: a\n\n", "data: b\n\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_pump_never_takes_again() {
        let queue = Arc::new(RelayQueue::new(4).unwrap());
        let recorder = Recorder::default();
        let session = StreamSession::new(recorder.clone());
        let token = session.cancellation_token();

        let pump = tokio::spawn(StreamPump::new(Arc::clone(&queue), session).run());
        tokio::time::sleep(Duration::from_millis(10)).await;

        token.cancel();
        let summary = pump.await.unwrap();
        assert_eq!(summary.reason, CloseReason::Cancelled);

        assert_eq!(queue.offer("late".into(), NO_WAIT).await, Offer::Accepted);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(recorder.frames().is_empty());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take().await.as_str(), "late");
    }

    #[tokio::test]
    async fn pre_cancelled_session_leaves_queued_messages_alone() {
        let queue = Arc::new(RelayQueue::new(4).unwrap());
        assert_eq!(queue.offer("waiting".into(), NO_WAIT).await, Offer::Accepted);

        let recorder = Recorder::default();
        let session = StreamSession::new(recorder.clone());
        session.cancellation_token().cancel();

        let summary = StreamPump::new(Arc::clone(&queue), session).run().await;

        assert_eq!(summary.reason, CloseReason::Cancelled);
        assert_eq!(summary.delivered, 0);
        assert!(recorder.frames().is_empty());
        assert_eq!(queue.len(), 1);
    }

    /// Destination that accepts readiness but fails every write.
    struct Broken;

    #[async_trait]
    impl Destination for Broken {
        async fn write_frame(&mut self, frame: String) -> Result<(), Error> {
            Err(Error::destination_closed(mpsc::error::SendError(frame)))
        }
    }

    #[tokio::test]
    async fn closed_channel_stops_the_pump_before_it_takes_anything() {
        let queue = Arc::new(RelayQueue::new(4).unwrap());
        let (sender, receiver) = mpsc::channel::<String>(1);
        drop(receiver);

        assert_eq!(queue.offer("first".into(), NO_WAIT).await, Offer::Accepted);
        assert_eq!(queue.offer("second".into(), NO_WAIT).await, Offer::Accepted);

        let session = StreamSession::new(ChannelDestination::new(sender));
        let summary = StreamPump::new(Arc::clone(&queue), session).run().await;

        assert_eq!(summary.reason, CloseReason::DestinationClosed);
        assert_eq!(summary.delivered, 0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take().await.as_str(), "first");
    }

    #[tokio::test]
    async fn failed_write_loses_only_the_message_in_flight() {
        let queue = Arc::new(RelayQueue::new(4).unwrap());
        assert_eq!(queue.offer("lost".into(), NO_WAIT).await, Offer::Accepted);
        assert_eq!(queue.offer("kept".into(), NO_WAIT).await, Offer::Accepted);

        let summary = StreamPump::new(Arc::clone(&queue), StreamSession::new(Broken))
            .run()
            .await;

        assert_eq!(summary.reason, CloseReason::DestinationClosed);
        assert_eq!(summary.delivered, 0);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take().await.as_str(), "kept");
    }

    #[tokio::test(start_paused = true)]
    async fn unread_consumer_holds_at_most_one_message() {
        let queue = Arc::new(RelayQueue::new(4).unwrap());
        let (sender, receiver) = mpsc::channel::<String>(1);
        let session = StreamSession::new(ChannelDestination::new(sender));

        let pump = tokio::spawn(StreamPump::new(Arc::clone(&queue), session).run());

        for text in ["m1", "m2", "m3"] {
            assert_eq!(queue.offer(text.into(), NO_WAIT).await, Offer::Accepted);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        // m1 sits in the channel slot; the pump is waiting for room, not in take.
        assert_eq!(queue.len(), 2);

        drop(receiver);
        let summary = pump.await.unwrap();

        assert_eq!(summary.reason, CloseReason::DestinationClosed);
        assert_eq!(summary.delivered, 1);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.take().await.as_str(), "m2");
        assert_eq!(queue.take().await.as_str(), "m3");
    }

    #[tokio::test]
    async fn channel_destination_receives_frames() {
        let queue = Arc::new(RelayQueue::new(4).unwrap());
        let (sender, mut receiver) = mpsc::channel::<String>(1);
        let session = StreamSession::new(ChannelDestination::new(sender));
        let token = session.cancellation_token();

        let pump = tokio::spawn(StreamPump::new(Arc::clone(&queue), session).run());

        assert_eq!(queue.offer("ping".into(), NO_WAIT).await, Offer::Accepted);
        assert_eq!(receiver.recv().await.unwrap(), "data: ping\n\n");
        assert_eq!(queue.offer("pong".into(), NO_WAIT).await, Offer::Accepted);
        assert_eq!(receiver.recv().await.unwrap(), "data: pong\n\n");

        token.cancel();
        assert_eq!(pump.await.unwrap().delivered, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn competing_pumps_split_messages_without_duplicates() {
        const TOTAL: usize = 50;
        let queue = Arc::new(RelayQueue::new(8).unwrap());
        let first = Recorder::default();
        let second = Recorder::default();

        let first_session = StreamSession::new(first.clone());
        let second_session = StreamSession::new(second.clone());
        let tokens = [
            first_session.cancellation_token(),
            second_session.cancellation_token(),
        ];

        let pumps = [
            tokio::spawn(StreamPump::new(Arc::clone(&queue), first_session).run()),
            tokio::spawn(StreamPump::new(Arc::clone(&queue), second_session).run()),
        ];

        for i in 0..TOTAL {
            let message = format!("m{i}").into();
            assert_eq!(
                queue.offer(message, Duration::from_secs(5)).await,
                Offer::Accepted
            );
        }

        while first.frames().len() + second.frames().len() < TOTAL {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        for token in tokens {
            token.cancel();
        }

        let mut delivered = 0;
        for pump in pumps {
            delivered += pump.await.unwrap().delivered;
        }
        assert_eq!(delivered as usize, TOTAL);

        let mut frames = first.frames();
        frames.extend(second.frames());
        frames.sort();
        frames.dedup();
        assert_eq!(frames.len(), TOTAL);
    }
}
