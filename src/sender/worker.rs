//! Loop draining the delivery queue one item at a time.
//!
//! The loop alternates between two states. While idle it polls the queue,
//! sleeping `poll_interval` whenever it is empty. Once an item is popped it
//! stays with that item until the transport reports success, so a host that
//! never accepts the request blocks everything queued behind it. A
//! [`RetryPolicy`](super::RetryPolicy) cap turns that stall into a
//! dead-letter hand-off instead.
//!
//! Every sleep waits on the stop channel, and the channel is checked again
//! before each dequeue, so shutdown is observed at each poll, retry and
//! delivery boundary even while a backlog is draining.

use std::{ops::ControlFlow, sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use log::{debug, error, info, warn};

use crate::queue::DeliveryQueue;

use super::{backoff::BackoffState, config::SenderConfig, transport::Transport};

pub(super) struct Worker<T> {
    queue: Arc<DeliveryQueue>,
    transport: T,
    config: SenderConfig,
    backoff: BackoffState,
    stop: Receiver<()>,
}

impl<T: Transport> Worker<T> {
    pub(super) fn new(
        queue: Arc<DeliveryQueue>,
        transport: T,
        config: SenderConfig,
        stop: Receiver<()>,
    ) -> Self {
        let backoff = BackoffState::new(config.backoff.clone());
        Self {
            queue,
            transport,
            config,
            backoff,
            stop,
        }
    }

    pub(super) fn run(mut self) {
        debug!("sender loop started");
        loop {
            if self.stop_requested() {
                break;
            }
            let flow = match self.queue.try_dequeue() {
                Some(uri) => self.deliver(uri),
                None => self.pause(self.config.poll_interval),
            };
            if flow.is_break() {
                break;
            }
        }
        debug!("sender loop stopped with {} items waiting", self.queue.waiting());
    }

    /// Send `uri` until it succeeds, is dead-lettered, or shutdown interrupts.
    fn deliver(&mut self, uri: String) -> ControlFlow<()> {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            let err = match self.transport.get(&uri) {
                Ok(()) => {
                    info!("sent {uri}");
                    self.backoff.record_success();
                    return ControlFlow::Continue(());
                }
                Err(err) => err,
            };
            warn!("failed to send {uri} (attempt {attempts}): {err}");

            if self.config.retry.exhausted(attempts) {
                error!("giving up on {uri} after {attempts} attempts: {err}");
                if let Some(hook) = &self.config.dead_letter {
                    hook.call(&uri, &err);
                }
                self.backoff.record_success();
                return ControlFlow::Continue(());
            }

            let delay = self.backoff.next_delay(err.is_rate_limited());
            if self.pause(delay).is_break() {
                self.queue.requeue_front(uri);
                return ControlFlow::Break(());
            }
        }
    }

    fn stop_requested(&self) -> bool {
        !matches!(self.stop.try_recv(), Err(TryRecvError::Empty))
    }

    /// Sleep for `delay`, waking early when a stop is requested.
    fn pause(&self, delay: Duration) -> ControlFlow<()> {
        match self.stop.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => ControlFlow::Continue(()),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => ControlFlow::Break(()),
        }
    }
}
