//! Owner of a running sender thread.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Sender, bounded};
use log::warn;

use crate::queue::DeliveryQueue;

use super::{config::SenderConfig, transport::Transport, worker::Worker};

/// Start a sender loop draining `queue` on a background thread.
///
/// Each call starts an independent loop. Two loops sharing a queue compete
/// for items and no longer deliver in submission order, so start one per
/// queue. The loop runs until the returned handle is dropped or shut down.
#[must_use = "dropping the handle stops the sender"]
pub fn spawn_sender<T: Transport>(
    queue: Arc<DeliveryQueue>,
    transport: T,
    config: SenderConfig,
) -> SenderHandle {
    let (stop_tx, stop_rx) = bounded(1);
    let worker = Worker::new(queue, transport, config, stop_rx);
    let handle = thread::spawn(move || worker.run());
    SenderHandle {
        stop: Some(stop_tx),
        handle: Some(handle),
    }
}

/// Handle controlling a sender loop started by [`spawn_sender`].
///
/// Dropping the handle stops the loop and waits for the thread. A request
/// already on the wire is allowed to finish; an item waiting to be retried
/// is returned to the head of the queue. Keep the handle alive for as long
/// as the loop should run, typically the lifetime of the process.
#[must_use = "dropping the handle stops the sender"]
pub struct SenderHandle {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SenderHandle {
    /// Stop the loop and wait for the thread to exit.
    pub fn shutdown(&mut self) {
        self.request_stop();
        self.join_worker();
    }

    /// Whether the loop thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn request_stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.try_send(());
        }
    }

    fn join_worker(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("sender thread panicked");
        }
    }
}

impl Drop for SenderHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderHandle")
            .field("running", &!self.is_finished())
            .finish()
    }
}
