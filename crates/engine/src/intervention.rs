//! Intervention queue — live user input spliced between participant turns.
//!
//! A non-blocking, multi-producer/single-consumer FIFO. Producers enqueue
//! free text at any time; the orchestrator drains the queue once per
//! participant turn. An intervention enqueued during participant *k*'s
//! turn is invisible to *k* but guaranteed visible to participant *k+1*
//! (or the next round's first participant).

use tokio::sync::mpsc;

/// Create a linked sender/queue pair for one debate.
pub fn intervention_channel() -> (InterventionSender, InterventionQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InterventionSender { tx }, InterventionQueue { rx })
}

/// The producer half — cheap to clone, usable from any task.
#[derive(Clone)]
pub struct InterventionSender {
    tx: mpsc::UnboundedSender<String>,
}

impl InterventionSender {
    /// Enqueue an intervention. Returns `false` if the debate is gone.
    pub fn submit(&self, text: impl Into<String>) -> bool {
        self.tx.send(text.into()).is_ok()
    }
}

/// The consumer half, owned by the orchestrator.
pub struct InterventionQueue {
    rx: mpsc::UnboundedReceiver<String>,
}

impl InterventionQueue {
    /// Drain everything currently queued, in FIFO order. Never blocks.
    pub fn drain(&mut self) -> Vec<String> {
        let mut drained = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            drained.push(text);
        }
        drained
    }
}
