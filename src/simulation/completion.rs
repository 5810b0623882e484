//! One-shot completion handle
//!
//! A `Fulfiller`/`Waiter` pair over a single-slot channel. The fulfiller is
//! consumed when it fires, so a handle can be completed at most once, and the
//! waiter is consumed when it waits, so it is observed at most once.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};

pub struct Completion;

impl Completion {
    /// Create a connected fulfiller and waiter
    pub fn pair() -> (Fulfiller, Waiter) {
        let (tx, rx) = bounded::<()>(1);
        (Fulfiller { tx }, Waiter { rx })
    }
}

/// The producing half. Dropping it unfulfilled abandons the handle.
#[derive(Debug)]
pub struct Fulfiller {
    tx: Sender<()>,
}

impl Fulfiller {
    pub fn fulfill(self) {
        // A waiter that already went away has nothing left to wake
        let _ = self.tx.send(());
    }
}

/// The consuming half
#[derive(Debug)]
pub struct Waiter {
    rx: Receiver<()>,
}

impl Waiter {
    /// Block until the fulfiller fires. Fails if it was dropped instead.
    pub fn wait(self) -> Result<()> {
        self.rx
            .recv()
            .context("Completion abandoned before it was fulfilled")
    }

    pub fn is_fulfilled(&self) -> bool {
        !self.rx.is_empty()
    }
}
