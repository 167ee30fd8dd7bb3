// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::state::TransferState;
use crate::error::Result;

/// Single writer of one transfer's [`TransferState`].
///
/// Updates go through `send_modify`, so they land even when nobody is
/// subscribed.
pub(crate) struct Tracker {
    tx: watch::Sender<TransferState>,
}

impl Tracker {
    pub(crate) fn new(initial: TransferState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.tx.subscribe()
    }

    pub(crate) fn update(&self, change: impl FnOnce(&mut TransferState)) {
        self.tx.send_modify(change);
    }

    pub(crate) fn snapshot(&self) -> TransferState {
        self.tx.borrow().clone()
    }
}

/// Caller's view of a transfer running in the background.
///
/// Dropping the handle (or calling [`TransferHandle::detach`]) does not stop
/// the transfer: once the burn is submitted the funds are committed and the
/// task runs to a terminal phase on its own.
#[derive(Debug)]
pub struct TransferHandle {
    state: watch::Receiver<TransferState>,
    cancel: CancellationToken,
    task: JoinHandle<TransferState>,
}

impl TransferHandle {
    pub(crate) fn new(
        state: watch::Receiver<TransferState>,
        cancel: CancellationToken,
        task: JoinHandle<TransferState>,
    ) -> Self {
        Self {
            state,
            cancel,
            task,
        }
    }

    /// Latest published state.
    pub fn state(&self) -> TransferState {
        self.state.borrow().clone()
    }

    /// A receiver that sees every subsequent update.
    pub fn subscribe(&self) -> watch::Receiver<TransferState> {
        self.state.clone()
    }

    /// Stops the transfer if the burn has not been submitted yet; afterwards
    /// it has no effect.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Lets the transfer finish in the background without an observer.
    pub fn detach(self) {
        drop(self.task);
    }

    /// Waits for the terminal state.
    pub async fn join(self) -> Result<TransferState> {
        Ok(self.task.await?)
    }
}
