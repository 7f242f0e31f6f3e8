//! Deferred commands for the audio thread.
//!
//! The control thread never touches the audio decoder or the output
//! directly: it pushes a [`TargetState`] and the audio thread applies it at
//! the top of its next iteration, between two decode/write steps. Pushing
//! never blocks, so a slow state transition on the audio side cannot stall
//! the control thread, and the control thread cannot interrupt a write in
//! progress.

use std::fmt;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use crate::audio::error::AudioError;
use crate::media::MediaSource;

/// A requested audio state together with the data it needs.
pub enum TargetState {
    Play,
    Pause,
    /// Drop queued output and pending decoded samples.
    Flush,
    /// Stop the output. With `seeking` set the thread stays alive for the
    /// sources installed after the seek; otherwise the loop finishes.
    Stop { seeking: bool },
    /// Install a new decoded audio source, starting it unless the caller
    /// already did.
    SetSource {
        source: Box<dyn MediaSource>,
        already_started: bool,
    },
    /// Stop and drop the current source.
    ClearSource,
}

impl fmt::Debug for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetState::Play => write!(f, "Play"),
            TargetState::Pause => write!(f, "Pause"),
            TargetState::Flush => write!(f, "Flush"),
            TargetState::Stop { seeking } => write!(f, "Stop {{ seeking: {} }}", seeking),
            TargetState::SetSource { already_started, .. } => {
                write!(f, "SetSource {{ already_started: {} }}", already_started)
            }
            TargetState::ClearSource => write!(f, "ClearSource"),
        }
    }
}

/// Create the two halves of a target-state queue.
pub fn target_state_queue() -> (TargetStateSender, TargetStateQueue) {
    let (tx, rx) = channel::unbounded();
    (TargetStateSender { tx }, TargetStateQueue { rx })
}

/// Producer half, owned by the control thread.
#[derive(Debug, Clone)]
pub struct TargetStateSender {
    tx: Sender<TargetState>,
}

impl TargetStateSender {
    /// Queue a request for the audio thread.
    pub fn push(&self, state: TargetState) -> Result<(), AudioError> {
        self.tx.send(state).map_err(|_| AudioError::Disconnected)
    }

    /// Requests queued but not yet applied.
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

/// Consumer half, owned by the audio thread.
#[derive(Debug)]
pub struct TargetStateQueue {
    rx: Receiver<TargetState>,
}

impl TargetStateQueue {
    pub fn count(&self) -> usize {
        self.rx.len()
    }

    /// Take the oldest request, if any. Once the sender is gone and the
    /// queue is drained, every call yields a final stop.
    pub fn pop(&self) -> Option<TargetState> {
        match self.rx.try_recv() {
            Ok(state) => Some(state),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(TargetState::Stop { seeking: false }),
        }
    }
}
