use thiserror::Error;

/// Error type for the audio pipeline and its outputs
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("audio output error: {0}")]
    Output(String),
    #[error("audio track format is missing {0}")]
    IncompleteFormat(&'static str),
    #[error("audio decoder failed to start: {0}")]
    SourceStart(String),
    #[error("failed to spawn audio thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("audio thread exited before reporting readiness")]
    InitAborted,
    #[error("audio thread is no longer running")]
    Disconnected,
}
