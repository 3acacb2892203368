use thiserror::Error;

/// Errors a broadcast run can surface past its own boundary. Search and
/// transport failures inside a run degrade into report counters instead of
/// bubbling up, so the surface stays small.
#[derive(Error, Debug)]
pub enum RepotrendError {
    #[error("Broadcast already in progress")]
    BroadcastInProgress,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
