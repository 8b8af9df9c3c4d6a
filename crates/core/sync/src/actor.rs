//! [`IndexerActor`] trait.

use async_trait::async_trait;

/// A long-running service of the indexer.
///
/// Actors are built with everything they need and then consumed by [`start`](Self::start),
/// which runs until the actor's cancellation token fires or a fatal error occurs.
#[async_trait]
pub trait IndexerActor: Send + 'static {
    /// The error type for the actor.
    type Error: std::fmt::Debug;

    /// Starts the actor.
    async fn start(self) -> Result<(), Self::Error>;
}
