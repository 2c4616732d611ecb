//! Write path shared by the pattern store and the preference estimator
//!
//! Without a backend the engine is local-only and writes stop at the cache.
//! With one, writes go straight to the backend unless the user is not signed
//! in, earlier writes are still queued, or the backend is unreachable; in those
//! cases they are appended to the offline queue.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::backend::LearningBackend;
use crate::queue::{Mutation, OfflineQueue};

struct Link {
    backend: Arc<dyn LearningBackend>,
    queue: Arc<OfflineQueue>,
}

pub(crate) struct Remote {
    link: Option<Link>,
    user_id: Option<String>,
}

impl Remote {
    pub(crate) fn new(
        backend: Arc<dyn LearningBackend>,
        queue: Arc<OfflineQueue>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            link: Some(Link { backend, queue }),
            user_id,
        }
    }

    pub(crate) fn local(user_id: Option<String>) -> Self {
        Self {
            link: None,
            user_id,
        }
    }

    pub(crate) fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub(crate) fn is_local_only(&self) -> bool {
        self.link.is_none()
    }

    pub(crate) fn queue(&self) -> Option<&OfflineQueue> {
        self.link.as_ref().map(|link| link.queue.as_ref())
    }

    pub(crate) fn backend(&self) -> Option<&dyn LearningBackend> {
        self.link.as_ref().map(|link| link.backend.as_ref())
    }

    /// Backend and user for reads, when both exist
    pub(crate) fn reader(&self) -> Option<(&dyn LearningBackend, &str)> {
        Some((self.backend()?, self.user_id()?))
    }

    /// Persist a mutation, queueing it when the backend cannot take it now
    pub(crate) async fn write(&self, mutation: Mutation) {
        let Some(link) = &self.link else {
            return;
        };

        if self.user_id.is_none() {
            debug!(operation = ?mutation.operation_type(), "not signed in, queueing write");
            self.enqueue(&link.queue, mutation).await;
            return;
        }

        if !link.queue.is_empty().await {
            // Keep order behind writes that are still pending
            self.enqueue(&link.queue, mutation).await;
            return;
        }

        match mutation.apply(link.backend.as_ref()).await {
            Ok(()) => debug!(operation = ?mutation.operation_type(), "write persisted"),
            Err(e) if e.is_connectivity() => {
                warn!(
                    operation = ?mutation.operation_type(),
                    error = %e,
                    "backend unreachable, queueing write"
                );
                self.enqueue(&link.queue, mutation).await;
            }
            Err(e) => {
                warn!(
                    operation = ?mutation.operation_type(),
                    error = %e,
                    "backend rejected write"
                );
            }
        }
    }

    async fn enqueue(&self, queue: &OfflineQueue, mutation: Mutation) {
        if let Err(e) = queue.enqueue(mutation).await {
            warn!(error = %e, "failed to queue offline write");
        }
    }
}
