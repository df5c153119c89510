use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{PermissionMatrix, PermissionRecord, TransportError, UserId};

/// Anything that can answer "which permissions does this user have right now"
#[async_trait]
pub trait PermissionSource: Send + Sync {
    async fn fetch_permissions(&self, user_id: UserId) -> Result<Vec<PermissionRecord>, TransportError>;
}

/// Round-trips to the permission authority and normalizes its answer into a [PermissionMatrix]
#[derive(Clone)]
pub struct PermissionFetcher {
    source: Arc<dyn PermissionSource>,
}

impl PermissionFetcher {
    pub fn new(source: Arc<dyn PermissionSource>) -> Self {
        PermissionFetcher { source }
    }

    /// Fetches the current matrix of `user_id`.
    ///
    /// Without a user id this is an empty matrix and no request is made. `None` means the
    /// refresh failed and callers should keep whatever they had; it never means "no grants".
    pub async fn refresh(&self, user_id: Option<UserId>) -> Option<PermissionMatrix> {
        let Some(user_id) = user_id else {
            debug!("permission refresh without a user; returning empty matrix");
            return Some(PermissionMatrix::new());
        };

        match self.source.fetch_permissions(user_id).await {
            Ok(records) => {
                let matrix = PermissionMatrix::from_records(records);
                debug!(%user_id, modules = matrix.len(), "permission matrix refreshed");
                Some(matrix)
            }
            Err(err) => {
                warn!(%user_id, error = %err, "permission refresh failed; keeping previous matrix");
                None
            }
        }
    }
}
