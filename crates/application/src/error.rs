use domain::DomainError;
use thiserror::Error;

use crate::broadcaster::BroadcastError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
}
