use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::BackendError,
    model::{MosqueRecord, MosqueUpdate},
};

pub mod supabase;

pub use supabase::SupabaseClient;

/// Read/update access to the hosted mosque table.
#[async_trait]
pub trait MosqueStore: Send + Sync + Debug {
    /// Every row, unfiltered.
    async fn list_mosques(&self) -> Result<Vec<MosqueRecord>, BackendError>;

    /// Replace the six editable columns of the row with this id.
    async fn update_mosque(&self, id: i64, update: &MosqueUpdate) -> Result<(), BackendError>;
}
