//! Store backends.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use course_core::RequestContext;

use crate::error::StoreError;

fn check_cancelled(ctx: &RequestContext) -> Result<(), StoreError> {
    if ctx.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}
