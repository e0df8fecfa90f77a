use std::sync::OnceLock;

use tokio::runtime::{Handle, Runtime};

static FALLBACK_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Returns the current tokio handle, or the handle of a shared fallback
/// runtime when called outside of one.
pub fn get_or_create_handle() -> Handle {
    Handle::try_current().ok().unwrap_or_else(|| {
        FALLBACK_RUNTIME
            .get_or_init(|| Runtime::new().expect("runtime is created"))
            .handle()
            .clone()
    })
}
