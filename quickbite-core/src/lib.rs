mod logging;
mod storage;
mod util;

pub use logging::*;
pub use storage::*;
pub use util::*;
