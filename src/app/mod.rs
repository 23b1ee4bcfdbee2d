//! Process-level plumbing shared by the library and the bridge binary.

mod logging;

pub use logging::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
};
