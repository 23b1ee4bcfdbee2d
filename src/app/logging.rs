use crate::config::AppConfig;
use std::{
    env, fs,
    io::Write,
    panic,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

const LOG_MAX_BYTES: u64 = 4 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 128 * 1024;
static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: OnceLock<Mutex<Option<CappedFile>>> = OnceLock::new();

/// Debug log location; `LIVETRAY_LOG_FILE` overrides the temp-dir default.
pub fn log_file_path() -> PathBuf {
    env::var("LIVETRAY_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("livetray.log"))
}

/// Crash log location (metadata only).
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("livetray_crash.log")
}

/// Append-only file that truncates itself instead of growing past `cap` bytes.
struct CappedFile {
    path: PathBuf,
    file: fs::File,
    cap: u64,
    written: u64,
}

impl CappedFile {
    fn open(path: PathBuf, cap: u64) -> Option<Self> {
        let mut written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if written > cap {
            let _ = fs::remove_file(&path);
            written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            cap,
            written,
        })
    }

    fn append(&mut self, line: &str) {
        let len = line.len() as u64;
        if self.written.saturating_add(len) > self.cap {
            match fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)
            {
                Ok(file) => {
                    self.file = file;
                    self.written = 0;
                }
                Err(_) => return,
            }
        }
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.written = self.written.saturating_add(len);
        }
    }
}

fn debug_log() -> &'static Mutex<Option<CappedFile>> {
    DEBUG_LOG.get_or_init(|| Mutex::new(None))
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn configure(enabled: bool, content_enabled: bool) {
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
    LOG_CONTENT_ENABLED.store(enabled && content_enabled, Ordering::Relaxed);
    let mut slot = debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = if enabled {
        CappedFile::open(log_file_path(), LOG_MAX_BYTES)
    } else {
        None
    };
}

/// Configure logging from CLI flags.
pub fn init_logging(config: &AppConfig) {
    configure(config.logging_enabled(), config.log_content);
}

/// Write a debug line to the log file, when enabled. Stdout belongs to the bridge protocol.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let line = format!("[{}] {msg}\n", unix_seconds());
    let mut slot = debug_log()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(file) = slot.as_mut() {
        file.append(&line);
    }
}

/// Write a line that may contain user content such as device names.
pub fn log_debug_content(msg: &str) {
    if !LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    log_debug(msg);
}

/// Record a panic location in the crash log. The payload is kept only with --log-content.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        info.payload()
            .downcast_ref::<&str>()
            .map(|text| (*text).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string())
    } else {
        "payload omitted (log-content disabled)".to_string()
    };
    let line = format!(
        "[{}] panic at {location}: {payload} (v{})\n",
        unix_seconds(),
        env!("CARGO_PKG_VERSION")
    );
    if let Some(mut file) = CappedFile::open(crash_log_path(), CRASH_LOG_MAX_BYTES) {
        file.append(&line);
    }
}
