//! Timestamped log lines, mirrored to an optional log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use indicatif::ProgressBar;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Fatal,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Fatal => "FATAL",
        }
    }
}

/// Cheap to clone; every clone writes to the same sinks.
#[derive(Clone, Default)]
pub struct Logger {
    file: Option<Arc<Mutex<File>>>,
    progress: Option<ProgressBar>,
    capture: Option<Arc<Mutex<Vec<String>>>>,
}

pub fn current_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

impl Logger {
    /// Logger that appends to `path` as well as stderr.
    pub fn with_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Logger {
            file: Some(Arc::new(Mutex::new(f))),
            ..Default::default()
        })
    }

    /// Logger that keeps every line in memory and prints nothing.
    pub fn capturing() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let logger = Logger {
            capture: Some(Arc::clone(&lines)),
            ..Default::default()
        };
        (logger, lines)
    }

    /// Route console output through `pb` so lines don't tear the bar.
    pub fn attach_progress(&mut self, pb: ProgressBar) {
        self.progress = Some(pb);
    }

    pub fn detach_progress(&mut self) {
        self.progress = None;
    }

    pub fn log<S: AsRef<str>>(&self, level: Level, msg: S) {
        let line = format!("[{}] [{}] {}", current_timestamp(), level.tag(), msg.as_ref());
        if let Some(ref lines) = self.capture {
            lines.lock().push(line);
            return;
        }
        match self.progress {
            Some(ref pb) => pb.println(line.as_str()),
            None => eprintln!("{}", line),
        }
        if let Some(ref lf) = self.file {
            let mut guard = lf.lock();
            let _ = writeln!(*guard, "{}", line);
            let _ = guard.flush();
        }
    }

    pub fn info<S: AsRef<str>>(&self, msg: S) {
        self.log(Level::Info, msg);
    }

    pub fn warn<S: AsRef<str>>(&self, msg: S) {
        self.log(Level::Warning, msg);
    }

    pub fn fatal<S: AsRef<str>>(&self, msg: S) {
        self.log(Level::Fatal, msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn capture_keeps_level_tag() {
        let (log, lines) = Logger::capturing();
        log.warn("readahead restore failed");
        let lines = lines.lock();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("[WARN] readahead restore failed"));
    }

    #[test]
    fn file_sink_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("verify.log");
        let log = Logger::with_file(&path).unwrap();
        log.info("first");
        log.clone().fatal("second");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[INFO] first"));
        assert!(text.contains("[FATAL] second"));
    }
}
