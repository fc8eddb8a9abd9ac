//! Deploy confirmation by tailing the server log.
//!
//! The server announces lifecycle changes only through its log, so every
//! deploy step is: remember the log's end, perform the action, then read
//! forward until the expected line shows up or the budget runs out.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use regex::bytes::Regex;

use crate::error::DeployError;

/// Lifecycle line to wait for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalKind {
    /// The application was unregistered.
    Unregistered,
    /// The application is available for use.
    Available,
}

/// Outcome of a successful wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Awaited {
    /// The signal appeared after the action.
    Observed,
    /// The action reported nothing to do; no wait took place.
    Skipped,
}

/// Step action. Returns `false` when there was nothing to do.
pub type SignalAction<'a> = &'a mut dyn FnMut() -> Result<bool, DeployError>;

/// Source of deploy confirmations.
pub trait DeploySignal: Send + Sync {
    /// Start observing, run `action`, then wait for `kind` for `name`.
    ///
    /// Observation starts before the action so a fast server cannot
    /// announce the change before anyone is looking.
    fn await_after(
        &self,
        name: &str,
        kind: SignalKind,
        action: SignalAction<'_>,
    ) -> Result<Awaited, DeployError>;
}

/// Placeholder replaced by the escaped application name.
const NAME_PLACEHOLDER: &str = "{name}";

/// [`DeploySignal`] reading an append-only log file.
#[derive(Debug, Clone)]
pub struct LogSignal {
    log_file: PathBuf,
    unregistered: String,
    available: String,
    timeout: Duration,
    poll_interval: Duration,
}

impl LogSignal {
    /// Create a log signal with `{name}` pattern templates.
    pub fn new(
        log_file: PathBuf,
        unregistered: impl Into<String>,
        available: impl Into<String>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            log_file,
            unregistered: unregistered.into(),
            available: available.into(),
            timeout,
            poll_interval,
        }
    }

    /// Compiled pattern for `kind` and `name`.
    pub fn pattern(&self, name: &str, kind: SignalKind) -> Result<Regex, DeployError> {
        let template = match kind {
            SignalKind::Unregistered => &self.unregistered,
            SignalKind::Available => &self.available,
        };
        let pattern = template.replace(NAME_PLACEHOLDER, &regex::escape(name));
        Ok(Regex::new(&pattern)?)
    }

    fn open_at_end(&self) -> Result<(File, u64), DeployError> {
        let mut file = File::open(&self.log_file).map_err(|e| DeployError::io(&self.log_file, e))?;
        let offset = file
            .seek(SeekFrom::End(0))
            .map_err(|e| DeployError::io(&self.log_file, e))?;
        Ok((file, offset))
    }

    fn wait_for(&self, file: &mut File, mut offset: u64, pattern: &Regex) -> Result<(), DeployError> {
        let start = Instant::now();
        // Unterminated last line carried over between reads
        let mut pending = Vec::new();
        let mut chunk = Vec::new();

        loop {
            let len = file
                .metadata()
                .map_err(|e| DeployError::io(&self.log_file, e))?
                .len();
            if len < offset {
                // Truncated or rotated in place
                offset = 0;
                pending.clear();
            }

            chunk.clear();
            file.seek(SeekFrom::Start(offset))
                .and_then(|_| file.read_to_end(&mut chunk))
                .map_err(|e| DeployError::io(&self.log_file, e))?;
            offset += chunk.len() as u64;

            if !chunk.is_empty() {
                pending.extend_from_slice(&chunk);
                if pattern.is_match(&pending) {
                    tracing::debug!(
                        pattern = %pattern,
                        elapsed_ms = start.elapsed().as_millis(),
                        "Log signal observed"
                    );
                    return Ok(());
                }
                if let Some(end) = pending.iter().rposition(|&b| b == b'\n') {
                    pending.drain(..=end);
                }
            }

            if start.elapsed() >= self.timeout {
                return Err(DeployError::Timeout {
                    signal: pattern.to_string(),
                    waited: start.elapsed(),
                });
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

impl DeploySignal for LogSignal {
    fn await_after(
        &self,
        name: &str,
        kind: SignalKind,
        action: SignalAction<'_>,
    ) -> Result<Awaited, DeployError> {
        let pattern = self.pattern(name, kind)?;
        let (mut file, offset) = self.open_at_end()?;

        if !action()? {
            return Ok(Awaited::Skipped);
        }
        self.wait_for(&mut file, offset, &pattern)?;
        Ok(Awaited::Observed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};
    use std::io::Write;

    fn signal(log_file: PathBuf, timeout_ms: u64) -> LogSignal {
        LogSignal::new(
            log_file,
            r"for {name} \w+ unregistered",
            r"for {name} \w+ available for use",
            Duration::from_millis(timeout_ms),
            Duration::from_millis(5),
        )
    }

    fn append(path: &std::path::Path, text: &str) {
        append_bytes(path, text.as_bytes());
    }

    fn append_bytes(path: &std::path::Path, bytes: &[u8]) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(bytes).unwrap();
    }

    #[test]
    fn test_pattern_escapes_name() {
        let s = signal(PathBuf::from("/unused"), 10);
        let pattern = s.pattern("orders.v2", SignalKind::Available).unwrap();
        assert!(pattern.is_match(b"1 portlet for orders.v2 is available for use"));
        assert!(!pattern.is_match(b"1 portlet for ordersXv2 is available for use"));
    }

    #[test]
    fn test_observes_line_written_by_action() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("catalina.out");
        fs::write(&log, "old: 1 portlet for orders is available for use\n").unwrap();

        let s = signal(log.clone(), 2_000);
        let result = s.await_after("orders", SignalKind::Available, &mut || {
            append(&log, "INFO: 1 portlet for orders is available for use\n");
            Ok(true)
        });

        assert_eq!(result.unwrap(), Awaited::Observed);
    }

    #[test]
    fn test_ignores_lines_before_action() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("catalina.out");
        fs::write(&log, "1 portlet for orders is available for use\n").unwrap();

        let s = signal(log, 50);
        let result = s.await_after("orders", SignalKind::Available, &mut || Ok(true));

        assert!(matches!(result, Err(DeployError::Timeout { .. })));
    }

    #[test]
    fn test_matches_line_split_across_reads() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("catalina.out");
        fs::write(&log, "").unwrap();

        let writer_log = log.clone();
        let s = signal(log, 2_000);
        let result = s.await_after("orders", SignalKind::Unregistered, &mut || {
            let log = writer_log.clone();
            std::thread::spawn(move || {
                append(&log, "1 portlet for ord");
                std::thread::sleep(Duration::from_millis(30));
                append(&log, "ers was unregistered\n");
            });
            Ok(true)
        });

        assert_eq!(result.unwrap(), Awaited::Observed);
    }

    #[test]
    fn test_matches_multibyte_name_split_across_reads() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("catalina.out");
        fs::write(&log, "").unwrap();

        let writer_log = log.clone();
        let s = signal(log, 2_000);
        let result = s.await_after("café", SignalKind::Available, &mut || {
            let log = writer_log.clone();
            std::thread::spawn(move || {
                // Split inside the two-byte encoding of 'é'
                append_bytes(&log, b"1 portlet for caf\xC3");
                std::thread::sleep(Duration::from_millis(30));
                append_bytes(&log, b"\xA9 is available for use\n");
            });
            Ok(true)
        });

        assert_eq!(result.unwrap(), Awaited::Observed);
    }

    #[test]
    fn test_skipped_action_does_not_wait() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("catalina.out");
        fs::write(&log, "").unwrap();

        let s = signal(log, 10_000);
        let start = Instant::now();
        let result = s.await_after("orders", SignalKind::Unregistered, &mut || Ok(false));

        assert_eq!(result.unwrap(), Awaited::Skipped);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_missing_log_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = signal(dir.path().join("missing.out"), 10);
        let mut ran = false;
        let result = s.await_after("orders", SignalKind::Available, &mut || {
            ran = true;
            Ok(true)
        });

        assert!(matches!(result, Err(DeployError::Io { .. })));
        assert!(!ran);
    }
}
