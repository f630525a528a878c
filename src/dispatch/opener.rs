use super::DispatchError;
use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(200);
const STDERR_MAX_CHARS: usize = 2_000;

/// Hands `url` to the OS opener as a single argv element. No shell is
/// involved, so nothing in the URL can be read as a shell token.
pub fn open_url(opener: &str, url: &str, timeout: Duration) -> Result<(), DispatchError> {
    let mut child = match Command::new(opener)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(DispatchError::MissingOpener {
                opener: opener.to_string(),
            })
        }
        Err(source) => {
            return Err(DispatchError::Spawn {
                opener: opener.to_string(),
                source,
            })
        }
    };

    // The opener may hand its stderr to a long-lived app, so the drain is
    // never joined unconditionally.
    let (stderr_tx, stderr_rx) = mpsc::channel();
    if let Some(mut stderr) = child.stderr.take() {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            let _ = stderr_tx.send(buf);
        });
    }

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(DispatchError::Timeout {
                        opener: opener.to_string(),
                        timeout_ms: timeout.as_millis() as u64,
                    });
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(source) => {
                return Err(DispatchError::Wait {
                    opener: opener.to_string(),
                    source,
                })
            }
        }
    };

    if status.success() {
        return Ok(());
    }
    let stderr = stderr_rx
        .recv_timeout(STDERR_DRAIN_GRACE)
        .unwrap_or_default()
        .trim()
        .chars()
        .take(STDERR_MAX_CHARS)
        .collect();
    Err(DispatchError::NonZeroExit {
        opener: opener.to_string(),
        exit_code: status.code().unwrap_or(-1),
        stderr,
    })
}
