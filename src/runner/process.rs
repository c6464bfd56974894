//! Execution of the external batch-build tool.
//!
//! The child's standard output and error are copied byte for byte to this
//! process's streams while it runs. If a parent stream closes, the rest of
//! the child's output is drained so the child never sees a broken pipe. The
//! logged command line has sensitive `key=value` arguments redacted.

use super::RunnerError;
use itertools::Itertools;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use tracing::{debug, info};

/// Keys whose values never appear in logs.
const SENSITIVE_KEYS: [&str; 4] = ["password", "token", "secret", "api_key"];

/// Exit code reported when the child was terminated without one.
const SIGNALLED_EXIT_CODE: i32 = 1;

fn is_sensitive_arg(arg: &str) -> bool {
    arg.split_once('=').is_some_and(|(key, _)| {
        SENSITIVE_KEYS
            .iter()
            .any(|candidate| key.trim().eq_ignore_ascii_case(candidate))
    })
}

/// Redact the value of a sensitive `key=value` argument.
///
/// # Examples
/// ```
/// use makehelper::runner::redact_argument;
/// assert_eq!(redact_argument("token=abc"), "token=***REDACTED***");
/// assert_eq!(redact_argument("-C"), "-C");
/// ```
#[must_use]
pub fn redact_argument(arg: &str) -> String {
    match arg.split_once('=') {
        Some((key, _)) if is_sensitive_arg(arg) => format!("{key}=***REDACTED***"),
        _ => arg.to_owned(),
    }
}

/// Copy `reader` to `sink`, returning the number of bytes read.
///
/// A failed write switches to discarding, so the reader is always consumed
/// to end of stream.
fn forward<R, W>(mut reader: R, mut sink: W, stream: &'static str) -> u64
where
    R: Read,
    W: Write,
{
    let mut counted = CountingReader {
        inner: &mut reader,
        read: 0,
    };
    if let Err(err) = io::copy(&mut counted, &mut sink) {
        debug!(stream, error = %err, "parent stream closed; discarding child output");
        if let Err(drain_err) = io::copy(&mut counted, &mut io::sink()) {
            debug!(stream, error = %drain_err, "failed to drain child output");
        }
    }
    counted.read
}

struct CountingReader<'a, R> {
    inner: &'a mut R,
    read: u64,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.read = self.read.saturating_add(u64::try_from(count).unwrap_or(u64::MAX));
        Ok(count)
    }
}

/// Convert a child exit status into this process's exit code.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SIGNALLED_EXIT_CODE)
}

/// Run `program` with `args`, streaming its output, and wait for it.
///
/// # Errors
///
/// Returns [`RunnerError::Spawn`] if the process cannot be started or waited
/// on.
pub fn run_make(program: &Path, args: &[String]) -> Result<ExitStatus, RunnerError> {
    let spawn_err = |source| RunnerError::Spawn {
        program: program.to_path_buf(),
        source,
    };
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env("LANG", "C")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let redacted = args.iter().map(|a| redact_argument(a)).join(" ");
    info!("{} {redacted}", program.display());

    let mut child = cmd.spawn().map_err(spawn_err)?;
    let out_handle = child
        .stdout
        .take()
        .map(|stdout| thread::spawn(move || forward(stdout, io::stdout(), "stdout")));
    let err_handle = child
        .stderr
        .take()
        .map(|stderr| thread::spawn(move || forward(stderr, io::stderr(), "stderr")));

    let status = child.wait().map_err(spawn_err)?;
    for handle in [out_handle, err_handle].into_iter().flatten() {
        if handle.join().is_err() {
            debug!("output forwarding thread panicked");
        }
    }
    debug!(%status, "batch-build tool finished");
    Ok(status)
}
