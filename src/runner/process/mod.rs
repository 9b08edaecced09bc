//! Shell command execution with streamed output.
//!
//! Each command line runs through `sh -c` in the working directory. Child
//! stdout and stderr are forwarded to ours on dedicated threads so action
//! output appears as it is produced; it is never parsed.

use camino::Utf8Path;
use std::{
    io::{self, BufReader, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
};
use tracing::info;

/// Shell used to interpret command lines.
pub const SHELL: &str = "sh";

fn shell_command(line: &str, work_dir: &Utf8Path) -> Command {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c")
        .arg(line)
        .current_dir(work_dir.as_std_path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Run one command line and wait for it, streaming its output.
///
/// # Errors
///
/// Returns an [`io::Error`] if the shell cannot be spawned or its standard
/// streams are unavailable. A non-zero exit is reported through the returned
/// [`ExitStatus`], not as an error.
pub fn run_shell(line: &str, work_dir: &Utf8Path) -> io::Result<ExitStatus> {
    info!(command = line, dir = %work_dir, "Running command");
    let child = shell_command(line, work_dir).spawn()?;
    spawn_and_stream_output(child)
}

fn handle_forwarding_thread_result(result: thread::Result<ForwardStats>, stream_name: &str) {
    match result {
        Ok(stats) => {
            tracing::debug!(
                stream = stream_name,
                bytes_read = stats.bytes_read,
                bytes_written = stats.bytes_written,
                "child output forwarded"
            );
            if stats.write_failed {
                tracing::debug!(
                    "{stream_name} forwarding encountered closed pipe; output truncated"
                );
            }
        }
        Err(err) => {
            tracing::warn!("{stream_name} forwarding thread panicked: {err:?}");
        }
    }
}

fn spawn_and_stream_output(mut child: Child) -> io::Result<ExitStatus> {
    let Some(stdout) = child.stdout.take() else {
        terminate_child(&mut child, "stdout pipe unavailable");
        return Err(io::Error::other("child process missing stdout pipe"));
    };
    let Some(stderr) = child.stderr.take() else {
        terminate_child(&mut child, "stderr pipe unavailable");
        return Err(io::Error::other("child process missing stderr pipe"));
    };

    let out_handle = thread::spawn(move || {
        let mut lock = io::stdout().lock();
        forward_child_output(BufReader::new(stdout), &mut lock, "stdout")
    });
    let err_handle = thread::spawn(move || {
        let mut lock = io::stderr().lock();
        forward_child_output(BufReader::new(stderr), &mut lock, "stderr")
    });

    let status = child.wait()?;
    handle_forwarding_thread_result(out_handle.join(), "stdout");
    handle_forwarding_thread_result(err_handle.join(), "stderr");
    Ok(status)
}

fn terminate_child(child: &mut Child, context: &str) {
    if let Err(err) = child.kill() {
        tracing::debug!("failed to kill child after {context}: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::debug!("failed to reap child after {context}: {err}");
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ForwardStats {
    bytes_read: u64,
    bytes_written: u64,
    write_failed: bool,
}

struct CountingReader<'a, R> {
    inner: &'a mut R,
    read: u64,
}

impl<R: Read> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.read = self
            .read
            .saturating_add(u64::try_from(count).unwrap_or(u64::MAX));
        Ok(count)
    }
}

/// Copy child output to `writer`, draining the rest if the writer closes so
/// the child never blocks on a full pipe.
fn forward_child_output<R, W>(
    mut reader: R,
    mut writer: W,
    stream_name: &'static str,
) -> ForwardStats
where
    R: Read,
    W: Write,
{
    let mut counting = CountingReader {
        inner: &mut reader,
        read: 0,
    };
    let mut stats = ForwardStats::default();
    match io::copy(&mut counting, &mut writer) {
        Ok(written) => stats.bytes_written = written,
        Err(err) => {
            stats.write_failed = true;
            tracing::debug!(
                "Failed to write child {stream_name} output to parent: {err}; discarding remaining bytes"
            );
            if let Err(drain_err) = io::copy(&mut counting, &mut io::sink()) {
                tracing::debug!(
                    "Failed to drain child {stream_name} output after writer closed: {drain_err}"
                );
            }
        }
    }
    stats.bytes_read = counting.read;
    stats
}
