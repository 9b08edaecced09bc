//! Built-in `fetch` action.
//!
//! The response body is streamed into a temporary file next to the target and
//! renamed into place only after it has been fully received and verified, so
//! an interrupted or rejected download never leaves a partial target.

use std::{
    fs,
    io::{self, Read, Write},
    thread,
    time::Duration,
};

use camino::Utf8Path;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::hasher::{DigestWriter, digest_matches};

const CHUNK_SIZE: usize = 8 * 1024;

/// Retry behaviour for fetch actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Base delay; attempt `n` waits `n * backoff` before retrying.
    pub backoff: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            retries: 0,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Why a download was rejected.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// The URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Only `http` and `https` are fetched.
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
    /// Connection, DNS or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("server responded with HTTP {0}")]
    Status(u16),
    /// The server sent no bytes.
    #[error("response body was empty")]
    Empty,
    /// The body did not hash to the expected digest.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Digest written in the manifest.
        expected: String,
        /// Digest of the received bytes.
        actual: String,
    },
    /// Writing the download to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FetchFailure {
    /// Returns `true` for failures a later attempt might not repeat.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

/// A completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Bytes written to the target.
    pub bytes: u64,
    /// SHA-256 of the body in lower-case hex.
    pub sha256: String,
}

/// Download `url` to `dest`, verifying `sha256` when supplied.
///
/// # Errors
///
/// Returns [`FetchFailure`] for unsupported schemes, transport errors,
/// non-success statuses, empty bodies, checksum mismatches and write errors.
/// Only transport errors and 5xx responses are retried, and only when
/// `options.retries` is non-zero.
pub fn fetch_to(
    url: &str,
    sha256: Option<&str>,
    dest: &Utf8Path,
    options: FetchOptions,
) -> Result<Fetched, FetchFailure> {
    let parsed = Url::parse(url)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchFailure::UnsupportedScheme(parsed.scheme().to_owned()));
    }

    let mut attempt: u32 = 0;
    loop {
        match fetch_once(&parsed, sha256, dest) {
            Ok(fetched) => {
                info!(url, dest = %dest, bytes = fetched.bytes, "Fetched");
                return Ok(fetched);
            }
            Err(err) if err.is_retryable() && attempt < options.retries => {
                attempt += 1;
                let delay = options.backoff.saturating_mul(attempt);
                warn!(url, attempt, error = %err, "fetch failed; retrying in {delay:?}");
                thread::sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
}

fn fetch_once(url: &Url, sha256: Option<&str>, dest: &Utf8Path) -> Result<Fetched, FetchFailure> {
    let response = dispatch_request(url)?;
    let parent = dest
        .parent()
        .filter(|p| !p.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent)?;
    let tmp = tempfile::Builder::new()
        .prefix(".kumade-fetch")
        .tempfile_in(parent)?;

    let (tmp, fetched) = read_response(response.into_reader(), tmp)?;
    if fetched.bytes == 0 {
        return Err(FetchFailure::Empty);
    }
    if let Some(expected) = sha256
        && !digest_matches(expected, &fetched.sha256)
    {
        return Err(FetchFailure::ChecksumMismatch {
            expected: expected.to_owned(),
            actual: fetched.sha256,
        });
    }
    tmp.persist(dest.as_std_path()).map_err(|err| err.error)?;
    Ok(fetched)
}

fn dispatch_request(url: &Url) -> Result<ureq::Response, FetchFailure> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(10))
        .timeout_read(Duration::from_secs(30))
        .timeout_write(Duration::from_secs(30))
        .timeout(Duration::from_secs(60))
        .build();
    match agent.get(url.as_str()).call() {
        Ok(response) if (200..300).contains(&response.status()) => Ok(response),
        Ok(response) => Err(FetchFailure::Status(response.status())),
        Err(ureq::Error::Status(code, _)) => Err(FetchFailure::Status(code)),
        Err(ureq::Error::Transport(transport)) => {
            Err(FetchFailure::Transport(transport.to_string()))
        }
    }
}

fn read_response(
    mut reader: impl Read,
    tmp: NamedTempFile,
) -> Result<(NamedTempFile, Fetched), FetchFailure> {
    let mut sink = DigestWriter::new(tmp);
    let mut chunk = [0_u8; CHUNK_SIZE];
    loop {
        let read = reader
            .read(&mut chunk)
            .map_err(|err| FetchFailure::Transport(err.to_string()))?;
        if read == 0 {
            break;
        }
        let bytes = chunk
            .get(..read)
            .ok_or_else(|| io::Error::other("read past end of buffer"))?;
        sink.write_all(bytes)?;
    }
    sink.flush()?;
    let bytes = sink.written();
    let (tmp, sha256) = sink.finish();
    tmp.as_file().sync_all()?;
    Ok((tmp, Fetched { bytes, sha256 }))
}
