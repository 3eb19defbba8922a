//! Resumable, throttled transfer of one remote file.
//!
//! The engine streams into `<final>.tmp` and renames into place only once
//! the byte count matches the declared length; the rename is the sole commit
//! point. There is no byte-range resume: any connectivity failure or short
//! stream throws away the staged bytes and re-streams from byte zero,
//! retrying until the transfer verifies. Only catastrophic local I/O errors
//! reach the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use futures::StreamExt;
use snafu::prelude::*;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{CommitSnafu, StageSnafu, SyncSnafu, TransferError, WriteSnafu};
use crate::source::CatalogSource;

/// Bytes written (and throttled) per chunk.
pub const CHUNK_SIZE: usize = 100 * 1024;

/// Pause between retry attempts after a failed stream.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Staging path for an in-progress transfer.
fn staging_path(local: &Path) -> PathBuf {
    let mut name = local.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Sleep long enough that sustained throughput approximates the target rate.
async fn throttle_sleep(throttle: Option<u64>, chunk_len: usize) {
    if let Some(rate) = throttle {
        if rate > 0 {
            tokio::time::sleep(Duration::from_secs_f64(chunk_len as f64 / rate as f64)).await;
        }
    }
}

/// Download `url` to `local`, committing atomically on verified completion.
///
/// Returns the number of bytes transferred. Retries indefinitely on
/// connectivity failures and short streams; a declared length of zero is
/// accepted as "cannot verify" and stream end counts as success.
pub async fn transfer(
    source: &dyn CatalogSource,
    url: &str,
    local: &Path,
    throttle: Option<u64>,
) -> Result<u64, TransferError> {
    let tmp = staging_path(local);

    loop {
        let mut read = match source.open(url).await {
            Ok(read) => read,
            Err(e) => {
                warn!(url, error = %e, "Failed to open remote stream, retrying");
                tokio::time::sleep(RETRY_PAUSE).await;
                continue;
            }
        };
        let declared = read.declared_len;

        // Truncates any bytes staged by a previous attempt.
        let mut file = tokio::fs::File::create(&tmp)
            .await
            .context(StageSnafu { path: &tmp })?;
        let mut written: u64 = 0;
        let mut buffer = BytesMut::new();
        let mut interrupted = false;

        while let Some(item) = read.stream.next().await {
            match item {
                Ok(bytes) => {
                    buffer.extend_from_slice(&bytes);
                    while buffer.len() >= CHUNK_SIZE {
                        let chunk = buffer.split_to(CHUNK_SIZE);
                        file.write_all(&chunk)
                            .await
                            .context(WriteSnafu { path: &tmp })?;
                        written += chunk.len() as u64;
                        throttle_sleep(throttle, chunk.len()).await;
                    }
                }
                Err(e) => {
                    warn!(url, error = %e, "Stream failed, retrying from byte zero");
                    interrupted = true;
                    break;
                }
            }
        }

        if !interrupted {
            if !buffer.is_empty() {
                let chunk = buffer.split();
                file.write_all(&chunk)
                    .await
                    .context(WriteSnafu { path: &tmp })?;
                written += chunk.len() as u64;
                throttle_sleep(throttle, chunk.len()).await;
            }

            if declared == 0 || written == declared {
                file.flush().await.context(SyncSnafu { path: &tmp })?;
                file.sync_all().await.context(SyncSnafu { path: &tmp })?;
                drop(file);
                tokio::fs::rename(&tmp, local)
                    .await
                    .context(CommitSnafu { path: local })?;
                debug!(url, bytes = written, "Transfer committed");
                return Ok(written);
            }

            warn!(
                url,
                written, declared, "Short stream, retrying from byte zero"
            );
        }

        tokio::time::sleep(RETRY_PAUSE).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::source::{ByteStream, RemoteRead};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// One scripted stream attempt: chunks to yield, then an optional error.
    struct Attempt {
        chunks: Vec<Vec<u8>>,
        fail_after: bool,
    }

    /// Catalog source that replays scripted attempts in order.
    struct ScriptedSource {
        declared_len: u64,
        attempts: Mutex<Vec<Attempt>>,
        opens: Mutex<usize>,
    }

    impl ScriptedSource {
        fn new(declared_len: u64, attempts: Vec<Attempt>) -> Self {
            Self {
                declared_len,
                attempts: Mutex::new(attempts),
                opens: Mutex::new(0),
            }
        }

        fn open_count(&self) -> usize {
            *self.opens.lock().unwrap()
        }
    }

    #[async_trait]
    impl CatalogSource for ScriptedSource {
        async fn list(&self, _extension: &str) -> Result<Vec<String>, SourceError> {
            Ok(vec![])
        }

        async fn open(&self, _url: &str) -> Result<RemoteRead, SourceError> {
            *self.opens.lock().unwrap() += 1;
            let attempt = self.attempts.lock().unwrap().remove(0);
            let mut items: Vec<Result<Bytes, SourceError>> = attempt
                .chunks
                .into_iter()
                .map(|c| Ok(Bytes::from(c)))
                .collect();
            if attempt.fail_after {
                items.push(Err(SourceError::Interrupted {
                    message: "connection reset".to_string(),
                }));
            }
            let stream: ByteStream = Box::pin(futures::stream::iter(items));
            Ok(RemoteRead {
                declared_len: self.declared_len,
                stream,
            })
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_clean_transfer_commits_atomically() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("partition.csv.gz");
        let body = payload(250 * 1024);

        let source = ScriptedSource::new(
            body.len() as u64,
            vec![Attempt {
                chunks: vec![body.clone()],
                fail_after: false,
            }],
        );

        let written = transfer(&source, "http://x/p.csv.gz", &local, None)
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&local).unwrap(), body);
        assert!(!staging_path(&local).exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_stream_retries_from_zero() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("partition.csv.gz");
        let body = payload(64 * 1024);

        // First attempt delivers a truncated body and ends cleanly; second
        // attempt delivers everything.
        let source = ScriptedSource::new(
            body.len() as u64,
            vec![
                Attempt {
                    chunks: vec![body[..10_000].to_vec()],
                    fail_after: false,
                },
                Attempt {
                    chunks: vec![body.clone()],
                    fail_after: false,
                },
            ],
        );

        let written = transfer(&source, "http://x/p.csv.gz", &local, None)
            .await
            .unwrap();

        assert_eq!(source.open_count(), 2);
        assert_eq!(written, body.len() as u64);
        // No truncated bytes leaked into the committed file.
        assert_eq!(std::fs::read(&local).unwrap(), body);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_error_retries_from_zero() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("partition.csv.gz");
        let body = payload(300 * 1024);

        let source = ScriptedSource::new(
            body.len() as u64,
            vec![
                Attempt {
                    chunks: vec![body[..150 * 1024].to_vec()],
                    fail_after: true,
                },
                Attempt {
                    chunks: vec![],
                    fail_after: true,
                },
                Attempt {
                    chunks: body.chunks(90 * 1024).map(|c| c.to_vec()).collect(),
                    fail_after: false,
                },
            ],
        );

        let written = transfer(&source, "http://x/p.csv.gz", &local, None)
            .await
            .unwrap();

        assert_eq!(source.open_count(), 3);
        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&local).unwrap(), body);
        assert!(!staging_path(&local).exists());
    }

    #[tokio::test]
    async fn test_unknown_length_accepts_stream_end() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("partition.csv.gz");
        let body = payload(12_345);

        let source = ScriptedSource::new(
            0,
            vec![Attempt {
                chunks: vec![body.clone()],
                fail_after: false,
            }],
        );

        let written = transfer(&source, "http://x/p.csv.gz", &local, None)
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(std::fs::read(&local).unwrap(), body);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_leaves_no_committed_file() {
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("partition.csv.gz");
        let body = payload(8 * 1024);

        let source = ScriptedSource::new(
            body.len() as u64,
            vec![
                Attempt {
                    chunks: vec![body[..1024].to_vec()],
                    fail_after: true,
                },
                Attempt {
                    chunks: vec![body.clone()],
                    fail_after: false,
                },
            ],
        );

        assert!(!local.exists());
        transfer(&source, "http://x/p.csv.gz", &local, None)
            .await
            .unwrap();
        assert!(local.exists());
    }
}
