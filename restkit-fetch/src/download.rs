//! Streaming downloads.
//!
//! The body is written chunk by chunk to a temporary file created next to
//! the destination, then moved into place without overwriting. The whole
//! body is never held in memory.

use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use restkit_core::{HttpMetadata, Request};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::error::RestError;
use crate::executor::{DownloadResponse, RestClient};
use crate::host::http::{BodyStream, StreamingResponse};
use crate::parser::ErrorParser;

/// Prefix of in-progress download files.
const TEMP_PREFIX: &str = ".restkit-download-";

impl RestClient {
    /// Downloads the response body of `request` to `destination`.
    ///
    /// Besides the failures shared with the buffered calls, a download also
    /// stops at a status outside `[200, 300)`: nothing is written, and the
    /// error is the one `parser` builds from the body, or
    /// [`RestError::HttpStatus`] when there is no parser or it declines.
    /// [`RestError::InvalidFile`] means the temporary file vanished before it
    /// could be moved, and [`RestError::FileSystem`] that the file could not
    /// be written or moved, including when `destination` exists.
    #[instrument(
        skip_all,
        fields(method = %request.method(), url = %request.url(), destination = %destination.display())
    )]
    pub async fn download(
        &self,
        request: &Request,
        destination: &Path,
        parser: Option<&dyn ErrorParser>,
    ) -> DownloadResponse {
        let wire = match self.prepare(request).await {
            Ok(wire) => wire,
            Err(e) => {
                return DownloadResponse {
                    metadata: None,
                    result: Err(e),
                };
            }
        };

        let StreamingResponse { metadata, body } = match self.transport().open(wire).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                warn!("Exchange completed without a response");
                return DownloadResponse {
                    metadata: None,
                    result: Err(RestError::NoResponse),
                };
            }
            Err(e) => {
                warn!(error = %e, "Download request failed");
                return DownloadResponse {
                    metadata: None,
                    result: Err(e.into()),
                };
            }
        };

        if !metadata.is_success() {
            let error = match parser {
                Some(parser) => {
                    let body = collect_error_body(body).await;
                    parser.parse_error(&metadata, Some(&body[..]))
                }
                None => None,
            }
            .map_or_else(|| RestError::http_status(metadata.status), RestError::Domain);
            debug!(status = %metadata.status, error = %error, "Unsuccessful status, nothing written");
            return DownloadResponse {
                metadata: Some(metadata),
                result: Err(error),
            };
        }

        let result = match spool(body, destination).await {
            Ok(temp) => persist(temp, destination),
            Err(e) => Err(e),
        };
        finish(metadata, result)
    }
}

/// Bundles the outcome of a download that got a response.
fn finish(metadata: HttpMetadata, result: Result<PathBuf, RestError>) -> DownloadResponse {
    match &result {
        Ok(path) => info!(path = %path.display(), "Download complete"),
        Err(e) => warn!(error = %e, "Download failed"),
    }
    DownloadResponse {
        metadata: Some(metadata),
        result,
    }
}

/// Reads an error body for the parser. A read failure ends the body early.
async fn collect_error_body(mut body: BodyStream) -> Bytes {
    let mut buf = BytesMut::new();
    while let Some(Ok(chunk)) = body.next().await {
        buf.extend_from_slice(&chunk);
    }
    buf.freeze()
}

/// Streams `body` into a temporary file next to `destination`.
async fn spool(mut body: BodyStream, destination: &Path) -> Result<TempPath, RestError> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let (file, temp_path) = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut written: u64 = 0;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);
    debug!(bytes = written, temp = %temp_path.display(), "Body written to temporary file");

    Ok(temp_path)
}

/// Moves a spooled file to `destination` without overwriting.
fn persist(temp_path: TempPath, destination: &Path) -> Result<PathBuf, RestError> {
    if !temp_path.exists() {
        return Err(RestError::InvalidFile(temp_path.display().to_string()));
    }

    temp_path
        .persist_noclobber(destination)
        .map_err(|e| RestError::FileSystem(e.error))?;
    Ok(destination.to_path_buf())
}
