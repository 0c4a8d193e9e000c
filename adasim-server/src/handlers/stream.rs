//! Byte-range video streaming for finished runs.
//!
//! The media file is immutable once ingestion completes, so concurrent
//! range requests are independent read-only streams and need no
//! synchronization. The deletion collaborator must not remove a file
//! while a read is in flight.

use adasim_model::CallerIdentity;
use axum::{
    Extension,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::AppState;
use crate::errors::{AppError, AppResult};
use crate::handlers::ingest::parse_run_id;

/// A parsed `Range` header, validated against the asset size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    Full,
    /// Inclusive byte span within the asset.
    Span { start: u64, end: u64 },
}

/// Parse a single `bytes=start-end` range against `total`.
///
/// Omitted `end` defaults to `total - 1`; an `end` past the last byte
/// clamps to it. Anything malformed, a non-`bytes` unit, multiple
/// ranges, or a span starting at or beyond the asset size is
/// unsatisfiable.
fn parse_range(header: Option<&str>, total: u64) -> Result<RangeSpec, ()> {
    let Some(raw) = header else {
        return Ok(RangeSpec::Full);
    };

    let spec = raw.strip_prefix("bytes=").ok_or(())?;
    if spec.contains(',') {
        return Err(());
    }

    let (start, end) = spec.split_once('-').ok_or(())?;
    let start: u64 = start.trim().parse().map_err(|_| ())?;
    let end: u64 = match end.trim() {
        "" => total.saturating_sub(1),
        raw => raw.parse().map_err(|_| ())?,
    };
    let end = end.min(total.saturating_sub(1));

    if start >= total || start > end {
        return Err(());
    }

    Ok(RangeSpec::Span { start, end })
}

/// Stream a finished run's video, honoring `Range` for seeking.
pub async fn stream_video_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(run_id): Path<String>,
    request_headers: HeaderMap,
) -> AppResult<Response> {
    let run_id = parse_run_id(&run_id)?;

    let run = state
        .store
        .get_run(run_id)
        .await?
        .ok_or_else(|| AppError::not_found("run not found"))?;
    if !caller.can_access(&run.user_id) {
        return Err(AppError::forbidden("caller does not own this run"));
    }

    let video_ref = state.store.video_ref(run_id).await?;
    let path = state.media_root().join(&video_ref);

    let mut file = File::open(&path)
        .await
        .map_err(|_| AppError::not_found("video file not found"))?;
    let total = file
        .metadata()
        .await
        .map_err(|e| AppError::internal(format!("file metadata: {e}")))?
        .len();

    let range = request_headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    match parse_range(range, total) {
        Ok(RangeSpec::Full) => {
            let stream = ReaderStream::new(file);

            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("video/mp4"),
            );
            headers.insert(
                header::CONTENT_LENGTH,
                total.to_string().parse().unwrap(),
            );

            Ok((StatusCode::OK, headers, Body::from_stream(stream))
                .into_response())
        }
        Ok(RangeSpec::Span { start, end }) => {
            debug!(run_id = %run_id, start, end, total, "serving byte range");

            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|e| AppError::internal(format!("seek failed: {e}")))?;
            let length = end - start + 1;
            let stream = ReaderStream::new(file.take(length));

            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("video/mp4"),
            );
            headers.insert(
                header::CONTENT_RANGE,
                format!("bytes {start}-{end}/{total}").parse().unwrap(),
            );
            headers.insert(
                header::CONTENT_LENGTH,
                length.to_string().parse().unwrap(),
            );

            Ok((
                StatusCode::PARTIAL_CONTENT,
                headers,
                Body::from_stream(stream),
            )
                .into_response())
        }
        Err(()) => {
            headers.insert(
                header::CONTENT_RANGE,
                format!("bytes */{total}").parse().unwrap(),
            );

            Ok((StatusCode::RANGE_NOT_SATISFIABLE, headers).into_response())
        }
    }
}
