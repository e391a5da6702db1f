// --------------------------------------------------
// Handles API endpoints for the movies directory.
//
// Responsibilities:
// - List playable .mp4 files
// - Stream one file, honouring Range for seeking
// -------------------------------------------------

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http_range_header::parse_range_header;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::MediaError;
use crate::media::{OpenMovie, MOVIE_MIME};
use crate::AppState;

// -----------------------------
// GET /movies-list
// Sorted .mp4 names, [] if the directory is missing
// -----------------------------
pub async fn list_movies(State(state): State<AppState>) -> Json<Vec<String>> {
    let media = Arc::clone(&state.media);
    match tokio::task::spawn_blocking(move || media.list_movies()).await {
        Ok(names) => Json(names),
        Err(e) => {
            tracing::warn!(error = %e, "movie listing task failed");
            Json(Vec::new())
        }
    }
}

// -----------------------------
// GET /get-movie/:filename
// Whole file (200) or a single byte range (206)
// -----------------------------
pub async fn get_movie(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    req_headers: HeaderMap,
) -> Result<Response, MediaError> {
    let movie = state.media.open_movie(&filename).await?;
    let headers = movie_headers(movie.size);

    let Some(range_val) = req_headers.get(header::RANGE) else {
        let body = Body::from_stream(ReaderStream::new(movie.file));
        return Ok((StatusCode::OK, headers, body).into_response());
    };

    let Ok(range_str) = range_val.to_str() else {
        return Ok(unsatisfiable(movie.size));
    };
    range_response(movie, range_str, headers).await
}

fn movie_headers(size: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(MOVIE_MIME));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers
}

fn unsatisfiable(size: u64) -> Response {
    (
        StatusCode::RANGE_NOT_SATISFIABLE,
        [(header::CONTENT_RANGE, format!("bytes */{size}"))],
    )
        .into_response()
}

// Only the first range of a multi-range request is served.
async fn range_response(
    mut movie: OpenMovie,
    range_str: &str,
    mut headers: HeaderMap,
) -> Result<Response, MediaError> {
    let Ok(parsed) = parse_range_header(range_str) else {
        return Ok(unsatisfiable(movie.size));
    };
    let Some(first) = parsed
        .validate(movie.size)
        .ok()
        .and_then(|ranges| ranges.into_iter().next())
    else {
        return Ok(unsatisfiable(movie.size));
    };

    let start = *first.start();
    let end = *first.end(); // inclusive
    let length = end - start + 1;

    if let Err(source) = movie.file.seek(std::io::SeekFrom::Start(start)).await {
        return Err(MediaError::Io {
            path: movie.path,
            source,
        });
    }

    let content_range = format!("bytes {start}-{end}/{}", movie.size);
    if let Ok(value) = HeaderValue::from_str(&content_range) {
        headers.insert(header::CONTENT_RANGE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    let body = Body::from_stream(ReaderStream::new(movie.file.take(length)));
    Ok((StatusCode::PARTIAL_CONTENT, headers, body).into_response())
}
