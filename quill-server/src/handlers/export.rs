//! Export handlers
//!
//! DOCX is rendered completely and sent with a `Content-Length`. PDF is
//! streamed: the encoder runs on the blocking pool and the response is only
//! committed once its first chunk exists, so any failure before that point
//! still becomes a clean JSON error.

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::sink::ChannelSink;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use futures::stream::{self, StreamExt};
use quill_core::{Book, Delivery, ExportFormat, ExportFraming};
use tokio_stream::wrappers::ReceiverStream;

/// GET /api/export/:id/docx
pub async fn export_docx(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    export(state, user, &id, ExportFormat::Docx).await
}

/// GET /api/export/:id/pdf
pub async fn export_pdf(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    export(state, user, &id, ExportFormat::Pdf).await
}

async fn export(
    state: AppState,
    user: uuid::Uuid,
    id: &str,
    format: ExportFormat,
) -> Result<Response, ApiError> {
    let book = state.exporter.resolve(id, user).await?;
    let framing = ExportFraming::new(format, &book.title);
    tracing::info!(book_id = %book.id, format = %format, "Export started");

    match format.delivery() {
        Delivery::Buffered => buffered(state, book, format, framing).await,
        Delivery::Streamed => streamed(state, book, format, framing).await,
    }
}

async fn buffered(
    state: AppState,
    book: Book,
    format: ExportFormat,
    framing: ExportFraming,
) -> Result<Response, ApiError> {
    let exporter = state.exporter.clone();

    // Encoding is CPU-bound
    let bytes = tokio::task::spawn_blocking(move || exporter.render_buffered(&book, format))
        .await
        .map_err(|e| ApiError::Internal(format!("Export task failed: {}", e)))??;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, framing.content_type)
        .header(header::CONTENT_DISPOSITION, framing.content_disposition())
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn streamed(
    state: AppState,
    book: Book,
    format: ExportFormat,
    framing: ExportFraming,
) -> Result<Response, ApiError> {
    let (mut sink, mut rx) = ChannelSink::channel(state.stream.chunk_bytes, state.stream.queue_depth);
    let exporter = state.exporter.clone();
    let book_id = book.id;

    let task = tokio::task::spawn_blocking(move || {
        let result = exporter.render_streaming(&book, format, &mut sink);
        if let Err(e) = &result {
            sink.fail(&e.to_string());
        }
        result
    });

    // Hold the response until there is something to send
    let first = match rx.recv().await {
        Some(Ok(chunk)) => chunk,
        Some(Err(_)) | None => {
            return match task.await {
                Ok(Err(e)) => Err(e.into()),
                Ok(Ok(_)) => Err(ApiError::Internal("Encoder produced no output".to_string())),
                Err(e) => Err(ApiError::Internal(format!("Export task failed: {}", e))),
            };
        }
    };

    tokio::spawn(async move {
        // Success and encoder failures are logged by the exporter
        if let Err(e) = task.await {
            tracing::error!(book_id = %book_id, error = %e, "Export task panicked");
        }
    });

    let body = stream::once(async move { Ok::<_, std::io::Error>(first) }).chain(ReceiverStream::new(rx));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, framing.content_type)
        .header(header::CONTENT_DISPOSITION, framing.content_disposition())
        .body(Body::from_stream(body))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
