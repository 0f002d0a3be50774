use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use shape_stream_common::frame::Frame;
use shape_stream_common::mjpeg::CONTENT_TYPE;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::slot::FrameSlot;
use crate::stream::StreamProducer;

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub struct AppState {
    slot: FrameSlot,
    producer: Arc<StreamProducer>,
    template: String,
    next_seq: AtomicU64,
    frames_received: AtomicU64,
    rejected_payloads: AtomicU64,
}

impl AppState {
    pub fn new(slot: FrameSlot, producer: Arc<StreamProducer>, template: String) -> Self {
        Self {
            slot,
            producer,
            template,
            next_seq: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            rejected_payloads: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Serialize)]
struct Status {
    frames_received: u64,
    rejected_payloads: u64,
    last_seq: Option<u64>,
    last_captured_at_ms: Option<i64>,
    algorithm: String,
    template: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(stream_frames).post(ingest_frame))
        .route("/frame", get(latest_frame))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /: body is one encoded frame. Undecodable payloads are rejected and
/// the slot keeps the last good frame.
async fn ingest_frame(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let seq = state.next_seq.fetch_add(1, Ordering::Relaxed);
    let captured_at_ms = Utc::now().timestamp_millis();
    let size = body.len();
    let result =
        tokio::task::spawn_blocking(move || Frame::decode(&body, captured_at_ms, seq)).await;

    match result {
        Ok(Ok(frame)) => {
            debug!(seq, size, width = frame.width(), height = frame.height(), "frame ingested");
            state.slot.set(frame);
            state.frames_received.fetch_add(1, Ordering::Relaxed);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(Err(e)) => {
            warn!(error = %e, seq, size, "rejecting undecodable frame");
            state.rejected_payloads.fetch_add(1, Ordering::Relaxed);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "spawn_blocking failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /: endless multipart stream of annotated frames.
async fn stream_frames(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!(matcher = state.producer.matcher_name(), "stream client connected");
    let body = Body::from_stream(Arc::clone(&state.producer).stream());
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body)
}

/// GET /frame: the current frame, annotated, as a single JPEG.
async fn latest_frame(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(frame) = state.slot.try_snapshot() else {
        return (StatusCode::NOT_FOUND, "no frame received yet").into_response();
    };
    let producer = Arc::clone(&state.producer);
    let result = tokio::task::spawn_blocking(move || producer.render(&frame)).await;

    match result {
        Ok(Ok(rendered)) => ([(header::CONTENT_TYPE, "image/jpeg")], rendered.jpeg).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "failed to encode annotated frame");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "spawn_blocking failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /status
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.slot.try_snapshot();
    Json(Status {
        frames_received: state.frames_received.load(Ordering::Relaxed),
        rejected_payloads: state.rejected_payloads.load(Ordering::Relaxed),
        last_seq: snapshot.as_ref().map(|f| f.seq),
        last_captured_at_ms: snapshot.as_ref().map(|f| f.captured_at_ms),
        algorithm: state.producer.matcher_name().to_string(),
        template: state.template.clone(),
    })
}
