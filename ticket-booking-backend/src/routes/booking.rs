use axum::extract::{Path, Query, State};
use axum::Json;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::AppError;
use crate::form::FieldChange;
use crate::record::{UploadedFile, PASSENGER_COUNTS};
use crate::session::Session;
use crate::{today, AppState, SessionState};

type BookingResponse = Result<(Session, Json<Value>), AppError>;

fn view(state: &SessionState) -> Result<Json<Value>, AppError> {
    Ok(Json(serde_json::to_value(state.booking.view())?))
}

pub async fn show(State(state): State<AppState>, session: Session) -> BookingResponse {
    let guard = state.lock(&session)?;
    let view = view(&guard)?;
    Ok((session, view))
}

pub async fn change_field(
    State(state): State<AppState>,
    session: Session,
    Json(change): Json<FieldChange>,
) -> BookingResponse {
    if let FieldChange::NumberOfPassengers(count) = change {
        if !PASSENGER_COUNTS.contains(&count) {
            return Err(AppError::InvalidPassengerCount(count));
        }
    }
    let mut guard = state.lock(&session)?;
    guard.booking.wizard_mut().apply(change, today())?;
    let view = view(&guard)?;
    Ok((session, view))
}

#[derive(Deserialize)]
pub struct PassengerCount {
    count: usize,
}

pub async fn set_passenger_count(
    State(state): State<AppState>,
    session: Session,
    Json(PassengerCount { count }): Json<PassengerCount>,
) -> BookingResponse {
    if !PASSENGER_COUNTS.contains(&count) {
        return Err(AppError::InvalidPassengerCount(count));
    }
    let mut guard = state.lock(&session)?;
    guard.booking.wizard_mut().set_number_of_passengers(count);
    let view = view(&guard)?;
    Ok((session, view))
}

#[derive(Deserialize)]
pub struct FileName {
    name: Option<String>,
}

/// Takes the raw file as body, its name from the query and its type from `Content-Type`.
pub async fn attach_file(
    State(state): State<AppState>,
    session: Session,
    Query(FileName { name }): Query<FileName>,
    headers: HeaderMap,
    body: Bytes,
) -> BookingResponse {
    let name = name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .ok_or(AppError::MissingFileName)?;
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream");
    info!("attaching {name} ({content_type}, {} bytes)", body.len());

    let mut guard = state.lock(&session)?;
    guard
        .booking
        .wizard_mut()
        .attach_file(UploadedFile::new(name, content_type, body));
    let view = view(&guard)?;
    Ok((session, view))
}

pub async fn remove_file(State(state): State<AppState>, session: Session) -> BookingResponse {
    let mut guard = state.lock(&session)?;
    guard.booking.wizard_mut().remove_file();
    let view = view(&guard)?;
    Ok((session, view))
}

pub async fn next(State(state): State<AppState>, session: Session) -> BookingResponse {
    let mut guard = state.lock(&session)?;
    guard.booking.wizard_mut().next(today());
    let view = view(&guard)?;
    Ok((session, view))
}

pub async fn back(State(state): State<AppState>, session: Session) -> BookingResponse {
    let mut guard = state.lock(&session)?;
    guard.booking.wizard_mut().back();
    let view = view(&guard)?;
    Ok((session, view))
}

pub async fn select(
    State(state): State<AppState>,
    session: Session,
    Path(index): Path<usize>,
) -> BookingResponse {
    let mut guard = state.lock(&session)?;
    guard.booking.wizard_mut().select(index, today());
    let view = view(&guard)?;
    Ok((session, view))
}

pub async fn dismiss_notice(State(state): State<AppState>, session: Session) -> BookingResponse {
    let mut guard = state.lock(&session)?;
    guard.booking.wizard_mut().dismiss_notice();
    let view = view(&guard)?;
    Ok((session, view))
}

pub async fn submit(State(state): State<AppState>, session: Session) -> BookingResponse {
    let mut guard = state.lock(&session)?;
    let submitted = guard.booking.wizard_mut().submit(today()).await?;
    let Json(view) = view(&guard)?;
    Ok((
        session,
        Json(json!({
            "submitted": submitted,
            "view": view,
        })),
    ))
}
