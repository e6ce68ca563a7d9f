use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use ticket_booking_store::ItemId;

use crate::error::AppError;
use crate::profile::{ProfileEditor, ProfileView};
use crate::record::BookingRecord;
use crate::session::Session;
use crate::{AppState, SessionState};

type ProfileResponse = Result<(Session, Json<Value>), AppError>;

fn view(profile: &ProfileView<'_>) -> Result<Json<Value>, AppError> {
    Ok(Json(serde_json::to_value(profile)?))
}

fn editor(state: &mut SessionState) -> Result<&mut ProfileEditor, AppError> {
    state.profile.as_mut().ok_or(AppError::NoProfile)
}

#[derive(Deserialize)]
pub struct Lookup {
    contact: String,
}

/// Loads every booking made with the given email address or phone number.
pub async fn open(
    State(state): State<AppState>,
    session: Session,
    Json(Lookup { contact }): Json<Lookup>,
) -> ProfileResponse {
    if contact.trim().is_empty() {
        return Err(AppError::MissingContact);
    }
    let mut guard = state.lock(&session)?;
    let context = state.context();
    let opened =
        ProfileEditor::open(context.bookings(), Arc::clone(&context.site.people), &contact)
            .await?;
    let profile = guard.profile.insert(opened);
    let view = view(&profile.view())?;
    Ok((session, view))
}

pub async fn show(State(state): State<AppState>, session: Session) -> ProfileResponse {
    let mut guard = state.lock(&session)?;
    let view = view(&editor(&mut guard)?.view())?;
    Ok((session, view))
}

pub async fn edit(State(state): State<AppState>, session: Session) -> ProfileResponse {
    let mut guard = state.lock(&session)?;
    let profile = editor(&mut guard)?;
    profile.edit();
    let view = view(&profile.view())?;
    Ok((session, view))
}

pub async fn cancel(State(state): State<AppState>, session: Session) -> ProfileResponse {
    let mut guard = state.lock(&session)?;
    let profile = editor(&mut guard)?;
    profile.cancel();
    let view = view(&profile.view())?;
    Ok((session, view))
}

pub async fn replace(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ItemId>,
    Json(record): Json<BookingRecord>,
) -> ProfileResponse {
    let mut guard = state.lock(&session)?;
    let profile = editor(&mut guard)?;
    profile.replace(id, record)?;
    let view = view(&profile.view())?;
    Ok((session, view))
}

pub async fn add_passenger(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ItemId>,
) -> ProfileResponse {
    let mut guard = state.lock(&session)?;
    let profile = editor(&mut guard)?;
    profile.add_passenger(id)?;
    let view = view(&profile.view())?;
    Ok((session, view))
}

pub async fn remove_passenger(
    State(state): State<AppState>,
    session: Session,
    Path((id, index)): Path<(ItemId, usize)>,
) -> ProfileResponse {
    let mut guard = state.lock(&session)?;
    let profile = editor(&mut guard)?;
    profile.remove_passenger(id, index)?;
    let view = view(&profile.view())?;
    Ok((session, view))
}

pub async fn save(State(state): State<AppState>, session: Session) -> ProfileResponse {
    let mut guard = state.lock(&session)?;
    let profile = editor(&mut guard)?;
    let unresolved = profile.save().await?;
    let Json(view) = view(&profile.view())?;
    Ok((
        session,
        Json(json!({
            "unresolved": unresolved,
            "view": view,
        })),
    ))
}

pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ItemId>,
) -> ProfileResponse {
    let mut guard = state.lock(&session)?;
    let profile = editor(&mut guard)?;
    profile.delete(id).await?;
    let view = view(&profile.view())?;
    Ok((session, view))
}
