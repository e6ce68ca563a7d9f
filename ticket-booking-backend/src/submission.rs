use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use ticket_booking_store::{DocumentLibrary, ItemId, PeopleService, Site, StoreError, UserId};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::bookings::{to_item, BookingList};
use crate::record::BookingRecord;
use crate::validation::{FieldErrors, Step};

#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error("{} has invalid fields", .step.title())]
    Invalid { step: Step, errors: FieldErrors },
    #[error("uploading the document failed: {0}")]
    UploadFailed(#[source] StoreError),
    #[error("saving the booking failed: {0}")]
    PersistenceFailed(#[source] StoreError),
    #[error("the booking is already being submitted")]
    AlreadySubmitting,
}

/// Outcome of resolving passenger names to site users.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// One entry per passenger, `None` for blank or unknown names.
    pub ids: Vec<Option<UserId>>,
    pub unresolved: Vec<String>,
}

/// Looks every non-blank name up at once. Failed lookups end up in `unresolved`.
pub async fn resolve_passengers(people: &dyn PeopleService, names: &[String]) -> Resolution {
    let lookups = names.iter().map(|name| async move {
        if name.trim().is_empty() {
            return (name, None);
        }
        (name, Some(people.ensure_user(name).await))
    });

    let mut resolution = Resolution::default();
    for (name, result) in join_all(lookups).await {
        match result {
            Some(Ok(id)) => resolution.ids.push(Some(id)),
            Some(Err(err)) => {
                warn!("could not resolve passenger {name:?}: {err}");
                resolution.ids.push(None);
                resolution.unresolved.push(name.clone());
            }
            None => resolution.ids.push(None),
        }
    }
    resolution
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Submitted {
    pub id: ItemId,
    pub document_url: Option<String>,
    /// Passengers that were saved without a user reference.
    pub unresolved_passengers: Vec<String>,
}

/// Uploads the identity document, resolves the passengers and stores the booking.
pub struct SubmissionPipeline {
    documents: Arc<dyn DocumentLibrary>,
    people: Arc<dyn PeopleService>,
    bookings: BookingList,
    document_folder: String,
    in_flight: Mutex<()>,
}

impl SubmissionPipeline {
    pub fn new(site: &Site, list_title: &str, document_folder: &str) -> Self {
        Self {
            documents: Arc::clone(&site.documents),
            people: Arc::clone(&site.people),
            bookings: BookingList::new(Arc::clone(&site.lists), list_title),
            document_folder: document_folder.to_owned(),
            in_flight: Mutex::new(()),
        }
    }

    pub const fn bookings(&self) -> &BookingList {
        &self.bookings
    }

    pub fn people(&self) -> Arc<dyn PeopleService> {
        Arc::clone(&self.people)
    }

    /// Whether a submit is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Runs the steps one after another. Nothing is stored when the upload fails.
    #[instrument(skip_all, fields(passengers = record.number_of_passengers()))]
    pub async fn submit(&self, record: &BookingRecord) -> Result<Submitted, SubmitError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| SubmitError::AlreadySubmitting)?;

        let document_url = match &record.uploaded_file {
            Some(file) => Some(
                self.documents
                    .upload(&self.document_folder, &file.name, file.content.clone(), true)
                    .await
                    .map_err(|err| {
                        error!("uploading {} failed: {err}", file.name);
                        SubmitError::UploadFailed(err)
                    })?,
            ),
            None => None,
        };

        let resolution = resolve_passengers(self.people.as_ref(), &record.passenger_names()).await;

        let item = to_item(record, &resolution.ids, document_url.as_deref());
        let id = self.bookings.create(item).await.map_err(|err| {
            error!("saving the booking failed: {err}");
            SubmitError::PersistenceFailed(err)
        })?;
        info!("stored booking {id}");

        Ok(Submitted {
            id,
            document_url,
            unresolved_passengers: resolution.unresolved,
        })
    }
}
