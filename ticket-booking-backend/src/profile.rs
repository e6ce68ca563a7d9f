use std::sync::Arc;

use serde::Serialize;
use ticket_booking_store::{ItemId, PeopleService, StoreError};
use tracing::{error, info, instrument};

use crate::bookings::{to_item, BookingList};
use crate::form::Notice;
use crate::record::BookingRecord;
use crate::submission::resolve_passengers;

pub const UPDATE_SUCCEEDED: &str = "Data updated successfully.";
pub const UPDATE_FAILED: &str = "Error updating data.";
pub const DELETE_FAILED: &str = "Error deleting booking.";

pub fn delete_succeeded(id: ItemId) -> String {
    format!("Booking with ID: {id} deleted successfully.")
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    ReadOnly,
    Editing,
}

#[derive(thiserror::Error, Debug)]
pub enum ProfileError {
    #[error("booking {0} is not part of this profile")]
    UnknownBooking(ItemId),
    #[error("booking {booking} has no passenger {index}")]
    NoSuchPassenger { booking: ItemId, index: usize },
    #[error("the profile is read only, start editing first")]
    NotEditing,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Passengers that could not be matched to a site user while saving one booking.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Unresolved {
    pub booking: ItemId,
    pub passengers: Vec<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView<'a> {
    pub contact: &'a str,
    pub mode: ViewMode,
    pub bookings: &'a [BookingRecord],
    pub notice: Option<&'a Notice>,
}

/// Every booking made with one email address or phone number.
pub struct ProfileEditor {
    bookings: BookingList,
    people: Arc<dyn PeopleService>,
    contact: String,
    records: Vec<BookingRecord>,
    /// Records as loaded, restored by [`ProfileEditor::cancel`].
    saved: Vec<BookingRecord>,
    mode: ViewMode,
    notice: Option<Notice>,
}

impl ProfileEditor {
    pub async fn open(
        bookings: BookingList,
        people: Arc<dyn PeopleService>,
        contact: &str,
    ) -> Result<Self, StoreError> {
        let mut editor = Self {
            bookings,
            people,
            contact: contact.trim().to_owned(),
            records: Vec::new(),
            saved: Vec::new(),
            mode: ViewMode::ReadOnly,
            notice: None,
        };
        editor.load().await?;
        Ok(editor)
    }

    #[instrument(skip(self), fields(contact = %self.contact))]
    pub async fn load(&mut self) -> Result<&[BookingRecord], StoreError> {
        self.records = self.bookings.find_by_contact(&self.contact).await?;
        self.saved = self.records.clone();
        self.mode = ViewMode::ReadOnly;
        info!("loaded {} bookings", self.records.len());
        Ok(&self.records)
    }

    pub fn contact(&self) -> &str {
        &self.contact
    }

    pub fn records(&self) -> &[BookingRecord] {
        &self.records
    }

    pub const fn mode(&self) -> ViewMode {
        self.mode
    }

    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn view(&self) -> ProfileView<'_> {
        ProfileView {
            contact: &self.contact,
            mode: self.mode,
            bookings: &self.records,
            notice: self.notice.as_ref(),
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn edit(&mut self) {
        self.notice = None;
        self.mode = ViewMode::Editing;
    }

    /// Leaves edit mode and drops unsaved changes.
    pub fn cancel(&mut self) {
        self.notice = None;
        self.records = self.saved.clone();
        self.mode = ViewMode::ReadOnly;
    }

    fn editable(&mut self, id: ItemId) -> Result<&mut BookingRecord, ProfileError> {
        if self.mode != ViewMode::Editing {
            return Err(ProfileError::NotEditing);
        }
        self.records
            .iter_mut()
            .find(|record| record.id == Some(id))
            .ok_or(ProfileError::UnknownBooking(id))
    }

    /// Replaces the edited fields of one booking. The stored document link is kept.
    pub fn replace(&mut self, id: ItemId, mut record: BookingRecord) -> Result<(), ProfileError> {
        let current = self.editable(id)?;
        record.id = Some(id);
        record.document_url = current.document_url.take();
        record.uploaded_file = None;
        *current = record;
        Ok(())
    }

    pub fn add_passenger(&mut self, id: ItemId) -> Result<(), ProfileError> {
        self.editable(id)?.add_passenger();
        Ok(())
    }

    pub fn remove_passenger(&mut self, id: ItemId, index: usize) -> Result<(), ProfileError> {
        self.editable(id)?
            .remove_passenger(index)
            .map(|_| ())
            .ok_or(ProfileError::NoSuchPassenger { booking: id, index })
    }

    /// Writes every displayed booking back and returns to the read only view.
    ///
    /// Passenger names are resolved again. The document column is never written. When a
    /// write fails, bookings written before it stay saved and survive a later cancel.
    #[instrument(skip(self), fields(contact = %self.contact))]
    pub async fn save(&mut self) -> Result<Vec<Unresolved>, ProfileError> {
        if self.mode != ViewMode::Editing {
            return Err(ProfileError::NotEditing);
        }
        let mut unresolved = Vec::new();
        for record in &self.records {
            let Some(id) = record.id else {
                continue;
            };
            let resolution = resolve_passengers(self.people.as_ref(), &record.passenger_names()).await;
            if let Err(err) = self
                .bookings
                .update(id, to_item(record, &resolution.ids, None))
                .await
            {
                error!("updating booking {id} failed: {err}");
                self.notice = Some(Notice::error(UPDATE_FAILED));
                return Err(err.into());
            }
            if let Some(saved) = self.saved.iter_mut().find(|saved| saved.id == Some(id)) {
                saved.clone_from(record);
            }
            if !resolution.unresolved.is_empty() {
                unresolved.push(Unresolved {
                    booking: id,
                    passengers: resolution.unresolved,
                });
            }
        }
        self.saved = self.records.clone();
        self.mode = ViewMode::ReadOnly;
        self.notice = Some(Notice::success(UPDATE_SUCCEEDED));
        Ok(unresolved)
    }

    #[instrument(skip(self), fields(contact = %self.contact))]
    pub async fn delete(&mut self, id: ItemId) -> Result<(), ProfileError> {
        if !self.records.iter().any(|record| record.id == Some(id)) {
            return Err(ProfileError::UnknownBooking(id));
        }
        match self.bookings.delete(id).await {
            Ok(()) => {
                self.records.retain(|record| record.id != Some(id));
                self.saved.retain(|record| record.id != Some(id));
                self.notice = Some(Notice::success(delete_succeeded(id)));
                Ok(())
            }
            Err(err) => {
                error!("deleting booking {id} failed: {err}");
                self.notice = Some(Notice::error(DELETE_FAILED));
                Err(err.into())
            }
        }
    }
}
