use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::live;
use crate::record::{
    BookingRecord, FoodPreference, Gender, IdentityProof, Passenger, SeatType, UploadedFile,
};
use crate::validation::{city_collision, field, FieldErrors, Step};

pub const BOOKING_SUCCESSFUL: &str = "Booking successful!";
pub const SAVE_FAILED: &str = "An error occurred while saving data.";
pub const UPLOAD_FAILED: &str = "File upload failed. Please try again.";
pub const FILL_REQUIRED_FIELDS: &str = "Please fill in all required fields before proceeding.";

/// A dialog message shown above the form until the next action.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Error(message) => message,
        }
    }
}

/// One edit made in the form, as sent by the browser.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum FieldChange {
    FullName(String),
    Email(String),
    Password(String),
    PhoneNumber(String),
    Age(String),
    Gender(Option<Gender>),
    DepartureCity(Option<String>),
    DestinationCity(Option<String>),
    TravelDate(Option<NaiveDate>),
    ReturnDate(Option<NaiveDate>),
    TravelTime(Option<String>),
    NumberOfPassengers(usize),
    PassengerName { index: usize, name: String },
    PassengerAge { index: usize, age: Option<u32> },
    IdentityProof(Option<IdentityProof>),
    IdentityProofNumber(String),
    SeatType(Option<SeatType>),
    WindowSeatPreference(bool),
    FoodPreference(Option<FoodPreference>),
    InsuranceOption(bool),
    CardNumber(String),
    ExpiryDate(Option<NaiveDate>),
    Cvv(String),
    AdditionalInfo(String),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("there is no passenger {0}")]
    NoSuchPassenger(usize),
}

/// The draft booking together with its field errors and the current notice.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct FormState {
    pub record: BookingRecord,
    pub errors: FieldErrors,
    pub notice: Option<Notice>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the empty draft. The notice is left alone.
    pub fn reset(&mut self) {
        self.record = BookingRecord::new();
        self.errors.clear();
    }

    fn set_error(&mut self, key: &str, message: Option<impl Into<String>>) {
        match message {
            Some(message) => {
                self.errors.insert(key.to_owned(), message.into());
            }
            None => {
                self.errors.remove(key);
            }
        }
    }

    /// Replaces the errors of `step` with `errors`, keeping those of every other step.
    pub fn merge_step_errors(&mut self, step: Step, errors: FieldErrors) {
        self.errors.retain(|key, _| !step.owns(key));
        self.errors.extend(errors);
    }

    pub fn attach_file(&mut self, file: UploadedFile) {
        debug!(name = %file.name, content_type = %file.content_type, "attached document");
        self.record.uploaded_file = Some(file);
        self.errors.remove(field::FILE);
    }

    pub fn remove_file(&mut self) {
        self.record.uploaded_file = None;
        self.set_error(field::FILE, Some("File is required."));
    }

    #[allow(clippy::too_many_lines)]
    pub fn apply(&mut self, change: FieldChange, today: NaiveDate) -> Result<(), FormError> {
        match change {
            FieldChange::FullName(value) => {
                let formatted = live::format_name(&value);
                self.set_error(field::FULL_NAME, live::full_name(&formatted));
                self.record.full_name = formatted;
            }
            FieldChange::Email(value) => {
                let stripped = live::strip_whitespace(&value);
                self.set_error(field::EMAIL, live::email(&stripped));
                self.record.email = stripped;
            }
            FieldChange::Password(value) => {
                let stripped = live::strip_whitespace(&value);
                self.set_error(field::PASSWORD, live::password(&stripped));
                self.record.password = stripped;
            }
            FieldChange::PhoneNumber(value) => {
                self.set_error(field::PHONE_NUMBER, live::phone_number(&value));
                self.record.phone_number = value;
            }
            FieldChange::Age(value) => {
                let (age, message) = live::age(&value);
                self.set_error(field::AGE, message);
                self.record.age = age;
            }
            FieldChange::Gender(gender) => {
                self.set_error(field::GENDER, gender.is_none().then_some("Gender is required."));
                self.record.gender = gender;
            }
            FieldChange::DepartureCity(city) => {
                self.record.departure_city = city.unwrap_or_default();
                self.check_cities();
            }
            FieldChange::DestinationCity(city) => {
                self.record.destination_city = city.unwrap_or_default();
                self.check_cities();
            }
            FieldChange::TravelDate(date) => match date.map(|date| live::travel_date(date, today)) {
                Some(Err(message)) => self.set_error(field::TRAVEL_DATE, Some(message)),
                Some(Ok(date)) => {
                    self.errors.remove(field::TRAVEL_DATE);
                    self.record.travel_date = Some(date);
                }
                None => {
                    self.errors.remove(field::TRAVEL_DATE);
                    self.record.travel_date = None;
                }
            },
            FieldChange::ReturnDate(date) => {
                match date.map(|date| live::return_date(date, self.record.travel_date, today)) {
                    Some(Err(message)) => self.set_error(field::RETURN_DATE, Some(message)),
                    Some(Ok(date)) => {
                        self.errors.remove(field::RETURN_DATE);
                        self.record.return_date = Some(date);
                    }
                    None => {
                        self.errors.remove(field::RETURN_DATE);
                        self.record.return_date = None;
                    }
                }
            }
            FieldChange::TravelTime(time) => {
                let time = time.unwrap_or_default();
                self.set_error(
                    field::TRAVEL_TIME,
                    time.is_empty().then_some("Travel time is required."),
                );
                self.record.travel_time = time;
            }
            FieldChange::NumberOfPassengers(count) => self.set_number_of_passengers(count),
            FieldChange::PassengerName { index, name } => {
                let message = name
                    .trim()
                    .is_empty()
                    .then(|| format!("Passenger {} name is required.", index + 1));
                self.passenger(index)?.name = name;
                self.set_error(&field::passenger_name(index), message);
            }
            FieldChange::PassengerAge { index, age } => {
                self.passenger(index)?.age = age;
                self.set_error(&field::passenger_age(index), live::passenger_age(index, age));
            }
            FieldChange::IdentityProof(proof) => {
                self.set_error(
                    field::IDENTITY_PROOF,
                    proof.is_none().then_some("Identity proof is required."),
                );
                self.record.identity_proof = proof;
            }
            FieldChange::IdentityProofNumber(number) => {
                self.set_error(
                    field::IDENTITY_PROOF_NUMBER,
                    number
                        .is_empty()
                        .then_some("Identity proof number is required."),
                );
                self.record.identity_proof_number = number;
            }
            FieldChange::SeatType(seat_type) => {
                self.set_error(
                    field::SEAT_TYPE,
                    seat_type.is_none().then_some("Seat type is required."),
                );
                self.record.seat_type = seat_type;
            }
            FieldChange::WindowSeatPreference(value) => self.record.window_seat_preference = value,
            FieldChange::FoodPreference(value) => self.record.food_preference = value,
            FieldChange::InsuranceOption(value) => self.record.insurance_option = value,
            FieldChange::CardNumber(value) => self.record.card_number = value,
            FieldChange::ExpiryDate(value) => self.record.expiry_date = value,
            FieldChange::Cvv(value) => self.record.cvv = value,
            FieldChange::AdditionalInfo(value) => self.record.additional_info = value,
        }
        Ok(())
    }

    /// Resizes the passenger list and drops errors of passengers that no longer exist.
    pub fn set_number_of_passengers(&mut self, count: usize) {
        self.record.set_number_of_passengers(count);
        self.errors.retain(|key, _| {
            [field::PASSENGER_NAME_PREFIX, field::PASSENGER_AGE_PREFIX]
                .iter()
                .find_map(|prefix| key.strip_prefix(prefix))
                .and_then(|index| index.parse::<usize>().ok())
                .map_or(true, |index| index < count)
        });
    }

    fn passenger(&mut self, index: usize) -> Result<&mut Passenger, FormError> {
        self.record
            .passenger_mut(index)
            .ok_or(FormError::NoSuchPassenger(index))
    }

    fn check_cities(&mut self) {
        let collision = city_collision(&self.record.departure_city, &self.record.destination_city);
        self.set_error(field::DEPARTURE_CITY, collision);
        self.set_error(field::DESTINATION_CITY, collision);
    }
}
