//! The checks that gate each wizard step.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::{BookingRecord, IdentityProof};

/// Field key to message. Empty means valid.
pub type FieldErrors = BTreeMap<String, String>;

pub mod field {
    pub const FULL_NAME: &str = "fullName";
    pub const EMAIL: &str = "email";
    pub const PASSWORD: &str = "password";
    pub const PHONE_NUMBER: &str = "phoneNumber";
    pub const AGE: &str = "age";
    pub const GENDER: &str = "gender";
    pub const DEPARTURE_CITY: &str = "departureCity";
    pub const DESTINATION_CITY: &str = "destinationCity";
    pub const TRAVEL_DATE: &str = "travelDate";
    pub const RETURN_DATE: &str = "returnDate";
    pub const TRAVEL_TIME: &str = "travelTime";
    pub const PASSENGER_NAMES: &str = "passengerNames";
    pub const PASSENGER_AGES: &str = "passengerAges";
    pub const PASSENGER_NAME_PREFIX: &str = "passengerName";
    pub const PASSENGER_AGE_PREFIX: &str = "passengerAge";
    pub const IDENTITY_PROOF: &str = "identityProof";
    pub const IDENTITY_PROOF_NUMBER: &str = "identityProofNumber";
    pub const FILE: &str = "file";
    pub const SEAT_TYPE: &str = "seatType";
    pub const CARD_NUMBER: &str = "cardNumber";
    pub const EXPIRY_DATE: &str = "expiryDate";
    pub const CVV: &str = "cvv";

    pub fn passenger_name(index: usize) -> String {
        format!("{PASSENGER_NAME_PREFIX}{index}")
    }

    pub fn passenger_age(index: usize) -> String {
        format!("{PASSENGER_AGE_PREFIX}{index}")
    }
}

pub const CITY_COLLISION: &str = "Departure and Destination cannot be the same.";
pub const TRAVEL_DATE_IN_PAST: &str = "Travel date cannot be in the past.";
pub const RETURN_DATE_INVALID: &str =
    "Return date should be after travel date and not the current date.";

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("pattern is a valid regex")
}

static EMAIL: Lazy<Regex> = Lazy::new(|| regex(r"^\S+@\S+\.\S+$"));
static TEN_DIGITS: Lazy<Regex> = Lazy::new(|| regex(r"^[0-9]{10}$"));
static LETTERS_AND_SPACES: Lazy<Regex> = Lazy::new(|| regex(r"^[A-Za-z\s]+$"));
static AADHAR: Lazy<Regex> = Lazy::new(|| regex(r"^[0-9]{12}$"));
static PASSPORT: Lazy<Regex> =
    Lazy::new(|| regex(r"^[A-PR-WYa-pr-wy][1-9][0-9]\s?[0-9]{4}[1-9]$"));
static VOTER_ID: Lazy<Regex> = Lazy::new(|| regex(r"^[A-Z]{3}[0-9]{7}$"));
static CARD_NUMBER: Lazy<Regex> = Lazy::new(|| regex(r"^[0-9]{16}$"));
static CVV: Lazy<Regex> = Lazy::new(|| regex(r"^[0-9]{3}$"));

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    UserInformation,
    TravelDetails,
    PassengerInformation,
    TicketPreferences,
    PaymentDetails,
    AdditionalInformation,
}

impl Step {
    pub const ALL: [Self; 6] = [
        Self::UserInformation,
        Self::TravelDetails,
        Self::PassengerInformation,
        Self::TicketPreferences,
        Self::PaymentDetails,
        Self::AdditionalInformation,
    ];
    pub const COUNT: usize = Self::ALL.len();

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::UserInformation => "User Information",
            Self::TravelDetails => "Travel Details",
            Self::PassengerInformation => "Passenger Information",
            Self::TicketPreferences => "Ticket Preferences",
            Self::PaymentDetails => "Payment Details",
            Self::AdditionalInformation => "Additional Information",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub const fn is_last(self) -> bool {
        matches!(self, Self::AdditionalInformation)
    }

    /// Whether `key` names a field validated by this step.
    pub fn owns(self, key: &str) -> bool {
        match self {
            Self::UserInformation => [
                field::FULL_NAME,
                field::EMAIL,
                field::PASSWORD,
                field::PHONE_NUMBER,
                field::AGE,
                field::GENDER,
            ]
            .contains(&key),
            Self::TravelDetails => [
                field::DEPARTURE_CITY,
                field::DESTINATION_CITY,
                field::TRAVEL_DATE,
                field::RETURN_DATE,
                field::TRAVEL_TIME,
            ]
            .contains(&key),
            Self::PassengerInformation => {
                key.starts_with(field::PASSENGER_NAME_PREFIX)
                    || key.starts_with(field::PASSENGER_AGE_PREFIX)
                    || [field::IDENTITY_PROOF, field::IDENTITY_PROOF_NUMBER, field::FILE]
                        .contains(&key)
            }
            Self::TicketPreferences => key == field::SEAT_TYPE,
            Self::PaymentDetails => {
                [field::CARD_NUMBER, field::EXPIRY_DATE, field::CVV].contains(&key)
            }
            Self::AdditionalInformation => false,
        }
    }

    pub fn validate(self, record: &BookingRecord, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match self {
            Self::UserInformation => user_information(record, &mut errors),
            Self::TravelDetails => travel_details(record, today, &mut errors),
            Self::PassengerInformation => passenger_information(record, &mut errors),
            Self::TicketPreferences => {
                if record.seat_type.is_none() {
                    errors.insert(field::SEAT_TYPE.into(), "Seat type is required.".into());
                }
            }
            Self::PaymentDetails => payment_details(record, today, &mut errors),
            Self::AdditionalInformation => {}
        }
        errors
    }
}

/// Runs every step in order and returns the first one that fails.
pub fn validate_all(record: &BookingRecord, today: NaiveDate) -> Result<(), (Step, FieldErrors)> {
    Step::ALL
        .into_iter()
        .map(|step| (step, step.validate(record, today)))
        .find(|(_, errors)| !errors.is_empty())
        .map_or(Ok(()), Err)
}

fn user_information(record: &BookingRecord, errors: &mut FieldErrors) {
    if record.full_name.trim().is_empty() {
        errors.insert(field::FULL_NAME.into(), "Full name is required.".into());
    }

    if record.email.is_empty() {
        errors.insert(field::EMAIL.into(), "Email is required.".into());
    } else if !EMAIL.is_match(&record.email) {
        errors.insert(field::EMAIL.into(), "Email format is invalid.".into());
    }

    if record.password.is_empty() {
        errors.insert(field::PASSWORD.into(), "Password is required.".into());
    } else if record.password.chars().count() < 6 {
        errors.insert(
            field::PASSWORD.into(),
            "Password must be at least 6 characters long.".into(),
        );
    }

    if record.phone_number.is_empty() {
        errors.insert(field::PHONE_NUMBER.into(), "Phone number is required.".into());
    } else if !TEN_DIGITS.is_match(&record.phone_number) {
        errors.insert(
            field::PHONE_NUMBER.into(),
            "Phone number must be a valid 10-digit number.".into(),
        );
    }

    match record.age {
        None => {
            errors.insert(field::AGE.into(), "Age is required.".into());
        }
        Some(age) if !(1..100).contains(&age) => {
            errors.insert(
                field::AGE.into(),
                "Age must be a valid number between 1 and 99.".into(),
            );
        }
        Some(_) => {}
    }

    if record.gender.is_none() {
        errors.insert(field::GENDER.into(), "Gender is required.".into());
    }
}

fn travel_details(record: &BookingRecord, today: NaiveDate, errors: &mut FieldErrors) {
    if record.departure_city.is_empty() {
        errors.insert(field::DEPARTURE_CITY.into(), "Departure city is required.".into());
    }
    if record.destination_city.is_empty() {
        errors.insert(
            field::DESTINATION_CITY.into(),
            "Destination city is required.".into(),
        );
    }
    if let Some(collision) = city_collision(&record.departure_city, &record.destination_city) {
        errors.insert(field::DEPARTURE_CITY.into(), collision.into());
        errors.insert(field::DESTINATION_CITY.into(), collision.into());
    }

    match record.travel_date {
        None => {
            errors.insert(field::TRAVEL_DATE.into(), "Travel date is required.".into());
        }
        Some(date) if date < today => {
            errors.insert(field::TRAVEL_DATE.into(), TRAVEL_DATE_IN_PAST.into());
        }
        Some(_) => {}
    }

    if let Some(return_date) = record.return_date {
        if !return_date_is_valid(return_date, record.travel_date, today) {
            errors.insert(field::RETURN_DATE.into(), RETURN_DATE_INVALID.into());
        }
    }

    if record.travel_time.is_empty() {
        errors.insert(field::TRAVEL_TIME.into(), "Travel time is required.".into());
    }
}

pub(crate) fn city_collision(departure: &str, destination: &str) -> Option<&'static str> {
    (!departure.is_empty() && departure == destination).then_some(CITY_COLLISION)
}

pub(crate) fn return_date_is_valid(
    return_date: NaiveDate,
    travel_date: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    return_date > today && travel_date.map_or(true, |travel_date| return_date > travel_date)
}

fn passenger_information(record: &BookingRecord, errors: &mut FieldErrors) {
    for (index, passenger) in record.passengers().iter().enumerate() {
        let number = index + 1;
        let name = passenger.name.trim();
        let message = if name.is_empty() {
            Some(format!("Passenger {number} name is required."))
        } else if !LETTERS_AND_SPACES.is_match(&passenger.name) {
            Some(format!("Passenger {number} name should contain only alphabets."))
        } else if name.chars().count() < 3 {
            Some(format!(
                "Passenger {number} name must be at least 3 characters long."
            ))
        } else {
            None
        };
        if let Some(message) = message {
            errors.insert(field::passenger_name(index), message);
        }

        match passenger.age {
            None => {
                errors.insert(
                    field::passenger_age(index),
                    format!("Passenger {number} age required."),
                );
            }
            Some(age) if !(1..100).contains(&age) => {
                errors.insert(
                    field::passenger_age(index),
                    format!("Passenger {number} age must be a valid number between 1 and 99."),
                );
            }
            Some(_) => {}
        }
    }

    if record.number_of_passengers() == 0 {
        errors.insert(
            field::PASSENGER_NAMES.into(),
            "At least one passenger name is required.".into(),
        );
        errors.insert(
            field::PASSENGER_AGES.into(),
            "At least one passenger age is required.".into(),
        );
    }

    if record.identity_proof.is_none() {
        errors.insert(field::IDENTITY_PROOF.into(), "Identity proof is required.".into());
    }

    if record.identity_proof_number.is_empty() {
        errors.insert(
            field::IDENTITY_PROOF_NUMBER.into(),
            "Identity proof number is required.".into(),
        );
    } else if let Some(proof) = record.identity_proof {
        if let Some(message) = identity_number_error(proof, &record.identity_proof_number) {
            errors.insert(field::IDENTITY_PROOF_NUMBER.into(), message.into());
        }
    }

    match &record.uploaded_file {
        None => {
            errors.insert(field::FILE.into(), "File is required.".into());
        }
        Some(file) if !file.has_accepted_type() => {
            errors.insert(
                field::FILE.into(),
                "Only image files (.png, .jpg, .jpeg) or PDFs are allowed.".into(),
            );
        }
        Some(_) => {}
    }
}

/// Checks a document number against the format of its document type.
pub fn identity_number_error(proof: IdentityProof, number: &str) -> Option<&'static str> {
    match proof {
        IdentityProof::Aadhar if !AADHAR.is_match(number) => {
            Some("Aadhar number must be a 12-digit number.")
        }
        IdentityProof::Passport if !PASSPORT.is_match(number) => {
            Some("Invalid passport number format.")
        }
        IdentityProof::VoterId if !VOTER_ID.is_match(number) => Some("Invalid Voter ID format."),
        _ => None,
    }
}

fn payment_details(record: &BookingRecord, today: NaiveDate, errors: &mut FieldErrors) {
    if record.card_number.is_empty() {
        errors.insert(field::CARD_NUMBER.into(), "Card number is required.".into());
    } else if !CARD_NUMBER.is_match(&record.card_number) {
        errors.insert(
            field::CARD_NUMBER.into(),
            "Card number must be a 16-digit number.".into(),
        );
    }

    match record.expiry_date {
        None => {
            errors.insert(field::EXPIRY_DATE.into(), "Expiry date is required.".into());
        }
        Some(date) if date < today => {
            errors.insert(
                field::EXPIRY_DATE.into(),
                "Expiry date must be in the future.".into(),
            );
        }
        Some(_) => {}
    }

    if record.cvv.is_empty() {
        errors.insert(field::CVV.into(), "CVV is required.".into());
    } else if !CVV.is_match(&record.cvv) {
        errors.insert(field::CVV.into(), "CVV must be a 3-digit number.".into());
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::{Days, NaiveDate};

    use super::{field, identity_number_error, validate_all, Step, CITY_COLLISION};
    use crate::record::{BookingRecord, Gender, IdentityProof, SeatType, UploadedFile};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn valid_record() -> BookingRecord {
        let mut record = BookingRecord::new();
        record.full_name = "Alice Smith".into();
        record.email = "alice@example.org".into();
        record.password = "secret".into();
        record.phone_number = "9876543210".into();
        record.gender = Some(Gender::Female);
        record.age = Some(34);
        record.departure_city = "Delhi".into();
        record.destination_city = "Mumbai".into();
        record.travel_date = Some(today());
        record.travel_time = "09:00".into();
        record.set_passengers(vec!["Bob Jones".into()], vec![Some(40)]);
        record.identity_proof = Some(IdentityProof::Aadhar);
        record.identity_proof_number = "123456789012".into();
        record.uploaded_file = Some(UploadedFile::new(
            "aadhar.pdf",
            "application/pdf",
            Bytes::from_static(b"%PDF"),
        ));
        record.seat_type = Some(SeatType::Sleeper);
        record.card_number = "4111111111111111".into();
        record.expiry_date = Some(today().checked_add_days(Days::new(365)).unwrap());
        record.cvv = "123".into();
        record
    }

    #[test]
    fn valid_record_passes_every_step() {
        assert_eq!(validate_all(&valid_record(), today()), Ok(()));
    }

    #[test]
    fn empty_record_fails_on_the_first_step() {
        let (step, errors) = validate_all(&BookingRecord::new(), today()).unwrap_err();
        assert_eq!(step, Step::UserInformation);
        assert_eq!(errors[field::FULL_NAME], "Full name is required.");
        assert_eq!(errors[field::AGE], "Age is required.");
        assert_eq!(errors[field::GENDER], "Gender is required.");
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn user_information_formats() {
        let mut record = valid_record();
        record.email = "alice@example".into();
        record.password = "12345".into();
        record.phone_number = "12345".into();
        record.age = Some(100);
        let errors = Step::UserInformation.validate(&record, today());
        assert_eq!(errors[field::EMAIL], "Email format is invalid.");
        assert_eq!(
            errors[field::PASSWORD],
            "Password must be at least 6 characters long."
        );
        assert_eq!(
            errors[field::PHONE_NUMBER],
            "Phone number must be a valid 10-digit number."
        );
        assert_eq!(
            errors[field::AGE],
            "Age must be a valid number between 1 and 99."
        );
    }

    #[test]
    fn same_cities_collide() {
        let mut record = valid_record();
        record.destination_city = "Delhi".into();
        let errors = Step::TravelDetails.validate(&record, today());
        assert_eq!(errors[field::DEPARTURE_CITY], CITY_COLLISION);
        assert_eq!(errors[field::DESTINATION_CITY], CITY_COLLISION);

        record.destination_city = "Mumbai".into();
        assert!(Step::TravelDetails.validate(&record, today()).is_empty());
    }

    #[test]
    fn travel_date_in_the_past() {
        let mut record = valid_record();
        record.travel_date = today().pred_opt();
        let errors = Step::TravelDetails.validate(&record, today());
        assert_eq!(errors[field::TRAVEL_DATE], "Travel date cannot be in the past.");

        record.travel_date = today().succ_opt();
        assert!(Step::TravelDetails.validate(&record, today()).is_empty());
    }

    #[test]
    fn return_date_must_follow_travel_date() {
        let mut record = valid_record();
        record.travel_date = today().checked_add_days(Days::new(3));
        record.return_date = today().checked_add_days(Days::new(3));
        assert!(Step::TravelDetails
            .validate(&record, today())
            .contains_key(field::RETURN_DATE));

        record.return_date = today().checked_add_days(Days::new(4));
        assert!(Step::TravelDetails.validate(&record, today()).is_empty());
    }

    #[test]
    fn passenger_names_and_ages() {
        let mut record = valid_record();
        record.set_passengers(
            vec![String::new(), "B0b".into(), "Al".into()],
            vec![None, Some(0), Some(12)],
        );
        let errors = Step::PassengerInformation.validate(&record, today());
        assert_eq!(errors["passengerName0"], "Passenger 1 name is required.");
        assert_eq!(
            errors["passengerName1"],
            "Passenger 2 name should contain only alphabets."
        );
        assert_eq!(
            errors["passengerName2"],
            "Passenger 3 name must be at least 3 characters long."
        );
        assert_eq!(errors["passengerAge0"], "Passenger 1 age required.");
        assert_eq!(
            errors["passengerAge1"],
            "Passenger 2 age must be a valid number between 1 and 99."
        );
        assert!(!errors.contains_key("passengerAge2"));
    }

    #[test]
    fn no_passengers() {
        let mut record = valid_record();
        record.set_number_of_passengers(0);
        let errors = Step::PassengerInformation.validate(&record, today());
        assert!(errors.contains_key(field::PASSENGER_NAMES));
        assert!(errors.contains_key(field::PASSENGER_AGES));
    }

    #[test]
    fn identity_numbers() {
        assert_eq!(
            identity_number_error(IdentityProof::Aadhar, "12345"),
            Some("Aadhar number must be a 12-digit number.")
        );
        assert_eq!(identity_number_error(IdentityProof::Aadhar, "123456789012"), None);
        assert_eq!(identity_number_error(IdentityProof::Passport, "A1234567"), None);
        assert_eq!(identity_number_error(IdentityProof::Passport, "a12 34567"), None);
        assert!(identity_number_error(IdentityProof::Passport, "Q1234567").is_some());
        assert_eq!(identity_number_error(IdentityProof::VoterId, "ABC1234567"), None);
        assert!(identity_number_error(IdentityProof::VoterId, "abc1234567").is_some());
    }

    #[test]
    fn uploaded_file_is_required_with_an_accepted_type() {
        let mut record = valid_record();
        record.uploaded_file = None;
        let errors = Step::PassengerInformation.validate(&record, today());
        assert_eq!(errors[field::FILE], "File is required.");

        record.uploaded_file = Some(UploadedFile::new("notes.txt", "text/plain", Bytes::new()));
        let errors = Step::PassengerInformation.validate(&record, today());
        assert_eq!(
            errors[field::FILE],
            "Only image files (.png, .jpg, .jpeg) or PDFs are allowed."
        );
    }

    #[test]
    fn payment_details() {
        let mut record = valid_record();
        record.card_number = "1234".into();
        record.cvv = "12a".into();
        record.expiry_date = today().pred_opt();
        let errors = Step::PaymentDetails.validate(&record, today());
        assert_eq!(errors[field::CARD_NUMBER], "Card number must be a 16-digit number.");
        assert_eq!(errors[field::CVV], "CVV must be a 3-digit number.");
        assert_eq!(errors[field::EXPIRY_DATE], "Expiry date must be in the future.");

        record.card_number = "4111111111111111".into();
        assert!(!Step::PaymentDetails
            .validate(&record, today())
            .contains_key(field::CARD_NUMBER));
    }

    #[test]
    fn steps_own_their_fields() {
        assert!(Step::PassengerInformation.owns("passengerAge2"));
        assert!(Step::TravelDetails.owns(field::RETURN_DATE));
        assert!(!Step::TravelDetails.owns(field::FULL_NAME));
        assert!(!Step::AdditionalInformation.owns(field::CVV));
        assert_eq!(Step::UserInformation.previous(), None);
        assert_eq!(Step::PaymentDetails.next(), Some(Step::AdditionalInformation));
        assert_eq!(Step::AdditionalInformation.next(), None);
    }
}
