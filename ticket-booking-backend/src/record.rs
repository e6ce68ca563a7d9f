use core::fmt::{self, Display};
use core::str::FromStr;

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ticket_booking_store::ItemId;

/// Defines a closed set of dropdown keys together with their display text.
macro_rules! options {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $key:literal, $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub const fn key(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            pub const fn text(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            pub fn options() -> Vec<DropdownOption> {
                Self::ALL
                    .iter()
                    .map(|option| DropdownOption {
                        key: option.key(),
                        text: option.text(),
                    })
                    .collect()
            }
        }

        impl FromStr for $name {
            type Err = UnknownOption;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($key => Ok(Self::$variant),)+
                    other => Err(UnknownOption(other.to_owned())),
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        }
    };
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("unknown option {0:?}")]
pub struct UnknownOption(pub String);

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropdownOption {
    pub key: &'static str,
    pub text: &'static str,
}

options!(Gender {
    Male => "Male", "Male",
    Female => "Female", "Female",
    Other => "Other", "Other",
});

options!(IdentityProof {
    Aadhar => "Aadhar", "Aadhar",
    Passport => "Passport", "Passport",
    VoterId => "Voter ID", "Voter ID",
});

options!(SeatType {
    Sleeper => "Sleeper", "Sleeper",
    Seater => "Seater", "Seater",
    Ac => "AC", "AC",
    NonAc => "Non-AC", "Non-AC",
});

options!(FoodPreference {
    Veg => "Veg", "Vegetarian",
    NonVeg => "NonVeg", "Non-Vegetarian",
});

pub const CITIES: &[&str] = &[
    "Delhi",
    "Mumbai",
    "Bangalore",
    "Chennai",
    "Kolkata",
    "Hyderabad",
    "Ahmedabad",
    "Pune",
    "Jaipur",
    "Lucknow",
];

/// Departure slots, key and display text.
pub const TRAVEL_TIMES: &[(&str, &str)] = &[
    ("08:00", "08:00 AM"),
    ("09:00", "09:00 AM"),
    ("10:00", "10:00 AM"),
    ("11:00", "11:00 AM"),
    ("12:00", "12:00 PM"),
    ("01:00", "01:00 PM"),
    ("02:00", "02:00 PM"),
    ("03:00", "03:00 PM"),
    ("04:00", "04:00 PM"),
    ("05:00", "05:00 PM"),
];

/// Passenger counts the form offers.
pub const PASSENGER_COUNTS: &[usize] = &[1, 2, 3];

pub const ACCEPTED_DOCUMENT_TYPES: &[&str] =
    &["image/png", "image/jpg", "image/jpeg", "application/pdf"];

/// An identity document picked in the form, kept until the booking is submitted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, content: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            content,
        }
    }

    /// Compares the mime essence, so `image/png; charset=binary` counts as `image/png`.
    pub fn has_accepted_type(&self) -> bool {
        self.content_type
            .parse::<mime::Mime>()
            .map(|mime| ACCEPTED_DOCUMENT_TYPES.contains(&mime.essence_str()))
            .unwrap_or(false)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Passenger {
    pub name: String,
    pub age: Option<u32>,
}

/// A bus ticket booking, from the empty draft to the stored list item.
///
/// Passengers are stored as one sequence of name/age pairs, so the passenger count and
/// both per-passenger sequences cannot drift apart.
///
/// Card number and CVV are kept and stored in plain text. That is how the booking list is
/// laid out and it is a known weakness of the list schema.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: Option<ItemId>,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub departure_city: String,
    pub destination_city: String,
    pub travel_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub travel_time: String,
    passengers: Vec<Passenger>,
    pub identity_proof: Option<IdentityProof>,
    pub identity_proof_number: String,
    pub uploaded_file: Option<UploadedFile>,
    /// Where the identity document ended up after the upload.
    pub document_url: Option<String>,
    pub seat_type: Option<SeatType>,
    pub window_seat_preference: bool,
    pub food_preference: Option<FoodPreference>,
    pub insurance_option: bool,
    pub card_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub cvv: String,
    pub additional_info: String,
}

impl Default for BookingRecord {
    fn default() -> Self {
        Self {
            id: None,
            full_name: String::new(),
            email: String::new(),
            password: String::new(),
            phone_number: String::new(),
            gender: None,
            age: None,
            departure_city: String::new(),
            destination_city: String::new(),
            travel_date: None,
            return_date: None,
            travel_time: String::new(),
            passengers: vec![Passenger::default()],
            identity_proof: None,
            identity_proof_number: String::new(),
            uploaded_file: None,
            document_url: None,
            seat_type: None,
            window_seat_preference: false,
            food_preference: None,
            insurance_option: false,
            card_number: String::new(),
            expiry_date: None,
            cvv: String::new(),
            additional_info: String::new(),
        }
    }
}

impl BookingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number_of_passengers(&self) -> usize {
        self.passengers.len()
    }

    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    pub fn passenger_names(&self) -> Vec<String> {
        self.passengers.iter().map(|p| p.name.clone()).collect()
    }

    pub fn passenger_ages(&self) -> Vec<Option<u32>> {
        self.passengers.iter().map(|p| p.age).collect()
    }

    /// Keeps the first `min(old, count)` passengers and appends empty ones.
    pub fn set_number_of_passengers(&mut self, count: usize) {
        self.passengers.resize_with(count, Passenger::default);
    }

    /// Builds the passenger list from the two stored sequences. The shorter one is padded.
    pub fn set_passengers(&mut self, names: Vec<String>, ages: Vec<Option<u32>>) {
        let count = names.len().max(ages.len());
        let mut names = names.into_iter();
        let mut ages = ages.into_iter();
        self.passengers = (0..count)
            .map(|_| Passenger {
                name: names.next().unwrap_or_default(),
                age: ages.next().flatten(),
            })
            .collect();
    }

    pub fn passenger_mut(&mut self, index: usize) -> Option<&mut Passenger> {
        self.passengers.get_mut(index)
    }

    pub fn add_passenger(&mut self) {
        self.passengers.push(Passenger {
            name: String::new(),
            age: Some(0),
        });
    }

    pub fn remove_passenger(&mut self, index: usize) -> Option<Passenger> {
        (index < self.passengers.len()).then(|| self.passengers.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::{BookingRecord, FoodPreference, IdentityProof, SeatType, UploadedFile};

    #[test]
    fn empty_draft_has_one_passenger_slot() {
        let record = BookingRecord::new();
        assert_eq!(record.number_of_passengers(), 1);
        assert_eq!(record.passenger_names(), vec![String::new()]);
        assert_eq!(record.passenger_ages(), vec![None]);
    }

    #[test]
    fn resizing_keeps_existing_passengers() {
        let mut record = BookingRecord::new();
        record.set_passengers(
            vec!["Alice Smith".to_owned(), "Bob Jones".to_owned()],
            vec![Some(30), Some(41)],
        );

        record.set_number_of_passengers(3);
        assert_eq!(record.passenger_names(), ["Alice Smith", "Bob Jones", ""]);
        assert_eq!(record.passenger_ages(), [Some(30), Some(41), None]);

        record.set_number_of_passengers(1);
        assert_eq!(record.passenger_names(), ["Alice Smith"]);
        assert_eq!(record.passenger_ages(), [Some(30)]);
    }

    #[test]
    fn shorter_sequence_is_padded() {
        let mut record = BookingRecord::new();
        record.set_passengers(vec!["Alice Smith".to_owned()], vec![Some(30), Some(12)]);
        assert_eq!(record.number_of_passengers(), 2);
        assert_eq!(record.passenger_names(), ["Alice Smith", ""]);
    }

    #[test]
    fn editor_adds_and_removes_passengers() {
        let mut record = BookingRecord::new();
        record.add_passenger();
        assert_eq!(record.passenger_ages(), [None, Some(0)]);
        assert!(record.remove_passenger(5).is_none());
        assert!(record.remove_passenger(0).is_some());
        assert_eq!(record.number_of_passengers(), 1);
    }

    #[test]
    fn option_keys_round_trip() {
        assert_eq!("Voter ID".parse(), Ok(IdentityProof::VoterId));
        assert_eq!(SeatType::NonAc.key(), "Non-AC");
        assert_eq!(FoodPreference::NonVeg.text(), "Non-Vegetarian");
        assert!("Bus".parse::<SeatType>().is_err());
    }

    #[test]
    fn document_types() {
        let pdf = UploadedFile::new("id.pdf", "application/pdf", bytes::Bytes::new());
        let png = UploadedFile::new("id.png", "image/png; charset=binary", bytes::Bytes::new());
        let text = UploadedFile::new("id.txt", "text/plain", bytes::Bytes::new());
        let garbage = UploadedFile::new("id", "not a mime", bytes::Bytes::new());
        assert!(pdf.has_accepted_type());
        assert!(png.has_accepted_type());
        assert!(!text.has_accepted_type());
        assert!(!garbage.has_accepted_type());
    }
}
