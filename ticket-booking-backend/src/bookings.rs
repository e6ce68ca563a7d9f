//! Maps booking records to items of the booking list and back.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat};
use serde_json::Value;
use ticket_booking_store::models::{DocumentLink, LookupIds, LookupValue};
use ticket_booking_store::schema::booking;
use ticket_booking_store::{Filter, Item, ItemId, ListStore, Query, StoreError, UserId};
use tracing::{instrument, warn};

use crate::record::{BookingRecord, Passenger};

pub const DOCUMENT_DESCRIPTION: &str = "Uploaded File";

/// Dates are written as UTC midnight in RFC 3339.
pub fn format_date(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(value)
        .map(|date_time| date_time.naive_utc().date())
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .ok()
}

fn join_ages(ages: &[Option<u32>]) -> String {
    ages.iter()
        .map(|age| age.map(|age| age.to_string()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_ages(value: &str) -> Vec<Option<u32>> {
    if value.is_empty() {
        return Vec::new();
    }
    value
        .split('\n')
        .map(|age| age.trim().parse().ok())
        .collect()
}

/// Orders the passengers the way they are stored: those with a user reference first, in
/// `passenger_ids` order, then the rest. Reading back pairs the expanded names with the
/// leading ages, so unresolved passengers keep their age next to an empty name.
fn stored_passengers<'a>(
    record: &'a BookingRecord,
    passenger_ids: &[Option<UserId>],
) -> (Vec<UserId>, Vec<&'a Passenger>) {
    let (resolved, unresolved): (Vec<_>, Vec<_>) = record
        .passengers()
        .iter()
        .enumerate()
        .map(|(index, passenger)| (passenger_ids.get(index).copied().flatten(), passenger))
        .partition(|(id, _)| id.is_some());
    let ids = resolved.iter().filter_map(|(id, _)| *id).collect();
    let passengers = resolved
        .into_iter()
        .chain(unresolved)
        .map(|(_, passenger)| passenger)
        .collect();
    (ids, passengers)
}

/// The list item for `record`. `DocumentFile` is only written when a document url is given.
///
/// `passenger_ids` holds one optional user per passenger, as [`resolve_passengers`] returns.
///
/// [`resolve_passengers`]: crate::submission::resolve_passengers
pub fn to_item(
    record: &BookingRecord,
    passenger_ids: &[Option<UserId>],
    document_url: Option<&str>,
) -> Item {
    let (ids, passengers) = stored_passengers(record, passenger_ids);
    let ages: Vec<Option<u32>> = passengers.iter().map(|passenger| passenger.age).collect();
    let mut item = Item::new();
    let mut set = |key: &str, value: Value| {
        item.insert(key.to_owned(), value);
    };
    set(booking::TITLE, record.full_name.clone().into());
    set(booking::EMAIL, record.email.clone().into());
    set(booking::PHONE, record.phone_number.clone().into());
    set(booking::PASSWORD, record.password.clone().into());
    set(
        booking::GENDER_TYPE,
        record.gender.map(|gender| gender.key()).into(),
    );
    set(booking::USER_AGE, record.age.into());
    set(booking::DEPARTURE_CITY, record.departure_city.clone().into());
    set(booking::DESTINATION_CITY, record.destination_city.clone().into());
    set(booking::TRAVEL_DATE, record.travel_date.map(format_date).into());
    set(booking::RETURN_DATE, record.return_date.map(format_date).into());
    set(booking::TRAVEL_TIME, record.travel_time.clone().into());
    set(
        booking::NUMBER_OF_PASSENGERS,
        record.number_of_passengers().into(),
    );
    set(
        booking::PASSENGERS_TRAVELLING_WITH_ID,
        serde_json::to_value(LookupIds { results: ids })
        .unwrap_or(Value::Null),
    );
    set(
        booking::PASSENGER_AGES,
        join_ages(&ages).into(),
    );
    set(
        booking::IDENTITY_PROOF,
        record.identity_proof.map(|proof| proof.key()).into(),
    );
    set(
        booking::IDENTITY_PROOF_NUMBER,
        record.identity_proof_number.clone().into(),
    );
    set(
        booking::SEAT_TYPES,
        record.seat_type.map(|seat_type| seat_type.key()).into(),
    );
    set(booking::WINDOW_PREFERENCE, record.window_seat_preference.into());
    set(
        booking::FOOD,
        record.food_preference.map(|food| food.key()).into(),
    );
    set(booking::INSURANCE, record.insurance_option.into());
    set(booking::CARD_NUMBER, record.card_number.clone().into());
    set(
        booking::EXPIRY_DATE,
        record
            .expiry_date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .into(),
    );
    set(booking::CVV, record.cvv.clone().into());
    set(booking::ADDITIONAL_INFO, record.additional_info.clone().into());
    if let Some(url) = document_url {
        set(
            booking::DOCUMENT_FILE,
            serde_json::to_value(DocumentLink {
                url: url.to_owned(),
                description: DOCUMENT_DESCRIPTION.to_owned(),
            })
            .unwrap_or(Value::Null),
        );
    }
    item
}

fn text(item: &Item, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}

fn number(item: &Item, key: &str) -> Option<u64> {
    match item.get(key)? {
        Value::Number(value) => value.as_u64(),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}

fn flag(item: &Item, key: &str) -> bool {
    item.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn option<T: core::str::FromStr>(item: &Item, key: &str) -> Option<T> {
    let value = text(item, key);
    if value.is_empty() {
        return None;
    }
    let parsed = value.parse().ok();
    if parsed.is_none() {
        warn!("ignoring unknown {key} {value:?}");
    }
    parsed
}

fn date(item: &Item, key: &str) -> Option<NaiveDate> {
    let value = text(item, key);
    if value.is_empty() {
        return None;
    }
    let parsed = parse_date(&value);
    if parsed.is_none() {
        warn!("ignoring malformed {key} {value:?}");
    }
    parsed
}

/// Reads a record back. Passenger names come from the expanded people lookup.
pub fn from_item(item: &Item) -> Result<BookingRecord, StoreError> {
    let id = number(item, booking::ID).ok_or(StoreError::MissingField(booking::ID))?;

    let mut record = BookingRecord::new();
    record.id = Some(id);
    record.full_name = text(item, booking::TITLE);
    record.email = text(item, booking::EMAIL);
    record.password = text(item, booking::PASSWORD);
    record.phone_number = text(item, booking::PHONE);
    record.gender = option(item, booking::GENDER_TYPE);
    record.age = number(item, booking::USER_AGE).and_then(|age| u32::try_from(age).ok());
    record.departure_city = text(item, booking::DEPARTURE_CITY);
    record.destination_city = text(item, booking::DESTINATION_CITY);
    record.travel_date = date(item, booking::TRAVEL_DATE);
    record.return_date = date(item, booking::RETURN_DATE);
    record.travel_time = text(item, booking::TRAVEL_TIME);

    let names: Vec<String> = item
        .get(booking::PASSENGERS_TRAVELLING_WITH)
        .cloned()
        .map(serde_json::from_value::<Vec<LookupValue>>)
        .transpose()?
        .unwrap_or_default()
        .into_iter()
        .map(|passenger| passenger.title)
        .collect();
    let ages = split_ages(&text(item, booking::PASSENGER_AGES));
    record.set_passengers(names, ages);
    if let Some(count) = number(item, booking::NUMBER_OF_PASSENGERS)
        .and_then(|count| usize::try_from(count).ok())
        .filter(|count| *count > record.number_of_passengers())
    {
        record.set_number_of_passengers(count);
    }

    record.identity_proof = option(item, booking::IDENTITY_PROOF);
    record.identity_proof_number = text(item, booking::IDENTITY_PROOF_NUMBER);
    record.seat_type = option(item, booking::SEAT_TYPES);
    record.window_seat_preference = flag(item, booking::WINDOW_PREFERENCE);
    record.food_preference = option(item, booking::FOOD);
    record.insurance_option = flag(item, booking::INSURANCE);
    record.card_number = text(item, booking::CARD_NUMBER);
    record.expiry_date = date(item, booking::EXPIRY_DATE);
    record.cvv = text(item, booking::CVV);
    record.additional_info = text(item, booking::ADDITIONAL_INFO);
    record.document_url = item
        .get(booking::DOCUMENT_FILE)
        .filter(|value| !value.is_null())
        .cloned()
        .map(serde_json::from_value::<DocumentLink>)
        .transpose()?
        .map(|link| link.url);
    Ok(record)
}

/// The booking list of one site.
#[derive(Clone)]
pub struct BookingList {
    lists: Arc<dyn ListStore>,
    title: String,
}

impl BookingList {
    pub fn new(lists: Arc<dyn ListStore>, title: impl Into<String>) -> Self {
        Self {
            lists,
            title: title.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    #[instrument(skip(self, item), fields(list = %self.title))]
    pub async fn create(&self, item: Item) -> Result<ItemId, StoreError> {
        let created = self.lists.add(&self.title, item).await?;
        number(&created, booking::ID).ok_or(StoreError::MissingField(booking::ID))
    }

    #[instrument(skip(self, item), fields(list = %self.title))]
    pub async fn update(&self, id: ItemId, item: Item) -> Result<(), StoreError> {
        self.lists.update(&self.title, id, item).await
    }

    #[instrument(skip(self), fields(list = %self.title))]
    pub async fn delete(&self, id: ItemId) -> Result<(), StoreError> {
        self.lists.delete(&self.title, id).await
    }

    /// Every booking whose email or phone equals `contact`.
    #[instrument(skip(self), fields(list = %self.title))]
    pub async fn find_by_contact(&self, contact: &str) -> Result<Vec<BookingRecord>, StoreError> {
        let query = Query::new()
            .filter(Filter::eq(booking::EMAIL, contact).or(Filter::eq(booking::PHONE, contact)))
            .select(booking::SELECT.iter().copied())
            .expand(booking::PASSENGERS_TRAVELLING_WITH);
        self.lists
            .filter(&self.title, &query)
            .await?
            .iter()
            .map(from_item)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use ticket_booking_store::StoreError;

    use super::{format_date, from_item, parse_date, to_item};
    use crate::record::{BookingRecord, Gender, SeatType};

    #[test]
    fn dates_are_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
        assert_eq!(format_date(date), "2026-11-02T00:00:00.000Z");
        assert_eq!(parse_date("2026-11-02T00:00:00Z"), Some(date));
        assert_eq!(parse_date("2026-11-02"), Some(date));
        assert_eq!(parse_date("next tuesday"), None);
    }

    #[test]
    fn writes_the_list_columns() {
        let mut record = BookingRecord::new();
        record.full_name = "Alice Smith".into();
        record.gender = Some(Gender::Female);
        record.seat_type = Some(SeatType::NonAc);
        record.set_passengers(vec!["Bob Jones".into(), "Carol White".into()], vec![Some(40), None]);
        record.expiry_date = NaiveDate::from_ymd_opt(2028, 1, 31);
        record.card_number = "4111111111111111".into();

        let item = to_item(&record, &[Some(7), Some(9)], Some("/sites/Travel/Shared Documents/id.pdf"));
        assert_eq!(item["Title"], json!("Alice Smith"));
        assert_eq!(item["GenderType"], json!("Female"));
        assert_eq!(item["SeatTypes"], json!("Non-AC"));
        assert_eq!(item["NumberOfPassengers"], json!(2));
        assert_eq!(item["PassengersTravellingWithId"], json!({ "results": [7, 9] }));
        assert_eq!(item["PassengerAges"], json!("40\n"));
        assert_eq!(item["ExpiryDate"], json!("2028-01-31"));
        assert_eq!(item["CardNumber"], json!("4111111111111111"));
        assert_eq!(item["TravelDate"], json!(null));
        assert_eq!(
            item["DocumentFile"],
            json!({ "Url": "/sites/Travel/Shared Documents/id.pdf", "Description": "Uploaded File" })
        );

        assert!(!to_item(&record, &[], None).contains_key("DocumentFile"));
    }

    #[test]
    fn unresolved_passengers_are_written_last() -> Result<(), StoreError> {
        let mut record = BookingRecord::new();
        record.set_passengers(
            vec!["Bob Jones".into(), "Carol White".into(), "Dan Green".into()],
            vec![Some(40), Some(8), Some(61)],
        );

        let mut item = to_item(&record, &[None, Some(9), Some(4)], None);
        assert_eq!(item["PassengersTravellingWithId"], json!({ "results": [9, 4] }));
        assert_eq!(item["PassengerAges"], json!("8\n61\n40"));

        item.insert("Id".into(), json!(3));
        item.insert(
            "PassengersTravellingWith".into(),
            json!([{ "Title": "Carol White" }, { "Title": "Dan Green" }]),
        );
        let reloaded = from_item(&item)?;
        assert_eq!(reloaded.passenger_names(), ["Carol White", "Dan Green", ""]);
        assert_eq!(reloaded.passenger_ages(), [Some(8), Some(61), Some(40)]);
        Ok(())
    }

    #[test]
    fn reads_expanded_items() -> Result<(), StoreError> {
        let item = json!({
            "Id": 12,
            "Title": "Alice Smith",
            "Phone": "9876543210",
            "UserAge": 34,
            "GenderType": "Female",
            "TravelDate": "2026-11-02T00:00:00.000Z",
            "NumberOfPassengers": 3,
            "PassengersTravellingWith": [{ "Title": "Bob Jones" }],
            "PassengerAges": "40\n12",
            "IdentityProof": "Voter ID",
            "SeatTypes": "Bus",
            "WindowPreference": true,
            "DocumentFile": { "Url": "/docs/id.pdf", "Description": "Uploaded File" },
        });
        let record = from_item(item.as_object().unwrap())?;
        assert_eq!(record.id, Some(12));
        assert_eq!(record.age, Some(34));
        assert_eq!(record.travel_date, NaiveDate::from_ymd_opt(2026, 11, 2));
        assert_eq!(record.passenger_names(), ["Bob Jones", "", ""]);
        assert_eq!(record.passenger_ages(), [Some(40), Some(12), None]);
        assert_eq!(record.seat_type, None);
        assert!(record.window_seat_preference);
        assert_eq!(record.document_url.as_deref(), Some("/docs/id.pdf"));
        Ok(())
    }

    #[test]
    fn items_without_id_are_rejected() {
        let item = json!({ "Title": "Alice Smith" });
        assert!(matches!(
            from_item(item.as_object().unwrap()),
            Err(StoreError::MissingField("Id"))
        ));
    }
}
