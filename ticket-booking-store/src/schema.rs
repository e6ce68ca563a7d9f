//! Column names of the booking list.

pub mod booking {
    pub const ID: &str = "Id";
    pub const TITLE: &str = "Title";
    pub const EMAIL: &str = "Email";
    pub const PHONE: &str = "Phone";
    pub const PASSWORD: &str = "Password";
    pub const GENDER_TYPE: &str = "GenderType";
    pub const USER_AGE: &str = "UserAge";
    pub const DEPARTURE_CITY: &str = "DepartureCity";
    pub const DESTINATION_CITY: &str = "DestinationCity";
    pub const TRAVEL_DATE: &str = "TravelDate";
    pub const RETURN_DATE: &str = "ReturnDate";
    pub const TRAVEL_TIME: &str = "TravelTime";
    pub const NUMBER_OF_PASSENGERS: &str = "NumberOfPassengers";
    /// Lookup column holding the resolved passenger user ids.
    pub const PASSENGERS_TRAVELLING_WITH_ID: &str = "PassengersTravellingWithId";
    /// Expanded form of [`PASSENGERS_TRAVELLING_WITH_ID`].
    pub const PASSENGERS_TRAVELLING_WITH: &str = "PassengersTravellingWith";
    pub const PASSENGERS_TRAVELLING_WITH_TITLE: &str = "PassengersTravellingWith/Title";
    pub const PASSENGER_AGES: &str = "PassengerAges";
    pub const IDENTITY_PROOF: &str = "IdentityProof";
    pub const IDENTITY_PROOF_NUMBER: &str = "IdentityProofNumber";
    pub const SEAT_TYPES: &str = "SeatTypes";
    pub const WINDOW_PREFERENCE: &str = "WindowPreference";
    pub const FOOD: &str = "Food";
    pub const INSURANCE: &str = "Insurance";
    pub const CARD_NUMBER: &str = "CardNumber";
    pub const EXPIRY_DATE: &str = "ExpiryDate";
    pub const CVV: &str = "Cvv";
    pub const ADDITIONAL_INFO: &str = "AdditionalInfo";
    pub const DOCUMENT_FILE: &str = "DocumentFile";

    /// Columns read back by the profile view.
    pub const SELECT: &[&str] = &[
        ID,
        TITLE,
        EMAIL,
        PASSWORD,
        PHONE,
        GENDER_TYPE,
        USER_AGE,
        DEPARTURE_CITY,
        DESTINATION_CITY,
        TRAVEL_DATE,
        RETURN_DATE,
        TRAVEL_TIME,
        NUMBER_OF_PASSENGERS,
        PASSENGER_AGES,
        IDENTITY_PROOF,
        IDENTITY_PROOF_NUMBER,
        SEAT_TYPES,
        WINDOW_PREFERENCE,
        FOOD,
        INSURANCE,
        CARD_NUMBER,
        EXPIRY_DATE,
        CVV,
        ADDITIONAL_INFO,
        DOCUMENT_FILE,
        PASSENGERS_TRAVELLING_WITH_TITLE,
    ];
}
