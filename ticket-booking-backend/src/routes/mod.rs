pub mod booking;
pub mod profile;
