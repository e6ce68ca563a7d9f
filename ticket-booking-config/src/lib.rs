use core::fmt::{Debug, Display};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "booking.toml";
pub const ENV_PREFIX: &str = "BOOKING_";

/// Where the booking list and the uploaded documents live.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Absolute url of the site, e.g. `https://contoso.sharepoint.com/sites/TenantPracticeSite`.
    pub site_url: String,
    pub list_title: String,
    /// Server relative folder the identity documents are uploaded to.
    pub document_folder: String,
    pub access_token: Option<String>,
    /// Keep everything in memory instead of talking to the site.
    pub offline: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            site_url: "https://localhost/sites/TenantPracticeSite".to_owned(),
            list_title: "BusTicketBooking".to_owned(),
            document_folder: "/sites/TenantPracticeSite/Shared Documents".to_owned(),
            access_token: None,
            offline: true,
        }
    }
}

/// Limits for the per browser form state the server keeps in memory.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped together with their draft.
    pub idle_minutes: u64,
    pub max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_minutes: 30,
            max_sessions: 10_000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub listen_address: String,
    /// Free text shown above the form.
    pub description: String,
    pub store: StoreConfig,
    pub sessions: SessionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:3000".to_owned(),
            description: "Ticket Booking".to_owned(),
            store: StoreConfig::default(),
            sessions: SessionConfig::default(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] figment::Error),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

pub fn figment() -> Figment {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn get_config() -> Result<Config, ConfigError> {
    Ok(figment().extract()?)
}
