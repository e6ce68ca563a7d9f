use thiserror::Error;

use crate::ItemId;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("connection to the site failed {0}")]
    Io(#[from] std::io::Error),
    #[error("http error {0}")]
    Hyper(#[from] hyper::Error),
    #[error("failed to build request {0}")]
    Request(#[from] hyper::http::Error),
    #[error("unexpected response body {0}")]
    Json(#[from] serde_json::Error),
    #[error("site answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("item {0} does not exist")]
    NotFound(ItemId),
    #[error("no user matches {0:?}")]
    UserNotFound(String),
    #[error("response is missing the {0} field")]
    MissingField(&'static str),
    #[error("the store is unavailable: {0}")]
    Unavailable(String),
    #[error("store state is poisoned")]
    Poisoned,
}
