use core::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponseParts, ResponseParts};
use cookie::{Cookie, SameSite};
use http::header::{COOKIE, SET_COOKIE};
use http::request::Parts;
use http::{HeaderMap, HeaderValue};
use rand::{thread_rng, Rng as _};
use tracing::{debug, warn};

pub const COOKIE_NAME_SESSION: &str = "__Host_booking_session";
const SESSION_ID_LENGTH: usize = 30;

/// Identifies the browser a form belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct Session {
    // bool is true when the id is new and the cookie needs to be sent
    id: (String, bool),
}

impl Session {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get_all(COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == COOKIE_NAME_SESSION)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| value.len() == SESSION_ID_LENGTH);
        id.map_or_else(Self::generate, |id| Self { id: (id, false) })
    }

    fn generate() -> Self {
        let id = thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(SESSION_ID_LENGTH)
            .map(char::from)
            .collect();
        debug!("starting a new session");
        Self { id: (id, true) }
    }

    pub fn id(&self) -> &str {
        &self.id.0
    }

    pub const fn is_new(&self) -> bool {
        self.id.1
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let (value, true) = self.id {
            let cookie = Cookie::build((COOKIE_NAME_SESSION, value))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Strict)
                .build();
            match HeaderValue::try_from(cookie.to_string()) {
                Ok(value) => {
                    res.headers_mut().append(SET_COOKIE, value);
                }
                Err(err) => warn!("failed to encode the session cookie: {err}"),
            }
        }
        Ok(res)
    }
}
