pub mod bookings;
pub mod error;
pub mod form;
pub mod live;
pub mod profile;
pub mod record;
pub mod routes;
pub mod session;
pub mod submission;
pub mod validation;
pub mod webpart;
pub mod wizard;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::handler::Handler;
use axum::Router;
use chrono::NaiveDate;
use error::AppError;
use http::Method;
use profile::ProfileEditor;
use session::Session;
use ticket_booking_config::{Config, SessionConfig};
use ticket_booking_store::Site;
use tokio::net::TcpListener;
use tokio::sync::OwnedMutexGuard;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, error, info, warn};
use webpart::{BookingWebPart, WebPartContext};

/// What one browser session works on.
pub struct SessionState {
    pub booking: BookingWebPart,
    pub profile: Option<ProfileEditor>,
}

struct SessionEntry {
    state: Arc<tokio::sync::Mutex<SessionState>>,
    last_used: Instant,
}

impl SessionEntry {
    /// A request of this session holds the state.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.state) > 1
    }

    fn close(self, id: &str) {
        match Arc::try_unwrap(self.state) {
            Ok(state) => state.into_inner().booking.teardown(),
            Err(_) => warn!("session {id} was dropped while in use"),
        }
    }
}

type Sessions = HashMap<String, SessionEntry>;

#[derive(Clone)]
pub struct AppState {
    context: WebPartContext,
    description: Arc<str>,
    sessions: Arc<Mutex<Sessions>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl AppState {
    pub fn new(context: WebPartContext, description: &str, limits: &SessionConfig) -> Self {
        Self {
            context,
            description: description.into(),
            sessions: Arc::default(),
            idle_timeout: Duration::from_secs(limits.idle_minutes.saturating_mul(60)),
            max_sessions: limits.max_sessions,
        }
    }

    pub const fn context(&self) -> &WebPartContext {
        &self.context
    }

    /// Locks the state of `session`, mounting a fresh form for unknown sessions.
    ///
    /// Requests of the same session are not queued: a second one fails with
    /// [`AppError::Busy`] while the first is still running.
    pub fn lock(&self, session: &Session) -> Result<OwnedMutexGuard<SessionState>, AppError> {
        let state = {
            let mut sessions = self.sessions.lock().map_err(|_| AppError::Poisoned)?;
            let now = Instant::now();
            if !sessions.contains_key(session.id()) {
                self.evict(&mut sessions, now);
            }
            let entry = sessions
                .entry(session.id().to_owned())
                .or_insert_with(|| SessionEntry {
                    state: Arc::new(tokio::sync::Mutex::new(SessionState {
                        booking: BookingWebPart::render(&self.context, &*self.description),
                        profile: None,
                    })),
                    last_used: now,
                });
            entry.last_used = now;
            Arc::clone(&entry.state)
        };
        state.try_lock_owned().map_err(|_| AppError::Busy)
    }

    /// Unmounts idle sessions, then the least recently used ones while the map is full.
    /// Sessions with a running request are never dropped.
    fn evict(&self, sessions: &mut Sessions, now: Instant) {
        let idle: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| {
                !entry.in_use() && now.saturating_duration_since(entry.last_used) >= self.idle_timeout
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in idle {
            if let Some(entry) = sessions.remove(&id) {
                debug!("dropping idle session");
                entry.close(&id);
            }
        }

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .filter(|(_, entry)| !entry.in_use())
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            else {
                warn!("all {} sessions are busy", sessions.len());
                break;
            };
            if let Some(entry) = sessions.remove(&oldest) {
                debug!("dropping the least recently used session");
                entry.close(&oldest);
            }
        }
    }

    pub fn session_count(&self) -> Result<usize, AppError> {
        Ok(self
            .sessions
            .lock()
            .map_err(|_| AppError::Poisoned)?
            .len())
    }
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[derive(Default)]
struct MyRouter {
    router: Router<AppState>,
}

impl MyRouter {
    #[track_caller]
    #[must_use]
    pub fn route<T: 'static, H: Handler<T, AppState>>(
        self,
        method: &'static Method,
        path: &'static str,
        handler: H,
    ) -> Self {
        Self {
            router: self.router.route(
                path,
                match *method {
                    Method::GET => axum::routing::get(handler),
                    Method::POST => axum::routing::post(handler),
                    Method::PUT => axum::routing::put(handler),
                    Method::DELETE => axum::routing::delete(handler),
                    _ => unreachable!(),
                },
            ),
        }
    }

    pub fn finish(self) -> Router<AppState> {
        self.router
    }
}

pub fn setup_server(site: Site, config: &Config) -> Router {
    info!("starting up server...");

    let context = WebPartContext::new(site, &config.store);
    let state = AppState::new(context, &config.description, &config.sessions);

    let my_router = MyRouter::default()
        .route(&Method::GET, "/booking", routes::booking::show)
        .route(&Method::POST, "/booking/fields", routes::booking::change_field)
        .route(
            &Method::POST,
            "/booking/passengers",
            routes::booking::set_passenger_count,
        )
        .route(&Method::POST, "/booking/file", routes::booking::attach_file)
        .route(&Method::DELETE, "/booking/file", routes::booking::remove_file)
        .route(&Method::POST, "/booking/next", routes::booking::next)
        .route(&Method::POST, "/booking/back", routes::booking::back)
        .route(&Method::POST, "/booking/step/:index", routes::booking::select)
        .route(&Method::POST, "/booking/submit", routes::booking::submit)
        .route(&Method::POST, "/booking/notice/dismiss", routes::booking::dismiss_notice)
        .route(&Method::POST, "/profile", routes::profile::open)
        .route(&Method::GET, "/profile", routes::profile::show)
        .route(&Method::POST, "/profile/edit", routes::profile::edit)
        .route(&Method::POST, "/profile/cancel", routes::profile::cancel)
        .route(&Method::POST, "/profile/save", routes::profile::save)
        .route(&Method::PUT, "/profile/bookings/:id", routes::profile::replace)
        .route(
            &Method::DELETE,
            "/profile/bookings/:id",
            routes::profile::delete,
        )
        .route(
            &Method::POST,
            "/profile/bookings/:id/passengers",
            routes::profile::add_passenger,
        )
        .route(
            &Method::DELETE,
            "/profile/bookings/:id/passengers/:index",
            routes::profile::remove_passenger,
        );

    my_router
        .finish()
        .with_state(state)
        .layer(CatchPanicLayer::new())
}

pub async fn run_server(site: Site, config: Config) -> Result<(), AppError> {
    let app = setup_server(site, &config);
    let listener = TcpListener::bind(&config.listen_address).await?;
    info!("listening on {}", config.listen_address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    warn!("server shut down");
    Ok(())
}

#[allow(clippy::redundant_pub_crate)]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use http::{HeaderMap, HeaderValue};
    use ticket_booking_config::{SessionConfig, StoreConfig};
    use ticket_booking_store::{MemoryStore, Site};

    use super::AppState;
    use crate::error::AppError;
    use crate::form::FieldChange;
    use crate::session::{Session, COOKIE_NAME_SESSION};
    use crate::webpart::WebPartContext;

    fn state(idle_minutes: u64, max_sessions: usize) -> AppState {
        let site = Site::from_store(Arc::new(MemoryStore::new()));
        AppState::new(
            WebPartContext::new(site, &StoreConfig::default()),
            "Ticket Booking",
            &SessionConfig {
                idle_minutes,
                max_sessions,
            },
        )
    }

    fn session(id: char) -> Session {
        let mut headers = HeaderMap::new();
        let value = format!("{COOKIE_NAME_SESSION}={}", id.to_string().repeat(30));
        headers.insert(http::header::COOKIE, HeaderValue::from_str(&value).unwrap());
        Session::from_headers(&headers)
    }

    #[test]
    fn cookieless_requests_stay_bounded() -> Result<(), AppError> {
        let state = state(30, 16);
        for _ in 0..1000 {
            drop(state.lock(&Session::from_headers(&HeaderMap::new()))?);
        }
        assert_eq!(state.session_count()?, 16);
        Ok(())
    }

    #[test]
    fn least_recently_used_session_is_dropped_first() -> Result<(), AppError> {
        let state = state(30, 2);
        let (a, b) = (session('a'), session('b'));
        state
            .lock(&a)?
            .booking
            .wizard_mut()
            .apply(FieldChange::FullName("alice smith".into()), crate::today())?;
        drop(state.lock(&b)?);
        drop(state.lock(&a)?);

        drop(state.lock(&session('c'))?);
        assert_eq!(state.session_count()?, 2);
        assert_eq!(
            state.lock(&a)?.booking.wizard().form().record.full_name,
            "Alice Smith"
        );
        Ok(())
    }

    #[test]
    fn idle_sessions_are_unmounted() -> Result<(), AppError> {
        let state = state(0, 100);
        let a = session('a');
        state
            .lock(&a)?
            .booking
            .wizard_mut()
            .apply(FieldChange::FullName("alice smith".into()), crate::today())?;

        drop(state.lock(&session('b'))?);
        assert_eq!(state.session_count()?, 1);
        assert_eq!(state.lock(&a)?.booking.wizard().form().record.full_name, "");
        Ok(())
    }

    #[test]
    fn busy_sessions_are_kept() -> Result<(), AppError> {
        let state = state(0, 1);
        let held = state.lock(&session('a'))?;
        drop(state.lock(&session('b'))?);
        assert_eq!(state.session_count()?, 2);
        drop(held);
        Ok(())
    }
}
