use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, Request, State},
    middleware::{self, Next},
    response::{Html, Response},
    routing::get,
};
use tower_http::services::ServeDir;
use weather_core::{
    GlobalAverageRecord, StaticLocationRecord, WeatherProvider, WeatherReport, catalog,
};

use crate::error::ApiError;
use crate::rate_limit::{self, Admission, Quota, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn WeatherProvider>,
    /// Holds `index.html`; also mounted under `/static`.
    pub static_dir: PathBuf,
    pub locations: &'static [StaticLocationRecord],
}

impl AppState {
    pub fn new(provider: Arc<dyn WeatherProvider>, static_dir: PathBuf) -> Self {
        Self { provider, static_dir, locations: &catalog::RANDOM_LOCATIONS }
    }
}

/// One limiter per route; counters are never shared between routes.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub index: RateLimiter,
    pub city: RateLimiter,
    pub global_average: RateLimiter,
    pub random_location: RateLimiter,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            index: RateLimiter::new(Quota::per_minute(10)),
            city: RateLimiter::new(Quota::per_minute(10)),
            global_average: RateLimiter::new(Quota::per_minute(5)),
            random_location: RateLimiter::new(Quota::per_minute(5)),
        }
    }
}

impl RateLimits {
    /// Sweep idle clients from every limiter; returns how many keys remain tracked.
    pub fn purge_idle(&self) -> usize {
        [&self.index, &self.city, &self.global_average, &self.random_location]
            .into_iter()
            .map(|limiter| {
                limiter.purge_idle();
                limiter.tracked_clients()
            })
            .sum()
    }
}

#[derive(Clone)]
struct RouteGuard {
    limiter: RateLimiter,
    trust_proxy: bool,
}

pub fn build_app(state: AppState, limits: &RateLimits, trust_proxy: bool) -> Router {
    let limited = |router: Router<AppState>, limiter: &RateLimiter| {
        let guard = RouteGuard { limiter: limiter.clone(), trust_proxy };
        router.route_layer(middleware::from_fn_with_state(guard, enforce_rate_limit))
    };

    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .merge(limited(Router::new().route("/", get(index)), &limits.index))
        .merge(limited(
            Router::new().route("/weather/{location_name}", get(city_weather)),
            &limits.city,
        ))
        .merge(limited(
            Router::new().route("/weather/global/average", get(global_average)),
            &limits.global_average,
        ))
        .merge(limited(
            Router::new().route("/weather/random/location", get(random_location)),
            &limits.random_location,
        ))
        .nest_service("/static", static_files)
        .with_state(state)
}

async fn enforce_rate_limit(
    State(guard): State<RouteGuard>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = rate_limit::client_key(peer, req.headers(), guard.trust_proxy);

    match guard.limiter.admit(&key) {
        Admission::Allowed { remaining } => {
            tracing::trace!(client = %key, remaining, "request admitted");
            Ok(next.run(req).await)
        }
        Admission::Denied { retry_after } => {
            tracing::debug!(client = %key, path = %req.uri().path(), "rate limit exceeded");
            Err(ApiError::RateLimited { quota: guard.limiter.quota(), retry_after })
        }
    }
}

/// Serves the frontend page.
async fn index(State(state): State<AppState>) -> Result<Html<Vec<u8>>, ApiError> {
    let path = state.static_dir.join("index.html");

    let page = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to read frontend page");
        ApiError::Internal("Frontend page unavailable.".into())
    })?;

    Ok(Html(page))
}

/// Live weather for a city, proxied from the upstream provider.
async fn city_weather(
    State(state): State<AppState>,
    Path(location_name): Path<String>,
) -> Result<Json<WeatherReport>, ApiError> {
    let report = state.provider.current_weather(&location_name).await?;
    Ok(Json(report))
}

async fn global_average() -> Json<GlobalAverageRecord> {
    Json(catalog::GLOBAL_AVERAGE)
}

async fn random_location(
    State(state): State<AppState>,
) -> Result<Json<StaticLocationRecord>, ApiError> {
    catalog::random_location(state.locations)
        .copied()
        .map(Json)
        .ok_or_else(|| ApiError::Internal("No random locations available.".into()))
}
