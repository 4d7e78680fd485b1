use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::classify::{self, LegendEntry};
use crate::config::AppConfig;
use crate::data::DatasetLoader;
use crate::stats::{self, ProfileStat};
use crate::types::StyledOverlay;
use crate::view::{dispatch, Command, DisplaySurface, OverlayHandle, ViewController};

/// In-process display surface: holds the one rendered overlay the API serves
/// at `/api/overlay`. The browser page is a thin client of this state.
#[derive(Default)]
pub struct SessionSurface {
    next_handle: OverlayHandle,
    overlay: Option<(OverlayHandle, StyledOverlay)>,
    active: Option<String>,
}

impl SessionSurface {
    pub fn overlay(&self) -> Option<&StyledOverlay> {
        self.overlay.as_ref().map(|(_, o)| o)
    }
}

impl DisplaySurface for SessionSurface {
    fn add_overlay(&mut self, overlay: StyledOverlay) -> OverlayHandle {
        self.next_handle += 1;
        self.overlay = Some((self.next_handle, overlay));
        self.next_handle
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) {
        if matches!(self.overlay, Some((h, _)) if h == handle) {
            self.overlay = None;
        }
    }

    fn mark_active(&mut self, profile: &str) {
        self.active = Some(profile.to_string());
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub loader: DatasetLoader,
    pub controller: Mutex<ViewController<SessionSurface>>,
    pub stats: Vec<ProfileStat>,
}

#[derive(Serialize)]
struct ProfilesResponse {
    profiles: Vec<String>,
    active: Option<String>,
}

#[derive(Serialize)]
struct StatsResponse {
    heading: &'static str,
    entries: Vec<ProfileStat>,
    attribution: &'static str,
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let loader = DatasetLoader::from_config(&config.data);

    // Aggregate statistics are computed once per profile at startup,
    // sequentially to bound peak memory while datasets are parsed.
    let stats = compute_startup_stats(&config, &loader).await;

    let controller = Mutex::new(ViewController::new(
        config.profiles.clone(),
        SessionSurface::default(),
    ));

    let state = Arc::new(AppState { config, loader, controller, stats });

    // Pre-select the first registered profile, matching the page's default.
    if let Some(default_profile) = state.config.profiles.first() {
        let name = default_profile.name.clone();
        if let Err(e) = dispatch(
            &state.controller,
            &state.loader,
            Command::SelectProfile(name.clone()),
        )
        .await
        {
            warn!(profile = %name, error = %e, "failed to select default profile");
        }
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], state.config.server.port));
    info!("Starting server on http://{}", addr);

    let static_service = ServeDir::new(&state.config.server.static_dir);

    let app = Router::new()
        .route("/api/profiles", get(profiles_handler))
        .route("/api/profiles/:name/select", post(select_handler))
        .route("/api/overlay", get(overlay_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/stats", get(stats_handler))
        .nest_service("/", static_service)
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Loads every profile's dataset once and records its unsuitable-segment
/// share. A profile whose dataset fails to load is skipped with a warning;
/// the rest still get their entry.
pub async fn compute_startup_stats(
    config: &AppConfig,
    loader: &DatasetLoader,
) -> Vec<ProfileStat> {
    let mut entries = Vec::with_capacity(config.profiles.len());
    for profile in &config.profiles {
        match loader.load(profile).await {
            Ok(dataset) => entries.push(ProfileStat {
                profile: profile.name.clone(),
                percent_unsuitable: stats::unsuitable_percentage(&dataset, &profile.attribute),
            }),
            Err(e) => warn!(profile = %profile.name, error = %e, "skipping stats for profile"),
        }
    }
    entries
}

async fn profiles_handler(State(state): State<Arc<AppState>>) -> Json<ProfilesResponse> {
    let controller = state.controller.lock().await;
    Json(ProfilesResponse {
        profiles: state.config.profiles.iter().map(|p| p.name.clone()).collect(),
        active: controller.active_profile().map(str::to_string),
    })
}

async fn select_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Option<geojson::FeatureCollection>>, StatusCode> {
    // Only registered names reach here from the UI; anything else is 404.
    if state.config.profile(&name).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    // Fetch failures are logged and leave the display empty; the response
    // reflects whatever is visible afterwards.
    dispatch(
        &state.controller,
        &state.loader,
        Command::SelectProfile(name),
    )
    .await
    .map_err(|_| StatusCode::NOT_FOUND)?;

    let controller = state.controller.lock().await;
    Ok(Json(
        controller
            .surface()
            .overlay()
            .map(StyledOverlay::to_feature_collection),
    ))
}

async fn overlay_handler(
    State(state): State<Arc<AppState>>,
) -> Json<Option<geojson::FeatureCollection>> {
    let controller = state.controller.lock().await;
    Json(
        controller
            .surface()
            .overlay()
            .map(StyledOverlay::to_feature_collection),
    )
}

async fn legend_handler() -> Json<Vec<LegendEntry>> {
    Json(classify::legend())
}

async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        heading: "Percentage of unsuitable road segments in Salzburg",
        entries: state.stats.clone(),
        attribution: stats::ATTRIBUTION,
    })
}
