use anyhow::{anyhow, Result};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::config::ProfileConfig;
use crate::data::DatasetLoader;
use crate::popup::PopupFormatter;
use crate::style::Stylist;
use crate::types::{Dataset, StyledFeature, StyledOverlay};

/// Opaque reference to an overlay held by a display surface.
pub type OverlayHandle = u64;

/// What the view controller needs from whatever draws the map.
pub trait DisplaySurface {
    fn add_overlay(&mut self, overlay: StyledOverlay) -> OverlayHandle;
    fn remove_overlay(&mut self, handle: OverlayHandle);
    fn mark_active(&mut self, profile: &str);
}

/// UI events arrive as discrete commands, keeping the controller free of any
/// widget wiring.
#[derive(Debug, Clone)]
pub enum Command {
    SelectProfile(String),
}

/// Issued by [`ViewController::begin_select`]; a completed fetch is applied
/// only while its token's epoch is still current, so a superseded fetch is
/// discarded on arrival and the last selection wins.
#[derive(Debug)]
pub struct SelectToken {
    pub profile: ProfileConfig,
    epoch: u64,
}

/// Owns the single-overlay display invariant.
///
/// Selection is split in two phases around the fetch suspension point:
/// `begin_select` removes the current overlay and stamps an epoch,
/// `complete_select` checks the epoch and swaps in the new overlay without
/// any intervening await. At most one dataset is ever visible.
pub struct ViewController<S> {
    profiles: Vec<ProfileConfig>,
    formatter: PopupFormatter,
    surface: S,
    current: Option<OverlayHandle>,
    active: Option<String>,
    epoch: u64,
}

impl<S: DisplaySurface> ViewController<S> {
    pub fn new(profiles: Vec<ProfileConfig>, surface: S) -> Self {
        let formatter = PopupFormatter::from_profiles(&profiles);
        ViewController {
            profiles,
            formatter,
            surface,
            current: None,
            active: None,
            epoch: 0,
        }
    }

    /// Starts a selection. Unknown names are a programming error (the UI only
    /// offers registered profiles), so this fails loudly instead of guessing.
    pub fn begin_select(&mut self, name: &str) -> Result<SelectToken> {
        let profile = self
            .profiles
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown profile: {}", name))?;

        self.epoch += 1;
        if let Some(handle) = self.current.take() {
            self.surface.remove_overlay(handle);
        }
        Ok(SelectToken { profile, epoch: self.epoch })
    }

    /// Applies a fetched dataset, unless a later selection superseded it.
    /// Fetch failures are reported and leave the display empty; the user can
    /// retry by selecting again.
    pub fn complete_select(&mut self, token: SelectToken, fetched: Result<Dataset>) {
        if token.epoch != self.epoch {
            debug!(profile = %token.profile.name, "discarding superseded fetch");
            return;
        }

        match fetched {
            Ok(dataset) => {
                if let Some(handle) = self.current.take() {
                    self.surface.remove_overlay(handle);
                }
                let overlay = render_overlay(&token.profile, &self.formatter, &dataset);
                let handle = self.surface.add_overlay(overlay);
                self.current = Some(handle);
                self.active = Some(token.profile.name.clone());
                self.surface.mark_active(&token.profile.name);
            }
            Err(e) => {
                error!(profile = %token.profile.name, error = %e, "failed to load profile data");
            }
        }
    }

    pub fn active_profile(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

/// Runs the rendering pipeline over a dataset: style and popup per feature.
fn render_overlay(
    profile: &ProfileConfig,
    formatter: &PopupFormatter,
    dataset: &Dataset,
) -> StyledOverlay {
    let stylist = Stylist::new(&profile.attribute);
    let features = dataset
        .features
        .iter()
        .map(|feature| StyledFeature {
            geometry: feature.geometry.clone(),
            style: stylist.style_for(feature),
            popup_html: formatter.format(&profile.name, feature).to_html(),
        })
        .collect();

    StyledOverlay { profile: profile.name.clone(), features }
}

/// Executes a command against a shared controller. The lock is released
/// across the fetch so later selections are never blocked behind a slow one.
pub async fn dispatch<S: DisplaySurface>(
    controller: &Mutex<ViewController<S>>,
    loader: &DatasetLoader,
    command: Command,
) -> Result<()> {
    match command {
        Command::SelectProfile(name) => {
            let token = controller.lock().await.begin_select(&name)?;
            let fetched = loader.load(&token.profile).await;
            controller.lock().await.complete_select(token, fetched);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BUCKET_COLORS;
    use crate::config::PopupFieldConfig;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSurface {
        next_handle: OverlayHandle,
        visible: HashMap<OverlayHandle, StyledOverlay>,
        events: Vec<String>,
        active: Option<String>,
    }

    impl DisplaySurface for FakeSurface {
        fn add_overlay(&mut self, overlay: StyledOverlay) -> OverlayHandle {
            self.next_handle += 1;
            self.events.push(format!("add {}", overlay.profile));
            self.visible.insert(self.next_handle, overlay);
            self.next_handle
        }

        fn remove_overlay(&mut self, handle: OverlayHandle) {
            if let Some(overlay) = self.visible.remove(&handle) {
                self.events.push(format!("remove {}", overlay.profile));
            }
        }

        fn mark_active(&mut self, profile: &str) {
            self.active = Some(profile.to_string());
        }
    }

    fn profile(name: &str, attribute: &str) -> ProfileConfig {
        ProfileConfig {
            name: name.into(),
            source: format!("{}.json", attribute).into(),
            attribute: attribute.into(),
            popup_fields: vec![PopupFieldConfig {
                key: attribute.into(),
                label: "Walkability Index".into(),
            }],
        }
    }

    fn dataset_with_score(score: f64) -> Dataset {
        Dataset {
            features: vec![crate::types::Feature {
                geometry: None,
                properties: [(
                    "index_walk_ft".to_string(),
                    crate::types::PropertyValue::Number(score),
                )]
                .into_iter()
                .collect(),
            }],
        }
    }

    fn controller() -> ViewController<FakeSurface> {
        ViewController::new(
            vec![
                profile("General Walkability", "index_walk_ft"),
                profile("Walkability for Women at Night", "index_walk_night_ft"),
            ],
            FakeSurface::default(),
        )
    }

    #[test]
    fn unknown_profile_fails_loudly() {
        let mut ctrl = controller();
        assert!(ctrl.begin_select("Bikeability").is_err());
    }

    #[test]
    fn select_renders_styled_overlay_and_marks_active() {
        let mut ctrl = controller();
        let token = ctrl.begin_select("General Walkability").unwrap();
        ctrl.complete_select(token, Ok(dataset_with_score(0.1)));

        let surface = ctrl.surface();
        assert_eq!(surface.visible.len(), 1);
        let overlay = surface.visible.values().next().unwrap();
        assert_eq!(overlay.features[0].style.fill_color, BUCKET_COLORS[0]);
        assert!(overlay.features[0].popup_html.contains("Walkability Index"));
        assert_eq!(surface.active.as_deref(), Some("General Walkability"));
        assert_eq!(ctrl.active_profile(), Some("General Walkability"));
    }

    #[test]
    fn switching_removes_the_old_overlay_first() {
        let mut ctrl = controller();
        let a = ctrl.begin_select("General Walkability").unwrap();
        ctrl.complete_select(a, Ok(dataset_with_score(0.5)));
        let b = ctrl.begin_select("Walkability for Women at Night").unwrap();
        ctrl.complete_select(b, Ok(dataset_with_score(0.5)));

        let surface = ctrl.surface();
        assert_eq!(surface.visible.len(), 1);
        assert_eq!(
            surface.events,
            vec![
                "add General Walkability",
                "remove General Walkability",
                "add Walkability for Women at Night",
            ]
        );
    }

    #[test]
    fn last_selection_wins_when_fetches_resolve_out_of_order() {
        let mut ctrl = controller();
        let a = ctrl.begin_select("General Walkability").unwrap();
        let b = ctrl.begin_select("Walkability for Women at Night").unwrap();

        // B resolves first, then A's stale response arrives.
        ctrl.complete_select(b, Ok(dataset_with_score(0.5)));
        ctrl.complete_select(a, Ok(dataset_with_score(0.5)));

        let surface = ctrl.surface();
        assert_eq!(surface.visible.len(), 1);
        assert_eq!(
            surface.visible.values().next().unwrap().profile,
            "Walkability for Women at Night"
        );
        // A was never rendered at all.
        assert!(!surface.events.iter().any(|e| e == "add General Walkability"));
    }

    #[test]
    fn fetch_failure_leaves_the_display_empty() {
        let mut ctrl = controller();
        let a = ctrl.begin_select("General Walkability").unwrap();
        ctrl.complete_select(a, Ok(dataset_with_score(0.5)));
        let b = ctrl.begin_select("Walkability for Women at Night").unwrap();
        ctrl.complete_select(b, Err(anyhow!("connection reset")));

        let surface = ctrl.surface();
        assert!(surface.visible.is_empty());
        // Active marker still points at the last successful selection.
        assert_eq!(ctrl.active_profile(), Some("General Walkability"));
    }

    #[test]
    fn begin_select_is_idempotent_with_no_current_overlay() {
        let mut ctrl = controller();
        let _ = ctrl.begin_select("General Walkability").unwrap();
        let surface = ctrl.surface();
        assert!(surface.visible.is_empty());
        assert!(surface.events.is_empty());
    }

    #[tokio::test]
    async fn dispatch_runs_a_selection_end_to_end() {
        let dir = std::env::temp_dir().join(format!("walkmap-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let source = dir.join("walk.json");
        std::fs::write(
            &source,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":null,"properties":{"index_walk_ft":0.1}}
            ]}"#,
        )
        .unwrap();

        let mut profile = profile("General Walkability", "index_walk_ft");
        profile.source = source;
        let ctrl = Mutex::new(ViewController::new(vec![profile], FakeSurface::default()));
        let loader = DatasetLoader::new(std::time::Duration::from_secs(5));

        dispatch(
            &ctrl,
            &loader,
            Command::SelectProfile("General Walkability".into()),
        )
        .await
        .unwrap();

        let ctrl = ctrl.lock().await;
        assert_eq!(ctrl.surface().visible.len(), 1);
        assert_eq!(ctrl.active_profile(), Some("General Walkability"));
    }
}
