//! Rerun render bridge for watching a stage run live.
//!
//! Visualization is optional and only available with the `visualization` feature.
//! Without it the bridge still counts paints, so the harness can use it
//! interchangeably with `FrameRecorder`.
//!
//! # What Gets Logged
//!
//! - Every card as a point, colored by net-worth tier
//! - The camera eye as a single white point
//! - The paint counter as the `paint` timeline

#[cfg(feature = "visualization")]
use rerun::{Color, Points3D, Position3D, Radius, RecordingStream};
use tableau_core::{Camera, NetWorthTier, RenderBridge, Scene};

/// Rerun-backed render bridge.
pub struct RerunBridge {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether visualization is enabled
    enabled: bool,

    paints: u64,
}

impl RerunBridge {
    /// Creates a bridge with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
            paints: 0,
        }
    }

    /// Spawns a Rerun viewer and streams paints to it.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to watch the stage");
                Self {
                    rec: Some(rec),
                    enabled: true,
                    paints: 0,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    /// Creates a bridge - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn paints(&self) -> u64 {
        self.paints
    }

    #[cfg(feature = "visualization")]
    fn log_paint(&self, scene: &Scene, camera: &Camera) {
        let Some(ref rec) = self.rec else {
            return;
        };
        rec.set_time_sequence("paint", self.paints as i64);

        let points: Vec<Position3D> = scene
            .objects()
            .iter()
            .map(|o| Position3D::new(o.position.x as f32, o.position.y as f32, o.position.z as f32))
            .collect();
        let colors: Vec<Color> = scene.objects().iter().map(|o| tier_color(o.tier)).collect();

        let _ = rec.log(
            "stage/cards",
            &Points3D::new(points)
                .with_colors(colors)
                .with_radii([Radius::new_scene_units(20.0)]),
        );

        let eye = camera.position;
        let _ = rec.log(
            "stage/camera",
            &Points3D::new([Position3D::new(eye.x as f32, eye.y as f32, eye.z as f32)])
                .with_colors([Color::from_rgb(255, 255, 255)])
                .with_radii([Radius::new_scene_units(40.0)]),
        );
    }

    #[cfg(not(feature = "visualization"))]
    fn log_paint(&self, _scene: &Scene, _camera: &Camera) {}
}

impl RenderBridge for RerunBridge {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        self.log_paint(scene, camera);
        self.paints += 1;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        tracing::debug!(width, height, "Rerun bridge resized");
    }
}

/// RGB per tier: high red, medium amber, low teal.
pub fn tier_rgb(tier: NetWorthTier) -> [u8; 3] {
    match tier {
        NetWorthTier::High => [255, 80, 80],
        NetWorthTier::Medium => [255, 190, 60],
        NetWorthTier::Low => [0, 200, 200],
    }
}

#[cfg(feature = "visualization")]
fn tier_color(tier: NetWorthTier) -> Color {
    let [r, g, b] = tier_rgb(tier);
    Color::from_rgb(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic_store;
    use tableau_core::CameraConfig;

    #[test]
    fn test_disabled_bridge_counts_paints() {
        let store = synthetic_store(5, 3).unwrap();
        let scene = Scene::scatter(&store, 10.0, || 0.5);
        let camera = Camera::new(&CameraConfig::default(), 100, 100);

        let mut bridge = RerunBridge::disabled();
        assert!(!bridge.is_enabled());

        // No-ops apart from the counter
        bridge.render(&scene, &camera);
        bridge.render(&scene, &camera);
        bridge.set_size(10, 10);
        assert_eq!(bridge.paints(), 2);
    }

    #[test]
    fn test_tiers_have_distinct_colors() {
        let high = tier_rgb(NetWorthTier::High);
        let medium = tier_rgb(NetWorthTier::Medium);
        let low = tier_rgb(NetWorthTier::Low);
        assert_ne!(high, medium);
        assert_ne!(medium, low);
        assert_ne!(high, low);
    }
}
