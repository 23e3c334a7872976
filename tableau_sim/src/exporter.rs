//! Frame recording and JSON export.
//!
//! `FrameRecorder` is the headless render bridge used by the harness. It
//! counts paints and, when capturing, snapshots every card at a fixed paint
//! interval so a run can be replayed outside the process.

use crate::context::SimContext;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use tableau_core::{Camera, RenderBridge, Scene};
use tableau_env::StageContext;

/// One card as painted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardFrame {
    pub index: usize,
    pub name: String,
    pub tier: String,
    pub position: [f64; 3],

    /// Euler XYZ (radians)
    pub rotation: [f64; 3],
}

/// A single painted frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Paint counter at capture
    pub paint: u64,

    /// Simulation time in seconds
    pub time_sec: f64,

    pub camera: [f64; 3],

    pub cards: Vec<CardFrame>,
}

impl SimFrame {
    pub fn capture(paint: u64, time_sec: f64, scene: &Scene, camera: &Camera) -> Self {
        let cards = scene
            .objects()
            .iter()
            .map(|object| CardFrame {
                index: object.index,
                name: object.record.name.clone(),
                tier: object.tier.name().to_string(),
                position: object.position.into(),
                rotation: object.rotation.into(),
            })
            .collect();

        Self {
            paint,
            time_sec,
            camera: camera.position.into(),
            cards,
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub records: usize,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Total paints issued during the run
    pub paints: u64,

    /// Captured frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    /// Largest distance from a card to its final target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_max_error: Option<f64>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, records: usize) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            records,
            duration_sec: 0.0,
            paints: 0,
            frames: Vec::new(),
            passed: false,
            final_max_error: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, paints: u64, duration_sec: f64, max_error: Option<f64>) {
        self.passed = passed;
        self.paints = paints;
        self.duration_sec = duration_sec;
        self.final_max_error = max_error;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Headless render bridge for the harness.
#[derive(Default)]
pub struct FrameRecorder {
    paints: u64,
    size: (u32, u32),
    resizes: u64,

    /// Clock used to stamp captured frames
    clock: Option<SimContext>,

    /// Capture every n-th paint; 0 disables capture
    capture_every: u64,

    captured: Vec<SimFrame>,
}

impl FrameRecorder {
    /// Counts paints without capturing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures every `every`-th paint, stamped with `clock`'s time.
    pub fn capturing(clock: SimContext, every: u64) -> Self {
        Self {
            clock: Some(clock),
            capture_every: every,
            ..Self::default()
        }
    }

    pub fn paints(&self) -> u64 {
        self.paints
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn resizes(&self) -> u64 {
        self.resizes
    }

    pub fn captured(&self) -> &[SimFrame] {
        &self.captured
    }

    /// Hands over captured frames, leaving the recorder empty.
    pub fn take_frames(&mut self) -> Vec<SimFrame> {
        std::mem::take(&mut self.captured)
    }
}

impl RenderBridge for FrameRecorder {
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        if self.capture_every > 0 && self.paints % self.capture_every == 0 {
            let time_sec = self.clock.as_ref().map_or(0.0, |c| c.now().as_secs_f64());
            self.captured.push(SimFrame::capture(self.paints, time_sec, scene, camera));
        }
        self.paints += 1;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.resizes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic_store;
    use std::time::Duration;
    use tableau_core::CameraConfig;

    fn scene() -> Scene {
        let store = synthetic_store(1, 5).unwrap();
        let mut i = 0.0;
        Scene::scatter(&store, 100.0, || {
            i += 0.1;
            i % 1.0
        })
    }

    #[test]
    fn test_recorder_counts_without_capture() {
        let scene = scene();
        let camera = Camera::new(&CameraConfig::default(), 640, 480);
        let mut recorder = FrameRecorder::new();

        for _ in 0..4 {
            recorder.render(&scene, &camera);
        }
        recorder.set_size(800, 600);

        assert_eq!(recorder.paints(), 4);
        assert_eq!(recorder.size(), (800, 600));
        assert!(recorder.captured().is_empty());
    }

    #[test]
    fn test_recorder_captures_interval() {
        let scene = scene();
        let camera = Camera::new(&CameraConfig::default(), 640, 480);
        let clock = SimContext::new(3);
        let mut recorder = FrameRecorder::capturing(clock.clone(), 3);

        for _ in 0..7 {
            clock.advance_time(Duration::from_millis(100));
            recorder.render(&scene, &camera);
        }

        let frames = recorder.take_frames();
        let paints: Vec<u64> = frames.iter().map(|f| f.paint).collect();
        assert_eq!(paints, vec![0, 3, 6]);
        assert!((frames[1].time_sec - 0.4).abs() < 1e-9);
        assert_eq!(frames[0].cards.len(), 5);
        assert!(recorder.captured().is_empty());
    }

    #[test]
    fn test_export_serializes() {
        let scene = scene();
        let camera = Camera::new(&CameraConfig::default(), 640, 480);
        let mut export = SimExport::new("tour", 42, 5);
        export.add_frame(SimFrame::capture(0, 0.5, &scene, &camera));
        export.finalize(true, 12, 8.0, Some(0.0));

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["scenario"], "tour");
        assert_eq!(json["frames"][0]["cards"].as_array().unwrap().len(), 5);
        assert_eq!(json["paints"], 12);
    }
}
