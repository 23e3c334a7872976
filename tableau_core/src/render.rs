//! Render Bridge - the boundary to whatever paints the scene.

use crate::camera::Camera;
use crate::scene::Scene;

/// A surface that paints the current scene transforms.
///
/// `render` may be called any number of times per tick and must have no
/// side effect beyond painting (or recording) the frame.
pub trait RenderBridge {
    fn render(&mut self, scene: &Scene, camera: &Camera);

    /// Called on construction and on every viewport resize.
    fn set_size(&mut self, width: u32, height: u32);
}

/// Headless bridge that only counts paints.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    frames: u64,
    size: (u32, u32),
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

impl RenderBridge for FrameCounter {
    fn render(&mut self, _scene: &Scene, _camera: &Camera) {
        self.frames += 1;
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }
}
