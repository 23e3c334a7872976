//! Visual Object Set - one mutable spatial proxy per record.
//!
//! Index `i` of the scene, the record store and every formation array
//! always refer to the same record. Only the transition engine moves
//! objects after the scene is scattered.

use crate::formation::{rotation_from_euler, FormationTarget};
use crate::record::{NetWorthTier, Record, RecordStore};
use nalgebra::{Rotation3, Vector3};
use std::sync::Arc;

/// A card in the scene.
#[derive(Debug, Clone)]
pub struct VisualObject {
    pub index: usize,

    pub position: Vector3<f64>,

    /// XYZ Euler angles (radians)
    pub rotation: Vector3<f64>,

    pub record: Arc<Record>,

    /// Net-worth bucket, classified once at creation
    pub tier: NetWorthTier,
}

impl VisualObject {
    pub fn new(index: usize, record: Arc<Record>, position: Vector3<f64>) -> Self {
        let tier = record.tier();
        Self {
            index,
            position,
            rotation: Vector3::zeros(),
            record,
            tier,
        }
    }

    pub fn orientation(&self) -> Rotation3<f64> {
        rotation_from_euler(&self.rotation)
    }
}

/// The full set of cards, positionally aligned with the record store.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<VisualObject>,
}

impl Scene {
    /// Creates one object per record at a random point in `[-extent, extent)³`.
    ///
    /// `random_unit` must return values in `[0, 1)`; three draws per record
    /// (x, y, z) in index order.
    pub fn scatter<F>(records: &RecordStore, extent: f64, mut random_unit: F) -> Self
    where
        F: FnMut() -> f64,
    {
        let mut scatter = || random_unit() * 2.0 * extent - extent;

        let objects = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let position = Vector3::new(scatter(), scatter(), scatter());
                VisualObject::new(index, Arc::clone(record), position)
            })
            .collect();

        Self { objects }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[VisualObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [VisualObject] {
        &mut self.objects
    }

    /// Largest position distance between any object and its target.
    ///
    /// Only the aligned prefix is compared.
    pub fn max_position_error(&self, targets: &[FormationTarget]) -> f64 {
        self.objects
            .iter()
            .zip(targets)
            .map(|(object, target)| (object.position - target.position).norm())
            .fold(0.0, f64::max)
    }

    /// Largest Euler-angle distance between any object and its target.
    pub fn max_rotation_error(&self, targets: &[FormationTarget]) -> f64 {
        self.objects
            .iter()
            .zip(targets)
            .map(|(object, target)| (object.rotation - target.rotation).norm())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(n: usize) -> RecordStore {
        let rows: Vec<Vec<String>> = (0..n)
            .map(|i| {
                vec![
                    format!("person-{}", i),
                    "https://img.example/p.png".to_string(),
                    "30".to_string(),
                    "Chile".to_string(),
                    "Chess".to_string(),
                    format!("${}", i * 100_000),
                ]
            })
            .collect();
        RecordStore::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_scatter_alignment_and_bounds() {
        let records = store(5);
        let mut draws = [0.0, 0.5, 0.999].into_iter().cycle();
        let scene = Scene::scatter(&records, 2000.0, || draws.next().unwrap());

        assert_eq!(scene.len(), records.len());
        for (i, object) in scene.objects().iter().enumerate() {
            assert_eq!(object.index, i);
            assert_eq!(object.record.name, format!("person-{}", i));
            assert_eq!(object.rotation, Vector3::zeros());
            assert!(object.position.iter().all(|v| (-2000.0..2000.0).contains(v)));
        }
        assert_eq!(scene.objects()[0].position.x, -2000.0);
    }

    #[test]
    fn test_tier_classified_at_creation() {
        let records = store(4);
        let scene = Scene::scatter(&records, 10.0, || 0.0);
        let tiers: Vec<_> = scene.objects().iter().map(|o| o.tier).collect();
        assert_eq!(
            tiers,
            vec![NetWorthTier::Low, NetWorthTier::Low, NetWorthTier::Medium, NetWorthTier::High]
        );
    }

    #[test]
    fn test_max_position_error() {
        let records = store(2);
        let scene = Scene::scatter(&records, 10.0, || 0.5);
        let targets = vec![
            FormationTarget::at(Vector3::new(3.0, 4.0, 0.0)),
            FormationTarget::at(Vector3::zeros()),
        ];
        assert_eq!(scene.max_position_error(&targets), 5.0);
        assert_eq!(scene.max_rotation_error(&targets), 0.0);
    }
}
