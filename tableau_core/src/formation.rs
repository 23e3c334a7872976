//! Formation Generators - Table, Sphere, Helix, Grid
//!
//! Each generator is a pure function of `(index, count)` returning the
//! target transform for one card. No randomness: the same count always
//! yields a bitwise-identical array, so re-selecting a formation is
//! idempotent.
//!
//! Orientations are XYZ Euler angles (radians). Formations that face a
//! point use the object "look at" convention: the card's local +Z points
//! at the target, with +Y as the up hint.

use crate::config::FormationConfig;
use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Target transform for one card in one formation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormationTarget {
    pub position: Vector3<f64>,

    /// XYZ Euler angles (radians)
    pub rotation: Vector3<f64>,
}

impl FormationTarget {
    /// A target with identity orientation.
    pub fn at(position: Vector3<f64>) -> Self {
        Self {
            position,
            rotation: Vector3::zeros(),
        }
    }

    /// A target at `position` facing `focus`.
    pub fn facing(position: Vector3<f64>, focus: Vector3<f64>) -> Self {
        let rotation = look_at(&position, &focus, &Vector3::y());
        Self {
            position,
            rotation: euler_xyz(&rotation),
        }
    }
}

/// The four named formations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationKind {
    Table,
    Sphere,
    Helix,
    Grid,
}

impl FormationKind {
    pub const ALL: [FormationKind; 4] = [
        FormationKind::Table,
        FormationKind::Sphere,
        FormationKind::Helix,
        FormationKind::Grid,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FormationKind::Table => "table",
            FormationKind::Sphere => "sphere",
            FormationKind::Helix => "helix",
            FormationKind::Grid => "grid",
        }
    }

    /// Generates the full target array for `count` records.
    ///
    /// Helix returns `2 * count` targets (two strands per index); every
    /// other formation returns exactly `count`.
    pub fn generate(&self, count: usize, config: &FormationConfig) -> Vec<FormationTarget> {
        match self {
            FormationKind::Table => (0..count).map(|i| table(i, config)).collect(),
            FormationKind::Sphere => (0..count).map(|i| sphere(i, count, config)).collect(),
            FormationKind::Helix => (0..count).flat_map(|i| helix(i, config)).collect(),
            FormationKind::Grid => (0..count).map(|i| grid(i, config)).collect(),
        }
    }
}

impl std::fmt::Display for FormationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for FormationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(FormationKind::Table),
            "sphere" => Ok(FormationKind::Sphere),
            "helix" => Ok(FormationKind::Helix),
            "grid" => Ok(FormationKind::Grid),
            _ => Err(format!("Unknown formation: {}", s)),
        }
    }
}

// =============================================================================
// GENERATORS
// =============================================================================

/// Rectilinear table: 1-based column/row, `table_columns` wide.
pub fn table(i: usize, config: &FormationConfig) -> FormationTarget {
    let column = (i % config.table_columns) + 1;
    let row = (i / config.table_columns) + 1;

    FormationTarget::at(Vector3::new(
        column as f64 * config.table_cell[0] - config.table_origin[0],
        -(row as f64) * config.table_cell[1] + config.table_origin[1],
        0.0,
    ))
}

/// Near-uniform sphere: polar angle from `acos(-1 + 2i/N)`, longitude swept
/// as `sqrt(N·π)·phi`. Cards face away from the center.
pub fn sphere(i: usize, count: usize, config: &FormationConfig) -> FormationTarget {
    let n = count as f64;
    let phi = (-1.0 + (2.0 * i as f64) / n).acos();
    let theta = (n * PI).sqrt() * phi;

    let position = from_spherical(config.sphere_radius, phi, theta);
    FormationTarget::facing(position, position * 2.0)
}

/// Double helix: both strands at the same height, half a turn apart.
///
/// Returns `[strand_a, strand_b]`. Each card faces `(2x, y, 2z)`.
pub fn helix(i: usize, config: &FormationConfig) -> [FormationTarget; 2] {
    let theta = i as f64 * config.helix_angular_step + PI;
    let y = -(i as f64 * config.helix_pitch) + config.helix_top;

    let strand = |theta: f64| {
        let position = from_cylindrical(config.helix_radius, theta, y);
        let focus = Vector3::new(position.x * 2.0, position.y, position.z * 2.0);
        FormationTarget::facing(position, focus)
    };

    [strand(theta), strand(theta + PI)]
}

/// 3-D grid: `grid_dims[0] × grid_dims[1]` cells per layer, layers along z.
pub fn grid(i: usize, config: &FormationConfig) -> FormationTarget {
    let [dx, dy] = config.grid_dims;
    let x = i % dx;
    let y = (i / dx) % dy;
    let z = i / (dx * dy);

    FormationTarget::at(Vector3::new(
        x as f64 * config.grid_cell[0] - config.grid_origin[0],
        -(y as f64) * config.grid_cell[1] + config.grid_origin[1],
        z as f64 * config.grid_cell[2] - config.grid_origin[2],
    ))
}

// =============================================================================
// FORMATION SET
// =============================================================================

/// The four target arrays for one record count.
///
/// Built once when the stage is constructed and never mutated; the
/// transition engine borrows slices from it.
#[derive(Debug, Clone)]
pub struct FormationSet {
    count: usize,
    table: Vec<FormationTarget>,
    sphere: Vec<FormationTarget>,
    helix: Vec<FormationTarget>,
    grid: Vec<FormationTarget>,
}

impl FormationSet {
    pub fn build(count: usize, config: &FormationConfig) -> Self {
        Self {
            count,
            table: FormationKind::Table.generate(count, config),
            sphere: FormationKind::Sphere.generate(count, config),
            helix: FormationKind::Helix.generate(count, config),
            grid: FormationKind::Grid.generate(count, config),
        }
    }

    /// Record count the arrays were generated for.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn get(&self, kind: FormationKind) -> &[FormationTarget] {
        match kind {
            FormationKind::Table => &self.table,
            FormationKind::Sphere => &self.sphere,
            FormationKind::Helix => &self.helix,
            FormationKind::Grid => &self.grid,
        }
    }
}

// =============================================================================
// COORDINATES & ORIENTATION
// =============================================================================

/// Spherical → Cartesian with y as the polar axis.
pub fn from_spherical(radius: f64, phi: f64, theta: f64) -> Vector3<f64> {
    let sin_phi = phi.sin();
    Vector3::new(
        radius * sin_phi * theta.sin(),
        radius * phi.cos(),
        radius * sin_phi * theta.cos(),
    )
}

/// Cylindrical → Cartesian around the y axis.
pub fn from_cylindrical(radius: f64, theta: f64, y: f64) -> Vector3<f64> {
    Vector3::new(radius * theta.sin(), y, radius * theta.cos())
}

/// Rotation whose local +Z points from `eye` toward `target`.
///
/// Degenerate cases: a zero direction becomes +Z, and a direction parallel
/// to `up` is nudged by 1e-4 before building the basis.
pub fn look_at(eye: &Vector3<f64>, target: &Vector3<f64>, up: &Vector3<f64>) -> Rotation3<f64> {
    let mut z = target - eye;
    if z.norm_squared() == 0.0 {
        z.z = 1.0;
    }
    z.normalize_mut();

    let mut x = up.cross(&z);
    if x.norm_squared() == 0.0 {
        if up.z.abs() == 1.0 {
            z.x += 0.0001;
        } else {
            z.z += 0.0001;
        }
        z.normalize_mut();
        x = up.cross(&z);
    }
    x.normalize_mut();

    let y = z.cross(&x);
    Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x, y, z]))
}

/// Decomposes a rotation into XYZ Euler angles (R = Rx · Ry · Rz).
pub fn euler_xyz(rotation: &Rotation3<f64>) -> Vector3<f64> {
    let m = rotation.matrix();
    let m13 = m[(0, 2)];
    let y = m13.clamp(-1.0, 1.0).asin();

    if m13.abs() < 0.999_999_9 {
        Vector3::new((-m[(1, 2)]).atan2(m[(2, 2)]), y, (-m[(0, 1)]).atan2(m[(0, 0)]))
    } else {
        Vector3::new(m[(2, 1)].atan2(m[(1, 1)]), y, 0.0)
    }
}

/// Composes XYZ Euler angles back into a rotation.
pub fn rotation_from_euler(euler: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), euler.x)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), euler.y)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), euler.z)
}
