//! Deterministic stage scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// TAB-001: scattered cards settle into the table
    InitialTable,

    /// TAB-002: every formation in turn, each run to completion
    SphereSweep,

    /// TAB-003: a second switch mid-flight replaces the first
    Supersession,

    /// TAB-004: double strand layout and per-card helix alignment
    HelixPairs,

    /// TAB-005: grid cells unique, layers grow with the record count
    GridLayers,

    /// TAB-006: viewport resizes while idle
    Resize,

    /// TAB-007: no paints while nothing moves, camera inertia repaints
    IdleQuiet,

    /// TAB-008: scripted tour mixing switches and camera input
    Tour,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::InitialTable,
            ScenarioId::SphereSweep,
            ScenarioId::Supersession,
            ScenarioId::HelixPairs,
            ScenarioId::GridLayers,
            ScenarioId::Resize,
            ScenarioId::IdleQuiet,
            ScenarioId::Tour,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::InitialTable => "initial_table",
            ScenarioId::SphereSweep => "sphere_sweep",
            ScenarioId::Supersession => "supersession",
            ScenarioId::HelixPairs => "helix_pairs",
            ScenarioId::GridLayers => "grid_layers",
            ScenarioId::Resize => "resize",
            ScenarioId::IdleQuiet => "idle_quiet",
            ScenarioId::Tour => "tour",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::InitialTable => "Random scatter converges to the 20-column table",
            ScenarioId::SphereSweep => "Sphere, helix, grid and table in turn, each fully settled",
            ScenarioId::Supersession => "Grid switch interrupted by helix at half time, helix wins",
            ScenarioId::HelixPairs => "2N helix targets, pairs share height, card i on target i",
            ScenarioId::GridLayers => "Unique 5x4 grid cells, ceil(N/20) layers",
            ScenarioId::Resize => "Each resize repaints exactly once and updates the aspect",
            ScenarioId::IdleQuiet => "Idle stage never repaints, camera flick repaints until damped",
            ScenarioId::Tour => "Mid-flight switches with rotate, zoom and pan input",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initial_table" | "initialtable" | "tab-001" => Ok(ScenarioId::InitialTable),
            "sphere_sweep" | "spheresweep" | "tab-002" => Ok(ScenarioId::SphereSweep),
            "supersession" | "tab-003" => Ok(ScenarioId::Supersession),
            "helix_pairs" | "helixpairs" | "tab-004" => Ok(ScenarioId::HelixPairs),
            "grid_layers" | "gridlayers" | "tab-005" => Ok(ScenarioId::GridLayers),
            "resize" | "tab-006" => Ok(ScenarioId::Resize),
            "idle_quiet" | "idlequiet" | "tab-007" => Ok(ScenarioId::IdleQuiet),
            "tour" | "tab-008" => Ok(ScenarioId::Tour),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert!(!scenario.description().is_empty());
        }
        assert_eq!("TAB-003".parse::<ScenarioId>(), Ok(ScenarioId::Supersession));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
