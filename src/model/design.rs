use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EditorConfig;
use crate::constraints::{OverrideSet, ValidityOracle};
use crate::error::Result;
use crate::geometry::{Finger, Lobe};

use super::path::{format_path, normalize_path};
use super::{FingerId, HeartModel};

/// One persisted interior finger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerRecord {
    /// Lobe tag plus order index, e.g. `"R3"`.
    pub id: String,
    pub lobe: Lobe,
    /// Normalized path data; see [`super::path`].
    pub path_data: String,
}

/// A complete heart design as exchanged with the outside world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartDesign {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    pub grid_size: usize,
    #[serde(default)]
    pub weave_parity: bool,
    /// Interior fingers only; outer boundaries are regenerated on load.
    #[serde(default)]
    pub fingers: Vec<FingerRecord>,
}

/// How a design was turned into a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignLoad {
    /// Every finger was taken from the design.
    Loaded,
    /// The design's geometry was unusable; default fingers were used instead.
    FellBack { reason: String },
}

impl HeartDesign {
    /// Captures the current state of a model, without metadata.
    #[must_use]
    pub fn capture(model: &HeartModel) -> Self {
        Self {
            name: String::new(),
            author: String::new(),
            description: String::new(),
            grid_size: model.grid_size(),
            weave_parity: model.weave_parity(),
            fingers: model.finger_records(),
        }
    }

    /// Parses a design from JSON.
    ///
    /// # Errors
    ///
    /// Returns `HeartError::Json` if the document is not a design.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serializes the design to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `HeartError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl HeartModel {
    /// Persisted records of all interior fingers, left lobe first.
    #[must_use]
    pub fn finger_records(&self) -> Vec<FingerRecord> {
        let size = self.square().size();
        Lobe::ALL
            .iter()
            .flat_map(|lobe| self.interior_fingers(*lobe).iter())
            .filter_map(|id| {
                let finger = self.finger(*id).ok()?;
                Some(FingerRecord {
                    id: self.record_id(*id)?,
                    lobe: finger.lobe(),
                    path_data: format_path(finger, size),
                })
            })
            .collect()
    }

    /// Builds a model from a persisted design.
    ///
    /// Malformed or invalid finger geometry is never partially accepted: the
    /// whole design falls back to default fingers and the outcome says why.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidGridSize` if the grid size is unsupported.
    pub fn from_design(design: &HeartDesign, config: &EditorConfig) -> Result<(Self, DesignLoad)> {
        let mut model = Self::new(design.grid_size, config)?;
        model.set_weave_parity(design.weave_parity);

        match model.load_records(&design.fingers) {
            Ok(()) => {
                debug!(grid_size = design.grid_size, fingers = design.fingers.len(), "design loaded");
                Ok((model, DesignLoad::Loaded))
            }
            Err(reason) => {
                warn!(name = %design.name, %reason, "design geometry rejected, using default fingers");
                Ok((model, DesignLoad::FellBack { reason }))
            }
        }
    }

    fn load_records(&mut self, records: &[FingerRecord]) -> std::result::Result<(), String> {
        let size = self.square().size();
        let drift_limit = self.oracle_config().bounds_tolerance;
        let mut loaded: Vec<(FingerId, Finger)> = Vec::with_capacity(records.len());

        for record in records {
            let id = self
                .resolve_record_id(&record.id)
                .ok_or_else(|| format!("unknown finger id {:?}", record.id))?;
            if self.order_of(id).map(|(lobe, _)| lobe) != Some(record.lobe) {
                return Err(format!("finger {} is tagged with the wrong lobe", record.id));
            }
            if loaded.iter().any(|(seen, _)| *seen == id) {
                return Err(format!("finger {} appears twice", record.id));
            }
            let mut finger = normalize_path(&record.path_data, record.lobe, size)
                .ok_or_else(|| format!("malformed path data for finger {}", record.id))?;

            let (start, end) = (finger.start(), finger.end());
            self.square().pin_anchors(&mut finger);
            let drift = (finger.start() - start).norm().max((finger.end() - end).norm());
            if drift > drift_limit {
                return Err(format!("finger {} does not end on its square edges", record.id));
            }
            loaded.push((id, finger));
        }

        let Some(((first_id, first), rest)) = loaded.split_first() else {
            return Ok(());
        };
        let mut set = OverrideSet::single(*first_id, first.clone());
        for (id, finger) in rest {
            set.insert(*id, finger.clone());
        }
        let validated = ValidityOracle::new(self, *self.oracle_config())
            .validate(set)
            .map_err(|_| "fingers cross, overlap or leave the square".to_owned())?;
        self.apply_overrides(validated).map_err(|err| err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point2;

    fn config() -> EditorConfig {
        EditorConfig::default()
    }

    fn curved_model() -> HeartModel {
        let mut model = HeartModel::new(4, &config()).unwrap();
        let id = model.finger_at(Lobe::Left, 2).unwrap();
        let mut finger = model.finger(id).unwrap().clone();
        finger.set_point(1, Point2::new(60.0, 85.0)).unwrap();
        finger.set_point(2, Point2::new(140.0, 115.0)).unwrap();
        let validated = ValidityOracle::new(&model, *model.oracle_config())
            .validate(OverrideSet::single(id, finger))
            .unwrap();
        model.apply_overrides(validated).unwrap();
        model
    }

    #[test]
    fn records_skip_outer_fingers() {
        let model = HeartModel::new(3, &config()).unwrap();
        let records = model.finger_records();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["L1", "L2", "R1", "R2"]);
        assert_eq!(records[0].path_data, "M 0 33.333333 C 33.333333 33.333333 66.666667 33.333333 100 33.333333");
    }

    #[test]
    fn json_round_trip_reproduces_geometry() {
        let model = curved_model();
        let mut design = HeartDesign::capture(&model);
        design.name = "Tulip".to_owned();
        let json = design.to_json().unwrap();
        assert!(json.contains("\"pathData\""));
        assert!(json.contains("\"gridSize\": 4"));

        let parsed = HeartDesign::from_json(&json).unwrap();
        assert_eq!(parsed, design);
        let (loaded, outcome) = HeartModel::from_design(&parsed, &config()).unwrap();
        assert_eq!(outcome, DesignLoad::Loaded);

        let id = model.finger_at(Lobe::Left, 2).unwrap();
        let original = model.finger(id).unwrap();
        let restored = loaded.finger(loaded.finger_at(Lobe::Left, 2).unwrap()).unwrap();
        assert!(original.approx_eq(restored, 1e-5));
    }

    #[test]
    fn malformed_path_falls_back_to_defaults() {
        let mut design = HeartDesign::capture(&curved_model());
        design.fingers[1].path_data = "M 0 50 L x 50".to_owned();
        let (model, outcome) = HeartModel::from_design(&design, &config()).unwrap();
        assert!(matches!(outcome, DesignLoad::FellBack { .. }));
        let id = model.finger_at(Lobe::Left, 2).unwrap();
        assert!(model.finger(id).unwrap().is_straight(1e-9));
    }

    #[test]
    fn crossing_fingers_fall_back_to_defaults() {
        let mut design = HeartDesign::capture(&HeartModel::new(3, &config()).unwrap());
        design.fingers[0].path_data = "M 0 33 C 30 90 70 90 100 33".to_owned();
        let (_, outcome) = HeartModel::from_design(&design, &config()).unwrap();
        assert!(matches!(outcome, DesignLoad::FellBack { .. }));
    }

    #[test]
    fn unknown_ids_fall_back() {
        let mut design = HeartDesign::capture(&HeartModel::new(3, &config()).unwrap());
        design.fingers[0].id = "L7".to_owned();
        let (_, outcome) = HeartModel::from_design(&design, &config()).unwrap();
        assert!(matches!(outcome, DesignLoad::FellBack { .. }));
    }

    #[test]
    fn bad_grid_size_is_an_error() {
        let design = HeartDesign {
            name: String::new(),
            author: String::new(),
            description: String::new(),
            grid_size: 0,
            weave_parity: false,
            fingers: Vec::new(),
        };
        assert!(HeartModel::from_design(&design, &config()).is_err());
        assert!(HeartDesign::from_json("{\"gridSize\": \"three\"}").is_err());
    }
}
