use crate::error::{TrainingError, TrainingResult};
use crate::frame::Cell;

/// Fixed mapping from churn labels to numeric classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetValueMapping;

impl TargetValueMapping {
    pub const YES: f64 = 1.0;
    pub const NO: f64 = 0.0;

    pub fn encode(&self, cell: &Cell) -> TrainingResult<f64> {
        match cell {
            Cell::Text(s) if s.eq_ignore_ascii_case("yes") => Ok(Self::YES),
            Cell::Text(s) if s.eq_ignore_ascii_case("no") => Ok(Self::NO),
            other => match other.as_f64() {
                Some(v) if v == Self::YES || v == Self::NO => Ok(v),
                _ => Err(TrainingError::Dataset(format!("unmappable target label: {other:?}"))),
            },
        }
    }

    pub fn encode_all(&self, cells: &[Cell]) -> TrainingResult<Vec<f64>> {
        cells.iter().map(|c| self.encode(c)).collect()
    }

    /// Human-readable form used by the prediction surface.
    #[must_use]
    pub fn label(&self, class: f64) -> &'static str {
        if class == Self::YES { "Churned" } else { "Not Churned" }
    }
}
