use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One detected object as the producer reports it. Field names match the
/// wire format exactly; unknown fields reject the whole datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub bbox_normalized: NormalizedBbox,
}

/// Bounding box with all coordinates normalized to the frame, in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizedBbox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("payload is not a valid detection array: {0}")]
    Json(#[from] serde_json::Error),
    #[error("detection {index} rejected: {reason}")]
    OutOfRange { index: usize, reason: &'static str },
}

/// Parses one datagram payload as a complete detection batch.
///
/// The schema is a strict contract: any structural mismatch, unknown field,
/// or out-of-range value rejects the entire batch. A batch is never
/// partially accepted.
pub fn parse_batch(payload: &[u8]) -> Result<Vec<Detection>, DecodeError> {
    let batch: Vec<Detection> = serde_json::from_slice(payload)?;

    for (index, detection) in batch.iter().enumerate() {
        detection
            .validate()
            .map_err(|reason| DecodeError::OutOfRange { index, reason })?;
    }

    Ok(batch)
}

impl Detection {
    fn validate(&self) -> Result<(), &'static str> {
        if !in_unit_range(self.confidence) {
            return Err("confidence outside [0, 1]");
        }
        self.bbox_normalized.validate()
    }
}

impl NormalizedBbox {
    fn validate(&self) -> Result<(), &'static str> {
        let coords = [self.xmin, self.ymin, self.xmax, self.ymax];
        if coords.iter().any(|c| !in_unit_range(*c)) {
            return Err("bbox coordinate outside [0, 1]");
        }
        Ok(())
    }
}

fn in_unit_range(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
