// ============================================================
// Layer 3 - Run Modes
// ============================================================
// Single-character codes select the loss and the network's
// output head. Parsing them into enums means an unsupported
// code is rejected once, at construction, and every later
// `match` is exhaustive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SiameseError;

/// Training loss, selected by code `c` or `l`.
///
/// Label conventions differ per loss:
///   - `Contrastive`: output is a distance; label 0 = matching pair,
///     label 1 = non-matching pair.
///   - `Logistic`: output is a logit; label +1 = matching pair,
///     label -1 = non-matching pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossKind {
    Contrastive,
    Logistic,
}

impl LossKind {
    pub fn code(&self) -> char {
        match self {
            LossKind::Contrastive => 'c',
            LossKind::Logistic    => 'l',
        }
    }

    /// Labels this loss expects in a training archive
    pub fn expected_labels(&self) -> &'static [f32] {
        match self {
            LossKind::Contrastive => &[0.0, 1.0],
            LossKind::Logistic    => &[-1.0, 1.0],
        }
    }
}

impl FromStr for LossKind {
    type Err = SiameseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" => Ok(LossKind::Contrastive),
            "l" => Ok(LossKind::Logistic),
            other => Err(SiameseError::UnsupportedLoss(other.to_string())),
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// How the two branch embeddings are turned into one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputMode {
    /// `e`: Euclidean distance between embeddings (>= 0)
    Euclidean,
    /// `c`: cosine similarity between embeddings, in [-1, 1]
    Cosine,
    /// `l`: unbounded logit from a linear head over |a - b|
    Logit,
}

impl OutputMode {
    pub fn code(&self) -> char {
        match self {
            OutputMode::Euclidean => 'e',
            OutputMode::Cosine    => 'c',
            OutputMode::Logit     => 'l',
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Euclidean
    }
}

impl FromStr for OutputMode {
    type Err = SiameseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "e" => Ok(OutputMode::Euclidean),
            "c" => Ok(OutputMode::Cosine),
            "l" => Ok(OutputMode::Logit),
            other => Err(SiameseError::UnsupportedOutputMode(other.to_string())),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_codes_round_trip() {
        for kind in [LossKind::Contrastive, LossKind::Logistic] {
            assert_eq!(kind.to_string().parse::<LossKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_loss_code_is_named() {
        let err = "x".parse::<LossKind>().unwrap_err();
        match &err {
            SiameseError::UnsupportedLoss(code) => assert_eq!(code, "x"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("loss function x"));
    }

    #[test]
    fn test_output_modes() {
        assert_eq!("e".parse::<OutputMode>().unwrap(), OutputMode::Euclidean);
        assert_eq!("c".parse::<OutputMode>().unwrap(), OutputMode::Cosine);
        assert_eq!("l".parse::<OutputMode>().unwrap(), OutputMode::Logit);
        assert!(matches!(
            "q".parse::<OutputMode>(),
            Err(SiameseError::UnsupportedOutputMode(_))
        ));
        assert_eq!(OutputMode::default(), OutputMode::Euclidean);
    }
}
