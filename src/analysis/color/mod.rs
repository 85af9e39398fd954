pub mod classifier;
pub mod primaries;
pub mod rules;

pub use classifier::ColorEncodingClassifier;
pub use rules::{ClassificationContext, ClassificationRule};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    Aces,
    Rec709,
    Rec2020,
    DciP3,
    Unknown,
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorSpace::Aces => "ACES",
            ColorSpace::Rec709 => "Rec.709",
            ColorSpace::Rec2020 => "Rec.2020",
            ColorSpace::DciP3 => "DCI-P3",
            ColorSpace::Unknown => "Unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    Linear,
    Log,
    Unknown,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Linear => "Linear",
            Encoding::Log => "Log",
            Encoding::Unknown => "Unknown",
        })
    }
}

/// Classification verdict with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorEncodingInfo {
    pub color_space: ColorSpace,
    pub encoding: Encoding,
    pub confidence: f32,
    pub rule: Option<ClassificationRule>,
    /// Set when header primaries only approximately matched a known set.
    pub approximate: bool,
    pub detail: Option<String>,
}

impl ColorEncodingInfo {
    pub fn unknown() -> Self {
        Self {
            color_space: ColorSpace::Unknown,
            encoding: Encoding::Unknown,
            confidence: 0.0,
            rule: None,
            approximate: false,
            detail: None,
        }
    }

    /// "Rec.2020 (approx)"
    pub fn color_space_label(&self) -> String {
        if self.approximate {
            format!("{} (approx)", self.color_space)
        } else {
            self.color_space.to_string()
        }
    }
}
