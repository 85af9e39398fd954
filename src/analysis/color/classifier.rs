use std::time::Instant;
use tracing::debug;

use super::{ClassificationContext, ClassificationRule, ColorEncodingInfo};
use crate::common::SampleSet;

/// Infers color space and transfer encoding by running [`ClassificationRule`]s in order.
#[derive(Debug, Clone)]
pub struct ColorEncodingClassifier {
    rules: Vec<ClassificationRule>,
}

impl Default for ColorEncodingClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorEncodingClassifier {
    pub fn new() -> Self {
        Self {
            rules: ClassificationRule::ORDER.to_vec(),
        }
    }

    /// Drops a rule, e.g. to ignore untrusted header tags.
    pub fn without_rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.retain(|r| *r != rule);
        self
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Never fails; falls back to Unknown/Unknown with zero confidence.
    pub fn classify(&self, samples: &SampleSet) -> ColorEncodingInfo {
        let start = Instant::now();
        let Some(context) = ClassificationContext::from_samples(samples) else {
            debug!("No finite color samples, classification is Unknown");
            return ColorEncodingInfo::unknown();
        };

        for rule in &self.rules {
            if let Some(info) = rule.evaluate(&context) {
                debug!(
                    "{}: {} / {} with confidence {:.2} in {}us",
                    rule.name(),
                    info.color_space,
                    info.encoding,
                    info.confidence,
                    start.elapsed().as_micros()
                );
                return info;
            }
            debug!("{}: no match", rule.name());
        }

        ColorEncodingInfo::unknown()
    }
}
