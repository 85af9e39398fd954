pub mod channel;
pub mod sample_set;

pub use channel::{Channel, ChannelVisibility};
pub use sample_set::{Chromaticities, Chromaticity, SampleSet, SampleType, SourceMetadata};
