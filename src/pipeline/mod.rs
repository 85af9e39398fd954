pub mod analysis_service;
pub mod sequencer;
pub mod session;

pub use analysis_service::AnalysisService;
pub use sequencer::{LoadSequencer, LoadToken};
pub use session::{AnalysisSession, LoadOutcome, Slot};
