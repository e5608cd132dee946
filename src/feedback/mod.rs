// Feedback loop module
// Append-only interaction log, manual correction tags, the human review
// flow over low-confidence records, and the weekly training dataset that
// closes the loop back into classifier training.

pub mod curator;
pub mod dataset;
pub mod log;
pub mod tags;

pub use curator::{ConsoleReviewer, CurationOutcome, Curator, ReviewInterface};
pub use dataset::{TrainingExample, build_training_set, read_training_set};
pub use log::{InteractionLog, LogRecord};
pub use tags::{ManualTag, ManualTagStore};
