pub mod engine;
pub mod outcome;

pub use engine::{summarize_feeder, EvaluatedClass, EvaluatedRow};
pub use outcome::{ClassResult, HcSummaryRow, HostingCapacityReport, HostingCapacitySummary};
