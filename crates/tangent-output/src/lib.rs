#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tangent/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod allocation;
pub mod export;
pub mod report;
pub mod summary;

pub use allocation::{Allocation, AllocationSnapshot, Holding};
pub use export::{
    AnchorExport, ExportError, ExportFormat, Exporter, FrontierExport, FrontierPointExport,
    SampleExport,
};
pub use report::{PriceWindow, Report, ReportBuilder, ReportError};
pub use summary::{PerformanceSummary, comparison_markdown, comparison_table};
