pub mod chart;
pub mod series;

pub use chart::render;
pub use series::{sort_by_date, ReportSeries};
