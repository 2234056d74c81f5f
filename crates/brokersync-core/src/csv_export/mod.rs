//! Composite CSV export handling: marker-driven section splitting and row
//! projection into ordered column mappings.

mod rows;
mod splitter;

pub use rows::{project_rows, project_single_row, HOLDINGS_SYNTHETIC_HEADER};
pub use splitter::{
    split_sections, ExportLayout, SectionMarker, SectionName, Sections, RBCDI_ACCOUNT_STATS_HEADER,
    RBCDI_ACTIVITY_FOOTER, RBCDI_CASH_HEADER, RBCDI_HOLDINGS_FOOTER, RBCDI_HOLDINGS_HEADER,
    RBCDI_TRANSACTIONS_HEADER,
};
