pub mod formatter;

pub use formatter::{
    format_age, format_average, format_catalog, format_ranking_table, format_ranking_tsv,
    format_report, format_reports, format_total, should_use_colors, truncate_name,
};
