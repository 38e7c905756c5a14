//! CLI domain: parse, route, output and presentation only.
//! Route handlers stay thin and delegate to the generator and document service.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, DEFAULT_OWNER};
pub use presentation::{
    format_document_list, format_document_view, format_generation_report, format_outline,
    format_part, format_part_summaries,
};
pub use route::RunContext;
