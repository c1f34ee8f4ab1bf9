//! CLI command handlers, one per file.

mod add;
mod run;
mod status;

pub use add::run_add;
pub use run::run_scraper;
pub use status::run_status;

#[cfg(test)]
pub(crate) use status::status_lines;
