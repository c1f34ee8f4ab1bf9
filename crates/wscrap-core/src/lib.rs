pub mod config;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod orchestrator;
pub mod pool;
pub mod retry;
pub mod scrape;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
