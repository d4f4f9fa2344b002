//! Seeker library
//!
//! Search-and-summarize client: fetches search results, then asks the first
//! available LLM provider for a Markdown summary, with retry and failover.

pub mod cli;
pub mod config;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod search;
pub mod search_log;
