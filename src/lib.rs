//! JobScout core: headless-browser drivers for remote job boards, an
//! LLM-backed posting classifier, and the filter pipeline between them.
//!
//! The crate is an orchestration layer. It owns no storage and no UI:
//! postings, settings, cookie sets, and bug reports flow through the
//! [`store::JobStore`] contract, progress flows out through
//! [`notify::NotificationSink`], and a desktop shell (or the bundled CLI)
//! supplies both.

pub mod browser;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod filters;
pub mod manager;
pub mod models;
pub mod notify;
pub mod scrapers;
pub mod store;
