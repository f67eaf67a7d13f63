//! Access to the platform's timeline API
//!
//! This module contains:
//! - HTTP client construction
//! - The `PageSource` trait and its HTTP implementation
//! - Session header templates replayed on timeline requests

mod client;
mod session;

pub use client::{build_http_client, PageSource, TimelineClient};
pub use session::{HeaderTemplate, SessionProvider};
