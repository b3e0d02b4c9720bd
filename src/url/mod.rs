//! URL handling module for Sitemap-Survey
//!
//! This module provides the website identity used as the aggregation join key,
//! page level computation and homepage URL construction.

mod domain;
mod normalize;

pub use domain::{homepage_url, url_level};
pub use normalize::website_identity;
