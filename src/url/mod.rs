//! URL handling module for corpus-crawler
//!
//! This module provides URL normalization, relative link resolution and
//! domain-key derivation. The domain key (`scheme://host[:port]`) is the unit
//! that robots.txt rules and crawl delays are scoped to.

mod domain;
mod normalize;

pub use domain::{domain_key, robots_url};
pub use normalize::{normalize_url, resolve_link};
