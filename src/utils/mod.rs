//! Utility modules for jpg-fetch
//!
//! - `files`: directory layout and on-disk naming
//! - `http`: HTTP request helpers

pub mod files;
pub mod http;
