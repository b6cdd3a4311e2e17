//! Tile server access
//!
//! This module provides the HTTP client abstraction, `{z}/{x}/{y}` URL
//! templating, and the per-tile fetch operation. Remote failures are a
//! per-tile concern here: a failed fetch produces a failed [`RawPayload`],
//! never an error that would abort the surrounding query.

mod fetcher;
mod http;
mod template;

pub use fetcher::{RawPayload, TileFetcher};
pub use http::{
    FetchError, HttpClient, ReqwestClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
};
pub use template::{TemplateError, TileUrlTemplate};

#[cfg(test)]
pub use http::tests::MockHttpClient;
