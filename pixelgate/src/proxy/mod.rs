//! The outbound fetch pipeline.
//!
//! A client request enters through [`Pipeline::resolve`], which walks the
//! redirect chain hop by hop: one origin exchange per hop, classified by the
//! [`guard`] predicates, until a hop produces the single client response.

pub mod connector;
pub mod error;
pub mod fetcher;
pub mod guard;
pub mod pipeline;
pub mod redirect;
pub mod report;
pub mod streamer;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ProxyError;
pub use fetcher::{HyperTransport, OriginFetcher, OriginTransport};
pub use pipeline::Pipeline;
pub use report::{NotFoundReporter, Reporter};
