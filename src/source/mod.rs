//! Remote catalog access.
//!
//! [`CatalogSource`] is the seam between the pipeline and the archive
//! hosting the catalog partitions: a directory listing plus a streaming
//! byte read per file. The shipped implementation is [`HttpSource`]; tests
//! substitute scripted sources to exercise failure paths.

mod http;
mod reader;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::error::SourceError;

pub use http::HttpSource;
pub use reader::{RawRow, read_raw_partition};

/// Stream of byte chunks from a remote file.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, SourceError>> + Send>>;

/// An open streaming read of one remote file.
pub struct RemoteRead {
    /// Declared byte length from the archive, 0 when unknown.
    ///
    /// A zero declared length means the transfer cannot be verified and
    /// stream end is accepted as success.
    pub declared_len: u64,
    /// The body bytes.
    pub stream: ByteStream,
}

/// Access to the remote catalog archive.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List the full URLs of catalog partitions matching an extension, in
    /// the order the archive presents them.
    async fn list(&self, extension: &str) -> Result<Vec<String>, SourceError>;

    /// Open a streaming read of one remote file, starting at byte zero.
    async fn open(&self, url: &str) -> Result<RemoteRead, SourceError>;
}
