//! Content-addressed storage for anchor artifacts. Content is identified
//! by its multibase-encoded SHA2-256 multihash; references travel as
//! `hl:` hashlinks whose optional metadata carries retrieval hints.

mod error;
mod http;
mod mem;
mod resolver;

pub use self::{
    error::CasError,
    http::HttpCasClient,
    mem::MemCasClient,
    resolver::{CasResolver, WriteResult},
};

use std::fmt;

use async_trait::async_trait;

/// A CAS backend. `write` returns the content identifier (a multihash);
/// `read` accepts only raw content identifiers. Hashlink handling lives
/// in [`CasResolver`].
#[async_trait]
pub trait CasClient: Send + Sync + fmt::Debug {
    async fn write(&self, content: &[u8]) -> Result<String, CasError>;

    async fn read(&self, cid: &str) -> Result<Vec<u8>, CasError>;
}
