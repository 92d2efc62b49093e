//! The versioned codec between a batch payload and its on-wire linkset
//! form, plus the anchor event builder wrapping the linkset for
//! replication.

mod builder;
mod generator;
mod registry;

pub use self::{
    builder::{AnchorBuilder, BuiltAnchor},
    generator::{AnchorLinksetGenerator, Generator, UNPUBLISHED_LABEL},
    registry::Registry,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinksetError {
    #[error("generator not found [{0}]")]
    GeneratorNotFound(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid content object: {0}")]
    InvalidContentObject(String),

    #[error("invalid anchor credential: {0}")]
    InvalidCredential(String),
}
