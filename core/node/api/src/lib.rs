//! REST surface for deployment configuration: the witness policy
//! endpoint. Write-side validation goes through the policy parser, so a
//! stored policy is always parseable.

mod api_decl;
mod api_impl;
mod error;

pub use self::{api_decl::RestApi, error::ApiError};
