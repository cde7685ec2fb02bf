#![cfg_attr(docsrs, feature(doc_cfg))]
//! Vigil is a retrieval-augmented guardrail pipeline for LLM gateways: it
//! checks natural-language text against a policy-rule corpus and always
//! produces a well-formed structured verdict, even when the underlying
//! classifier model returns malformed or conversational output.

pub mod error;
pub mod guardrail;
pub mod policy;
pub mod prelude;
pub mod providers;

pub use error::{Error, Result};
pub use guardrail::{FailurePolicy, GuardrailPipeline, SecurityVerdict, VerdictSource};
