//! Intent execution front end
//!
//! [`IntentRouter`] picks a path for each intent from the configured
//! [`ExecutionMode`]. [`CodeExecutor`] enforces the token budget, consults
//! the cache, generates code and runs it through the sandbox orchestrator,
//! answering with a JSON-RPC [`Envelope`].

mod codegen;
mod flags;
mod response;
mod router;
mod runner;

#[cfg(test)]
mod tests;

pub use codegen::{CodeGenerator, TemplateGenerator};
pub use flags::{ExecutionMode, FeatureFlags};
pub use response::{
    Envelope, ErrorBody, ErrorCode, ErrorData, JSONRPC_VERSION, ResponseMetadata, SuccessBody,
};
pub use router::{IntentRouter, Route};
pub use runner::{CodeExecutor, RequestScope, estimate_tokens};
