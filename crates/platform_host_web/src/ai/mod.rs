//! Network text-generation backends selected by [`platform_host::ProviderTag`].

pub mod anthropic;
pub mod openai;
pub mod service;
pub mod sse;
