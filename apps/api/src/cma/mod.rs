// CMA engine: prompt construction, single model call, response parsing,
// persistence, and the HTTP surface.
// All model calls go through llm_client, never directly from here.

pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod repository;
pub mod service;
