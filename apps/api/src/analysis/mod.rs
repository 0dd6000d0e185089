// Résumé analysis: prompt + attachment building, schema-constrained decoding,
// and the batch run that attaches results to a session.
// All model calls go through llm_client; no direct HTTP here.

pub mod handlers;
pub mod prompts;
pub mod request;
pub mod runner;
