// Consultant chat: prompt digest of the analyzed candidates, streamed replies,
// and the transcript bookkeeping around them.

pub mod conversation;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
