//! These models represent the objects passed around by the agent
//!
//! There are several related formats we need to interact with:
//! - the caller's chat payloads (prompt, history, file attachments)
//! - openai-style messages/tools, sent from the agent to the LLM
//! - anthropic-style and gemini-style messages/tools
//! - MCP requests, sent from the agent to the remote tool server
//!
//! These all overlap to varying degrees. We immediately convert incoming data
//! into the internal structs using to/from helpers, so the internal models are
//! not an exact match to any single wire format.
pub mod attachment;
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
