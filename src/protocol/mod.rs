pub mod assembler;
pub mod canonical;
pub mod chunk;
pub mod gemini;
pub mod interactions;
pub mod mapping;
pub mod media;
pub mod signature;
pub mod tools;

pub use canonical::{
    CanonicalMessage, CanonicalResponse, CanonicalRole, CanonicalStopReason, CanonicalUsage,
    ContentBlock, ImageSource, MessageContent, ToolCall,
};
pub use chunk::{CanonicalMessageChunk, ToolCallChunk};
pub use tools::{ToolChoice, ToolDeclaration, ToolEntry, ToolMode};
