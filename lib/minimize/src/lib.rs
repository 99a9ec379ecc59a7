//! Post-processing around an opaque JavaScript minifier.
//!
//! [`minimize`] wraps a minifier [`OutputPlugin`] so that every chunk it renders gets a banner
//! prepended and a footer appended, where the footer may carry the MD5 checksum of the stamped
//! code through the `[hash]` placeholder. Minifiers built through a factory receive
//! [`MinifierOptions`] with a comment policy that keeps each license comment once per chunk.
pub mod comments;
pub mod deferred;
mod error;
pub mod merge;
pub mod options;
mod plugin;
pub mod stamp;

pub use comments::{CommentFilter, CommentKind, CommentToken, DedupCache};
pub use deferred::Deferred;
pub use error::{BoxError, PluginError};
pub use merge::merge;
pub use options::{CommentDecision, CommentPolicy, MinifierOptions};
pub use plugin::{
    Factory, Implementation, MinimizePlugin, OutputOptions, OutputPlugin, PluginConfig,
    RenderOutput, RenderedChunk, SourceMap, minimize,
};
