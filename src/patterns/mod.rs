//! Observers that recognise call-site patterns and rewrite them

pub mod component_offset;

pub use component_offset::{ComponentOffsetRewriter, RewriteState};
