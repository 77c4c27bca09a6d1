//! Literal-propagating abstract interpretation of method bodies
//!
//! - **value**: cells with category, literal and provenance
//! - **frame**: locals and operand stack with JVM slot discipline
//! - **fold**: constant folding under JVM arithmetic rules
//! - **interpreter**: per-instruction transfer function
//! - **observer**: pre-instruction hook that can inject code
//! - **analyzer**: drives observers and interpreter over a stream
//! - **call_site**: argument lookup for pending invocations

pub mod analyzer;
pub mod call_site;
pub mod fold;
pub mod frame;
pub mod interpreter;
pub mod observer;
pub mod value;

pub use analyzer::{Analysis, Analyzer, MethodContext};
pub use frame::FrameState;
pub use interpreter::Interpreter;
pub use observer::{Emitter, Observer};
pub use value::{Category, CreationSite, Literal, Value};
