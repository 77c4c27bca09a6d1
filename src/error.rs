use thiserror::Error;

/// Result type for litstack operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the literal-propagating interpreter
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Legacy subroutine instructions (`jsr`, `ret`) are rejected outright.
    #[error("Unsupported instruction: {mnemonic} (subroutines are not analysed)")]
    UnsupportedInstruction { mnemonic: String },

    #[error("Compressed frame record ({kind}) is not supported; frames must be expanded")]
    CompressedFrame { kind: String },

    #[error("Invalid descriptor: {descriptor}")]
    InvalidDescriptor { descriptor: String },

    #[error("Malformed instruction: {message}")]
    MalformedInstruction { message: String },

    #[error("Stack underflow at {opcode}")]
    StackUnderflow { opcode: String },

    #[error("Stack overflow: limit of {limit} slots exceeded")]
    StackOverflow { limit: usize },

    #[error("Frame is unreachable")]
    Unreachable,

    #[error("Literal mismatch at {opcode}: expected {expected}, found {found}")]
    LiteralMismatch {
        opcode: String,
        expected: String,
        found: String,
    },

    #[error("Listing error at line {line}: {message}")]
    Listing { line: usize, message: String },
}

impl Error {
    /// Create an unsupported-instruction error
    pub fn unsupported(mnemonic: impl Into<String>) -> Self {
        Self::UnsupportedInstruction { mnemonic: mnemonic.into() }
    }

    /// Create an invalid-descriptor error
    pub fn invalid_descriptor(descriptor: impl Into<String>) -> Self {
        Self::InvalidDescriptor { descriptor: descriptor.into() }
    }

    /// Create a malformed-instruction error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInstruction { message: message.into() }
    }

    /// Create a listing error with its line number
    pub fn listing(line: usize, message: impl Into<String>) -> Self {
        Self::Listing { line, message: message.into() }
    }

    /// True for the invariant-violation family: the input was not verified
    /// bytecode, or the interpreter itself is wrong.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::StackUnderflow { .. }
                | Self::StackOverflow { .. }
                | Self::Unreachable
                | Self::LiteralMismatch { .. }
        )
    }
}
