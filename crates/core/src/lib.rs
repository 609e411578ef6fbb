pub mod document;

pub use document::{
    ensure_java_extension, DocumentError, LegacyEncoding, LineEnding, SourceDocument,
    SourceEncoding,
};
