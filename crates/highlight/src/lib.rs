mod language;
mod theme;

pub use language::{
    builtin, HighlightError, HighlightKind, HighlightToken, LanguageDefinition, LanguageRegistry,
    LanguageSpec, StringDelimiter,
};
pub use theme::{Color, HighlightPalette, HighlightStyle};
