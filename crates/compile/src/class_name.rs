use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder used when the source declares no public class.
pub const DEFAULT_CLASS_NAME: &str = "TempClass";

static PUBLIC_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"public\s+class\s+(\w+)").expect("public class pattern should compile")
});

/// First `public class <Name>` declaration in the source, if any.
/// （原始碼中第一個 `public class <Name>` 宣告的名稱。）
pub fn extract_public_class(source: &str) -> Option<&str> {
    PUBLIC_CLASS
        .captures(source)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

/// Class name used for the staged file and the `java` invocation, falling
/// back to [`DEFAULT_CLASS_NAME`] when no public class is declared.
pub fn main_class_name(source: &str) -> String {
    extract_public_class(source)
        .unwrap_or(DEFAULT_CLASS_NAME)
        .to_string()
}

/// Splits the user-supplied argument string on whitespace. No quoting
/// semantics: `"a b"` is two arguments.
pub fn split_args(text: &str) -> Vec<String> {
    text.split_whitespace().map(String::from).collect()
}
