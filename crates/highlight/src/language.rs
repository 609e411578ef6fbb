use std::collections::HashMap;
use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NUMBER_PATTERN: &str = r"(?x)
    \b(?:
        0[xX][0-9A-Fa-f_]+[lL]? |
        0[bB][01_]+[lL]? |
        [0-9][0-9_]*(\.[0-9_]+)?([eE][+-]?[0-9_]+)?[lLfFdD]?
    )\b
";

/// Plain-data description of a language's token rules.
/// （描述語言記號規則的純資料結構。）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSpec {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_comment: Option<(String, String)>,
    #[serde(default)]
    pub string_delimiters: Vec<StringDelimiter>,
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,
}

fn default_case_sensitive() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringDelimiter {
    pub start: String,
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    Keyword,
    Comment,
    String,
    Number,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightToken {
    pub range: Range<usize>,
    pub kind: HighlightKind,
}

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("language '{0}' is not registered")]
    LanguageNotRegistered(String),
    #[error("regex compilation failed: {0}")]
    RegexCompilation(String),
}

/// Compiled form of a [`LanguageSpec`], ready to scan source text.
#[derive(Debug, Clone)]
pub struct LanguageDefinition {
    pub id: String,
    pub display_name: String,
    pub extensions: Vec<String>,
    pub case_sensitive: bool,

    keyword_regex: Option<Regex>,
    operator_regex: Option<Regex>,
    number_regex: Regex,
    line_comment: Option<String>,
    block_comment: Option<(String, String)>,
    string_delimiters: Vec<StringDelimiter>,
}

impl LanguageDefinition {
    pub fn compile(spec: LanguageSpec) -> Result<Self, HighlightError> {
        let keyword_regex = build_keyword_regex(&spec.keywords, spec.case_sensitive)?;
        let operator_regex = build_operator_regex(&spec.operators)?;
        let number_regex = Regex::new(NUMBER_PATTERN)
            .map_err(|err| HighlightError::RegexCompilation(format!("number regex: {err}")))?;

        Ok(Self {
            id: spec.id,
            display_name: spec.name,
            extensions: spec.extensions,
            case_sensitive: spec.case_sensitive,
            keyword_regex,
            operator_regex,
            number_regex,
            line_comment: spec.line_comment,
            block_comment: spec.block_comment,
            string_delimiters: spec.string_delimiters,
        })
    }

    /// Scans the input and returns non-overlapping tokens sorted by position.
    /// Comments and strings claim their spans first; keyword, number and
    /// operator matches only land on unclaimed bytes.
    pub fn highlight(&self, input: &str) -> Vec<HighlightToken> {
        let mut tokens = Vec::new();
        if input.is_empty() {
            return tokens;
        }
        let mut claimed = vec![false; input.len()];

        if let Some((start, end)) = &self.block_comment {
            scan_block_comments(start, end, input, &mut tokens, &mut claimed);
        }

        if let Some(marker) = &self.line_comment {
            scan_line_comments(marker, input, &mut tokens, &mut claimed);
        }

        for delimiter in &self.string_delimiters {
            scan_strings(delimiter, input, &mut tokens, &mut claimed);
        }

        if let Some(regex) = &self.keyword_regex {
            scan_with_regex(regex, HighlightKind::Keyword, input, &mut tokens, &mut claimed);
        }

        scan_with_regex(
            &self.number_regex,
            HighlightKind::Number,
            input,
            &mut tokens,
            &mut claimed,
        );

        if let Some(regex) = &self.operator_regex {
            scan_with_regex(
                regex,
                HighlightKind::Operator,
                input,
                &mut tokens,
                &mut claimed,
            );
        }

        tokens.sort_by_key(|token| token.range.start);
        tokens
    }
}

#[derive(Default)]
pub struct LanguageRegistry {
    languages: HashMap<String, LanguageDefinition>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self {
            languages: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for language in builtin::builtins() {
            registry.register(language);
        }
        registry
    }

    pub fn register(&mut self, language: LanguageDefinition) {
        self.languages.insert(language.id.clone(), language);
    }

    pub fn register_spec(&mut self, spec: LanguageSpec) -> Result<(), HighlightError> {
        let definition = LanguageDefinition::compile(spec)?;
        self.register(definition);
        Ok(())
    }

    pub fn get(&self, id: impl AsRef<str>) -> Option<&LanguageDefinition> {
        self.languages.get(id.as_ref())
    }

    pub fn highlight(
        &self,
        id: impl AsRef<str>,
        input: &str,
    ) -> Result<Vec<HighlightToken>, HighlightError> {
        let language = self
            .get(id.as_ref())
            .ok_or_else(|| HighlightError::LanguageNotRegistered(id.as_ref().to_string()))?;
        Ok(language.highlight(input))
    }
}

fn scan_block_comments(
    open: &str,
    close: &str,
    input: &str,
    tokens: &mut Vec<HighlightToken>,
    claimed: &mut [bool],
) {
    if open.is_empty() || close.is_empty() {
        return;
    }
    let mut index = 0;
    while index < input.len() {
        match input[index..].find(open) {
            Some(found) => {
                let start = index + found;
                let content_start = start + open.len();
                // An unterminated comment runs to the end of input.
                let mut end = input.len();
                if let Some(end_rel) = input[content_start..].find(close) {
                    end = content_start + end_rel + close.len();
                }
                claim_range(claimed, start..end);
                tokens.push(HighlightToken {
                    range: start..end,
                    kind: HighlightKind::Comment,
                });
                index = end;
            }
            None => break,
        }
    }
}

fn scan_line_comments(
    marker: &str,
    input: &str,
    tokens: &mut Vec<HighlightToken>,
    claimed: &mut [bool],
) {
    if marker.is_empty() {
        return;
    }
    let mut cursor = 0;
    for line in input.split_inclusive('\n') {
        if let Some(position) = line.find(marker) {
            let start = cursor + position;
            if !claimed.get(start).copied().unwrap_or(false) {
                let end = cursor + line.len();
                claim_range(claimed, start..end);
                tokens.push(HighlightToken {
                    range: start..end,
                    kind: HighlightKind::Comment,
                });
            }
        }
        cursor += line.len();
    }
}

fn scan_strings(
    delimiter: &StringDelimiter,
    input: &str,
    tokens: &mut Vec<HighlightToken>,
    claimed: &mut [bool],
) {
    if delimiter.start.is_empty() || delimiter.end.is_empty() {
        return;
    }

    let bytes = input.as_bytes();
    let mut index = 0;
    while index < input.len() {
        match input[index..].find(&delimiter.start) {
            Some(rel_start) => {
                let start = index + rel_start;
                if claimed.get(start).copied().unwrap_or(false) {
                    index = start + delimiter.start.len();
                    continue;
                }

                let mut cursor = start + delimiter.start.len();
                let mut end = input.len();
                while cursor < input.len() {
                    if input[cursor..].starts_with(&delimiter.end) {
                        if let Some(escape) = delimiter.escape {
                            if cursor > start + delimiter.start.len()
                                && bytes[cursor - 1] as char == escape
                            {
                                cursor += 1;
                                continue;
                            }
                        }
                        end = cursor + delimiter.end.len();
                        break;
                    }
                    cursor += 1;
                }
                claim_range(claimed, start..end);
                tokens.push(HighlightToken {
                    range: start..end,
                    kind: HighlightKind::String,
                });
                index = end;
            }
            None => break,
        }
    }
}

fn scan_with_regex(
    regex: &Regex,
    kind: HighlightKind,
    input: &str,
    tokens: &mut Vec<HighlightToken>,
    claimed: &mut [bool],
) {
    for found in regex.find_iter(input) {
        let range = found.start()..found.end();
        if range
            .clone()
            .any(|index| claimed.get(index).copied().unwrap_or(false))
        {
            continue;
        }
        claim_range(claimed, range.clone());
        tokens.push(HighlightToken {
            range,
            kind: kind.clone(),
        });
    }
}

fn claim_range(claimed: &mut [bool], range: Range<usize>) {
    let start = range.start.min(claimed.len());
    let end = range.end.min(claimed.len());
    for index in start..end {
        claimed[index] = true;
    }
}

fn build_keyword_regex(
    keywords: &[String],
    case_sensitive: bool,
) -> Result<Option<Regex>, HighlightError> {
    if keywords.is_empty() {
        return Ok(None);
    }
    let pattern = keywords
        .iter()
        .map(|keyword| regex::escape(keyword))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"\b({pattern})\b");
    let mut builder = RegexBuilder::new(&pattern);
    builder.multi_line(true);
    if !case_sensitive {
        builder.case_insensitive(true);
    }
    builder.build().map(Some).map_err(|err| {
        HighlightError::RegexCompilation(format!("keyword regex compile error: {err}"))
    })
}

fn build_operator_regex(operators: &[String]) -> Result<Option<Regex>, HighlightError> {
    if operators.is_empty() {
        return Ok(None);
    }
    let pattern = operators
        .iter()
        .map(|operator| regex::escape(operator))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!("({pattern})");
    Regex::new(&pattern)
        .map(Some)
        .map_err(|err| HighlightError::RegexCompilation(format!("operator regex: {err}")))
}

pub mod builtin {
    use super::*;

    pub fn builtins() -> Vec<LanguageDefinition> {
        vec![java(), plain_text()]
    }

    /// Java token rules: reserved words plus the literals and `String`, which
    /// the editor colors the same way.
    pub fn java() -> LanguageDefinition {
        let spec = LanguageSpec {
            name: "Java".into(),
            id: "java".into(),
            extensions: vec!["java".into()],
            keywords: vec![
                "abstract",
                "assert",
                "boolean",
                "break",
                "byte",
                "case",
                "catch",
                "char",
                "class",
                "const",
                "continue",
                "default",
                "do",
                "double",
                "else",
                "enum",
                "extends",
                "final",
                "finally",
                "float",
                "for",
                "goto",
                "if",
                "implements",
                "import",
                "instanceof",
                "int",
                "interface",
                "long",
                "native",
                "new",
                "package",
                "private",
                "protected",
                "public",
                "return",
                "short",
                "static",
                "strictfp",
                "super",
                "switch",
                "synchronized",
                "this",
                "throw",
                "throws",
                "transient",
                "try",
                "var",
                "void",
                "volatile",
                "while",
                "record",
                "yield",
                "true",
                "false",
                "null",
                "String",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            line_comment: Some("//".into()),
            block_comment: Some(("/*".into(), "*/".into())),
            string_delimiters: vec![
                StringDelimiter {
                    start: "\"".into(),
                    end: "\"".into(),
                    escape: Some('\\'),
                },
                StringDelimiter {
                    start: "'".into(),
                    end: "'".into(),
                    escape: Some('\\'),
                },
            ],
            operators: vec![
                "==", "!=", ">=", "<=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=",
                "->", "::", "+", "-", "*", "/", "%", ">", "<", "&", "|", "^", "!", "=",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            case_sensitive: true,
        };
        LanguageDefinition::compile(spec).expect("built-in java rules should compile")
    }

    pub fn plain_text() -> LanguageDefinition {
        let spec = LanguageSpec {
            name: "Plain Text".into(),
            id: "plain_text".into(),
            extensions: Vec::new(),
            keywords: Vec::new(),
            line_comment: None,
            block_comment: None,
            string_delimiters: Vec::new(),
            operators: Vec::new(),
            case_sensitive: true,
        };
        LanguageDefinition::compile(spec).expect("plain text rules should compile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_java_keywords_comments_strings_and_numbers() {
        let registry = LanguageRegistry::with_defaults();
        let source = r#"
        public class Foo {
            // comment
            public static void main(String[] args) {
                /* block */
                System.out.println("hi");
                int x = 42;
            }
        }
        "#;
        let tokens = registry.highlight("java", source).unwrap();
        assert!(tokens
            .iter()
            .any(|token| token.kind == HighlightKind::Keyword));
        assert!(tokens
            .iter()
            .any(|token| token.kind == HighlightKind::Comment));
        assert!(tokens
            .iter()
            .any(|token| token.kind == HighlightKind::String));
        assert!(tokens
            .iter()
            .any(|token| token.kind == HighlightKind::Number));
    }

    #[test]
    fn tokens_do_not_overlap() {
        let registry = LanguageRegistry::with_defaults();
        let source = "String s = \"public class inside\"; // class trailing\n";
        let tokens = registry.highlight("java", source).unwrap();
        let mut last_end = 0;
        for token in &tokens {
            assert!(
                token.range.start >= last_end,
                "token at {:?} overlaps previous token",
                token.range
            );
            last_end = token.range.end;
        }
    }

    #[test]
    fn keyword_inside_string_is_not_a_keyword() {
        let registry = LanguageRegistry::with_defaults();
        let source = "String s = \"public\";";
        let tokens = registry.highlight("java", source).unwrap();
        let string_token = tokens
            .iter()
            .find(|token| token.kind == HighlightKind::String)
            .expect("string literal should be tokenised");
        assert!(tokens
            .iter()
            .filter(|token| token.kind == HighlightKind::Keyword)
            .all(|token| token.range.end <= string_token.range.start));
    }

    #[test]
    fn unterminated_block_comment_runs_to_end() {
        let registry = LanguageRegistry::with_defaults();
        let source = "int x = 1; /* open";
        let tokens = registry.highlight("java", source).unwrap();
        let comment = tokens
            .iter()
            .find(|token| token.kind == HighlightKind::Comment)
            .expect("comment token expected");
        assert_eq!(comment.range.end, source.len());
    }

    #[test]
    fn unknown_language_is_an_error() {
        let registry = LanguageRegistry::with_defaults();
        let err = registry.highlight("cobol", "x").unwrap_err();
        assert!(matches!(err, HighlightError::LanguageNotRegistered(_)));
    }

    #[test]
    fn registers_custom_spec() {
        let mut registry = LanguageRegistry::new();
        let spec = LanguageSpec {
            name: "Custom".into(),
            id: "custom".into(),
            extensions: vec!["foo".into()],
            keywords: vec!["alpha".into(), "beta".into()],
            line_comment: Some("#".into()),
            block_comment: None,
            string_delimiters: Vec::new(),
            operators: vec!["+".into()],
            case_sensitive: false,
        };
        registry.register_spec(spec).unwrap();
        let tokens = registry.highlight("custom", "ALPHA + beta #comment").unwrap();
        let keyword_count = tokens
            .iter()
            .filter(|token| token.kind == HighlightKind::Keyword)
            .count();
        assert!(keyword_count >= 2);
        assert!(tokens
            .iter()
            .any(|token| token.kind == HighlightKind::Comment));
    }
}
