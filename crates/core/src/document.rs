use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use encoding_rs::{Encoding as RsEncoding, BIG5, GBK, SHIFT_JIS, WINDOWS_1252};
use thiserror::Error;

/// 表示文件目前使用的行尾樣式。 / Represents the current line ending style for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
    Cr,
}

impl LineEnding {
    /// 回傳序列化文字時使用的行尾字串。 / Returns the literal string representation used when serialising text.
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }
}

/// 列舉文件支援的文字編碼。 / Supported encodings for source documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Legacy(LegacyEncoding),
}

/// 指定支援的傳統多位元編碼。 / Enumerates supported legacy multi-byte encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyEncoding {
    Windows1252,
    ShiftJis,
    Gbk,
    Big5,
}

impl LegacyEncoding {
    pub fn name(self) -> &'static str {
        match self {
            LegacyEncoding::Windows1252 => "windows-1252",
            LegacyEncoding::ShiftJis => "shift-jis",
            LegacyEncoding::Gbk => "gbk",
            LegacyEncoding::Big5 => "big5",
        }
    }

    fn to_rs(self) -> &'static RsEncoding {
        match self {
            LegacyEncoding::Windows1252 => WINDOWS_1252,
            LegacyEncoding::ShiftJis => SHIFT_JIS,
            LegacyEncoding::Gbk => GBK,
            LegacyEncoding::Big5 => BIG5,
        }
    }
}

impl SourceEncoding {
    pub fn name(self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Legacy(legacy) => legacy.name(),
        }
    }
}

/// 文件載入或儲存時可能發生的錯誤。 / Errors that can occur while loading or saving a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("file encoding is not supported or data is invalid")]
    InvalidEncoding,
    #[error("text cannot be represented in target encoding {0}")]
    Unrepresentable(&'static str),
}

/// 代表編輯器緩衝區的記憶體模型，可選擇性繫結到磁碟上的 `.java` 檔案。
/// / In-memory model of the editor buffer, optionally bound to a `.java` file on disk.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    path: Option<PathBuf>,
    contents: String,
    line_ending: LineEnding,
    encoding: SourceEncoding,
    has_bom: bool,
    is_dirty: bool,
}

impl Default for SourceDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceDocument {
    /// 建立一個空內容且尚未儲存的文件。 / Creates an unsaved document with empty contents.
    pub fn new() -> Self {
        Self {
            path: None,
            contents: String::new(),
            line_ending: LineEnding::Lf,
            encoding: SourceEncoding::Utf8,
            has_bom: false,
            is_dirty: false,
        }
    }

    /// 建立含初始內容、尚未繫結路徑的文件。 / Creates an unbound document seeded with the given contents.
    pub fn with_contents(text: impl Into<String>) -> Self {
        let mut document = Self::new();
        document.contents = normalize_newlines(&text.into());
        document
    }

    /// 從磁碟載入文件並將行尾內部正規化為 `\n`。 / Loads a document from disk, normalising newlines to `\n` internally.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path_ref = path.as_ref();
        let mut file = File::open(path_ref)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let decoded = decode_bytes(bytes)?;
        let line_ending = detect_line_ending(&decoded.text);
        let contents = normalize_newlines(&decoded.text);

        Ok(Self {
            path: Some(path_ref.to_path_buf()),
            contents,
            line_ending,
            encoding: decoded.encoding,
            has_bom: decoded.has_bom,
            is_dirty: false,
        })
    }

    /// 將文件儲存至現有路徑；若尚未指定路徑則失敗。 / Saves the document to its current path; fails if no path is set.
    pub fn save(&mut self) -> Result<(), DocumentError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::Other, "document has no associated path")
            })?
            .to_path_buf();
        self.save_as(path)
    }

    /// 將文件另存為新路徑並繫結該路徑。 / Saves the document to a new path, binding the document to it.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path_ref = path.as_ref();
        let encoded = self.serialise_contents()?;

        // 先寫入暫存檔再重新命名，避免出現部分寫入的情況。 / Use a temporary file plus rename to guard against partial writes.
        let tmp_path = path_ref.with_extension("tmp_javapad");
        {
            let mut tmp_file = File::create(&tmp_path)?;
            tmp_file.write_all(&encoded)?;
            tmp_file.sync_all()?; // 確保資料在重新命名前已寫入磁碟。 / Ensure bytes hit the disk before rename.
        }
        fs::rename(&tmp_path, path_ref)?;

        self.path = Some(path_ref.to_path_buf());
        self.is_dirty = false;
        Ok(())
    }

    /// 取得目前文件內容（行尾已正規化為 `\n`）。 / Returns the current document contents, normalised to `\n` line endings.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// 以新文字取代記憶體內容並標記文件為已修改。 / Replaces the in-memory contents, marking the document as dirty.
    pub fn set_contents(&mut self, text: impl Into<String>) {
        let text = normalize_newlines(&text.into());
        if self.contents != text {
            self.contents = text;
            self.is_dirty = true;
        }
    }

    /// 取得目前行尾設定。 / Returns the current line ending preference.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// 取得目前文件編碼。 / Returns the current document encoding.
    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    /// 更新文件編碼設定。 / Updates the document encoding preference.
    pub fn set_encoding(&mut self, encoding: SourceEncoding) {
        if self.encoding != encoding {
            self.encoding = encoding;
            if matches!(self.encoding, SourceEncoding::Legacy(_)) {
                self.has_bom = false;
            }
            self.is_dirty = true;
        }
    }

    /// 指出儲存時是否包含 UTF-8 BOM。 / Indicates whether the document includes a UTF-8 BOM when saved.
    pub fn has_bom(&self) -> bool {
        self.has_bom
    }

    /// 判斷文件是否仍有未儲存變更。 / Returns whether the document has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// 取得文件所屬的檔案路徑（若存在）。 / Retrieves the associated path if the document is linked to one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 取得檔案名稱，供狀態列顯示。 / Returns the file name for status line display.
    pub fn file_name(&self) -> Option<&str> {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
    }

    fn serialise_contents(&self) -> Result<Vec<u8>, DocumentError> {
        let text = self.contents.replace('\n', self.line_ending.as_str());
        let bytes = match self.encoding {
            SourceEncoding::Utf8 => {
                if self.has_bom {
                    // 在輸出資料前加上 UTF-8 BOM。 / Prepend UTF-8 BOM bytes to the encoded payload.
                    let mut prefixed = Vec::with_capacity(3 + text.len());
                    prefixed.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
                    prefixed.extend_from_slice(text.as_bytes());
                    prefixed
                } else {
                    text.into_bytes()
                }
            }
            SourceEncoding::Legacy(legacy) => encode_legacy(&text, legacy)?,
        };
        Ok(bytes)
    }
}

/// 若路徑缺少 `.java` 副檔名則補上。 / Appends a `.java` extension when the path lacks one.
pub fn ensure_java_extension(path: PathBuf) -> PathBuf {
    let has_extension = path
        .extension()
        .map(|extension| extension.eq_ignore_ascii_case("java"))
        .unwrap_or(false);
    if has_extension {
        path
    } else {
        let mut name = path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".java");
        path.with_file_name(name)
    }
}

struct DecodedText {
    text: String,
    encoding: SourceEncoding,
    has_bom: bool,
}

fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedText, DocumentError> {
    if bytes.starts_with(b"\xEF\xBB\xBF") {
        let text =
            String::from_utf8(bytes[3..].to_vec()).map_err(|_| DocumentError::InvalidEncoding)?;
        return Ok(DecodedText {
            text,
            encoding: SourceEncoding::Utf8,
            has_bom: true,
        });
    }

    if let Ok(text) = std::str::from_utf8(&bytes) {
        return Ok(DecodedText {
            text: text.to_owned(),
            encoding: SourceEncoding::Utf8,
            has_bom: false,
        });
    }

    if let Some(legacy) = detect_legacy_encoding(&bytes) {
        let text = decode_legacy(&bytes, legacy)?;
        return Ok(DecodedText {
            text,
            encoding: SourceEncoding::Legacy(legacy),
            has_bom: false,
        });
    }

    Err(DocumentError::InvalidEncoding)
}

fn encode_legacy(text: &str, legacy: LegacyEncoding) -> Result<Vec<u8>, DocumentError> {
    let encoder = legacy.to_rs();
    let (cow, _, had_errors) = encoder.encode(text);
    if had_errors {
        return Err(DocumentError::Unrepresentable(legacy.name()));
    }
    Ok(match cow {
        Cow::Borrowed(slice) => slice.to_vec(),
        Cow::Owned(vec) => vec,
    })
}

fn decode_legacy(bytes: &[u8], legacy: LegacyEncoding) -> Result<String, DocumentError> {
    let decoder = legacy.to_rs();
    let (cow, had_errors) = decoder.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(DocumentError::InvalidEncoding);
    }
    Ok(match cow {
        Cow::Borrowed(slice) => slice.to_owned(),
        Cow::Owned(string) => string,
    })
}

fn detect_legacy_encoding(bytes: &[u8]) -> Option<LegacyEncoding> {
    if bytes.is_empty() {
        return None;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);
    map_rs_encoding(guess)
}

fn map_rs_encoding(encoding: &'static RsEncoding) -> Option<LegacyEncoding> {
    if encoding == WINDOWS_1252 {
        Some(LegacyEncoding::Windows1252)
    } else if encoding == SHIFT_JIS {
        Some(LegacyEncoding::ShiftJis)
    } else if encoding == GBK {
        Some(LegacyEncoding::Gbk)
    } else if encoding == BIG5 {
        Some(LegacyEncoding::Big5)
    } else {
        None
    }
}

/// 掃描原始文字找到第一個換行記號以推斷行尾偏好。 / Scans the raw text for the first newline sentinel to infer the preferred line ending.
fn detect_line_ending(text: &str) -> LineEnding {
    let bytes = text.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\r' => {
                if idx + 1 < bytes.len() && bytes[idx + 1] == b'\n' {
                    return LineEnding::CrLf;
                }
                return LineEnding::Cr;
            }
            b'\n' => return LineEnding::Lf,
            _ => {
                idx += 1;
                continue;
            }
        }
    }
    LineEnding::Lf
}

fn normalize_newlines(input: &str) -> String {
    // 將 CRLF 與 CR 轉成 LF，簡化記憶體儲存。 / Convert CRLF and CR sequences to LF for internal storage simplicity.
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                result.push('\n');
            }
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::GBK;
    use std::fs;

    fn write_bytes(path: &Path, bytes: &[u8]) {
        fs::write(path, bytes).expect("failed to seed test file");
    }

    #[test]
    fn save_then_open_reproduces_identical_contents() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("Foo.java");

        let source = "public class Foo {\n    public static void main(String[] a) {\n        System.out.println(\"hi\");\n    }\n}\n";
        let mut doc = SourceDocument::with_contents(source);
        doc.save_as(&file_path).unwrap();

        let reloaded = SourceDocument::open(&file_path).unwrap();
        assert_eq!(reloaded.contents(), source);
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn open_detects_line_endings_and_normalises_content() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("Sample.java");
        write_bytes(&file_path, b"class A {}\r\nclass B {}\r\n");

        let doc = SourceDocument::open(&file_path).unwrap();
        assert_eq!(doc.contents(), "class A {}\nclass B {}\n");
        assert_eq!(doc.line_ending(), LineEnding::CrLf);
        assert_eq!(doc.encoding(), SourceEncoding::Utf8);
        assert!(!doc.has_bom());
        assert!(!doc.is_dirty());
    }

    #[test]
    fn open_handles_utf8_bom() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("Bom.java");
        write_bytes(&file_path, b"\xEF\xBB\xBFclass Bom {}\n");

        let doc = SourceDocument::open(&file_path).unwrap();
        assert_eq!(doc.contents(), "class Bom {}\n");
        assert!(doc.has_bom());
    }

    #[test]
    fn save_preserves_crlf_and_bom() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("Preserve.java");
        write_bytes(&file_path, b"\xEF\xBB\xBFclass P {}\r\n");

        let mut doc = SourceDocument::open(&file_path).unwrap();
        doc.set_contents("class Q {}\n");
        doc.save().unwrap();

        let bytes = fs::read(&file_path).unwrap();
        assert_eq!(&bytes[..3], b"\xEF\xBB\xBF");
        assert_eq!(&bytes[3..], b"class Q {}\r\n");
        assert!(!doc.is_dirty());
    }

    #[test]
    fn open_detects_gbk_legacy() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("Legacy.java");
        let (encoded, _, _) = GBK.encode("中文測試");
        write_bytes(&file_path, encoded.as_ref());

        let doc = SourceDocument::open(&file_path).unwrap();
        assert_eq!(doc.contents(), "中文測試");
        assert!(matches!(
            doc.encoding(),
            SourceEncoding::Legacy(LegacyEncoding::Gbk)
        ));
    }

    #[test]
    fn save_rejects_unrepresentable_characters() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("Latin.java");

        let mut doc = SourceDocument::with_contents("// 漢\nclass X {}\n");
        doc.set_encoding(SourceEncoding::Legacy(LegacyEncoding::Windows1252));
        let err = doc.save_as(&file_path).unwrap_err();
        assert!(matches!(err, DocumentError::Unrepresentable("windows-1252")));
    }

    #[test]
    fn save_without_path_is_an_error() {
        let mut doc = SourceDocument::with_contents("class X {}\n");
        let err = doc.save().unwrap_err();
        assert!(matches!(err, DocumentError::Io(_)));
    }

    #[test]
    fn save_as_binds_path_and_clears_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("Bind.java");

        let mut doc = SourceDocument::new();
        doc.set_contents("class Bind {}\n");
        assert!(doc.is_dirty());
        doc.save_as(&file_path).unwrap();
        assert_eq!(doc.path(), Some(file_path.as_path()));
        assert_eq!(doc.file_name(), Some("Bind.java"));
        assert!(!doc.is_dirty());
    }

    #[test]
    fn ensure_java_extension_appends_when_missing() {
        assert_eq!(
            ensure_java_extension(PathBuf::from("/tmp/Foo")),
            PathBuf::from("/tmp/Foo.java")
        );
        assert_eq!(
            ensure_java_extension(PathBuf::from("/tmp/Foo.java")),
            PathBuf::from("/tmp/Foo.java")
        );
        assert_eq!(
            ensure_java_extension(PathBuf::from("/tmp/Foo.txt")),
            PathBuf::from("/tmp/Foo.txt.java")
        );
    }
}
