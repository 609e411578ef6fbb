use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

static STAGE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A uniquely named directory under the platform temp root that holds one
/// compile-and-run cycle: the generated `.java` file and the class files
/// `javac` emits next to it.
/// （平台暫存目錄下唯一命名的資料夾，存放單次編譯執行所需的 `.java` 檔與
/// `javac` 產出的 class 檔。）
///
/// Cleanup is explicit via [`StageDir::cleanup`]; `Drop` removes the
/// directory as a fallback so early returns on error paths do not leak it.
#[derive(Debug)]
pub struct StageDir {
    path: PathBuf,
    cleaned: bool,
}

impl StageDir {
    /// Creates `javapad_<millis>_<seq>` under the temp root. The sequence
    /// counter keeps two stages in the same millisecond apart.
    pub fn create() -> io::Result<Self> {
        let stamp = Utc::now().timestamp_millis();
        let sequence = STAGE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("javapad_{stamp}_{sequence}"));
        fs::create_dir_all(&path)?;
        log::debug!("staged compile directory at {}", path.display());
        Ok(Self {
            path,
            cleaned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the source as `<ClassName>.java` inside the stage directory and
    /// returns the file path.
    pub fn write_source(&self, class_name: &str, source: &str) -> io::Result<PathBuf> {
        let file_path = self.path.join(format!("{class_name}.java"));
        fs::write(&file_path, source)?;
        Ok(file_path)
    }

    /// Recursively removes the stage directory. Removal failures are logged
    /// rather than surfaced; a stale temp directory must not mask the run's
    /// actual outcome.
    pub fn cleanup(mut self) {
        self.remove_now();
    }

    fn remove_now(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        if let Err(err) = fs::remove_dir_all(&self.path) {
            log::warn!("failed to remove stage {}: {err}", self.path.display());
        }
    }
}

impl Drop for StageDir {
    fn drop(&mut self) {
        self.remove_now();
    }
}
