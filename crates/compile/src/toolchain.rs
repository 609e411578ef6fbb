use std::env;
use std::path::{Path, PathBuf};

use crate::CompileError;

/// Resolved locations of the `javac` and `java` binaries.
/// （`javac` 與 `java` 執行檔解析後的位置。）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    javac: PathBuf,
    java: PathBuf,
}

impl Toolchain {
    /// Locates a JDK: `$JAVA_HOME/bin` wins when both tools exist there,
    /// otherwise the `PATH` is searched.
    pub fn locate() -> Result<Self, CompileError> {
        if let Some(home) = env::var_os("JAVA_HOME").map(PathBuf::from) {
            let javac = home.join("bin").join(tool_file_name("javac"));
            let java = home.join("bin").join(tool_file_name("java"));
            if javac.is_file() && java.is_file() {
                log::info!("using JDK from JAVA_HOME at {}", home.display());
                return Ok(Self { javac, java });
            }
            log::warn!(
                "JAVA_HOME is set but {} is missing, falling back to PATH",
                javac.display()
            );
        }

        let javac = which::which("javac")
            .map_err(|err| CompileError::JdkNotFound(format!("javac: {err}")))?;
        let java =
            which::which("java").map_err(|err| CompileError::JdkNotFound(format!("java: {err}")))?;
        log::info!("using javac at {}", javac.display());
        Ok(Self { javac, java })
    }

    pub fn javac(&self) -> &Path {
        &self.javac
    }

    pub fn java(&self) -> &Path {
        &self.java
    }
}

fn tool_file_name(tool: &str) -> String {
    format!("{tool}{}", env::consts::EXE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_file_name_appends_platform_suffix() {
        let name = tool_file_name("javac");
        if cfg!(windows) {
            assert_eq!(name, "javac.exe");
        } else {
            assert_eq!(name, "javac");
        }
    }
}
