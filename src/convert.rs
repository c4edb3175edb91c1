//! Boundary to the external document converter.
//!
//! The exam pipeline only understands markup. Word documents go through an
//! external program (by default `mammoth`, which prints HTML on stdout);
//! files that are already HTML are read as-is. A converter failure is always
//! an error, while a document that converts to nothing is `Ok("")`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("converter `{program}` could not be started: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("converter `{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("converter output for {} is not valid UTF-8", path.display())]
    Encoding { path: PathBuf },
}

pub trait Converter {
    /// Turns the document at `path` into markup.
    fn convert(&self, path: &Path) -> Result<String, ConvertError>;
}

/// Reads files that are already markup.
pub struct MarkupPassthrough;

impl Converter for MarkupPassthrough {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        fs::read_to_string(path).map_err(|source| ConvertError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Runs `program [args...] <path>` and takes its stdout as markup.
#[derive(Clone, Debug)]
pub struct CommandConverter {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Converter for CommandConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        debug!(program = %self.program, path = %path.display(), "running converter");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|source| ConvertError::Unavailable {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ConvertError::Encoding {
            path: path.to_path_buf(),
        })
    }
}

/// Picks passthrough for markup files and the external command for the rest.
#[derive(Clone, Debug)]
pub struct AutoConverter {
    pub command: CommandConverter,
}

impl AutoConverter {
    pub fn new(command: CommandConverter) -> Self {
        Self { command }
    }
}

impl Converter for AutoConverter {
    fn convert(&self, path: &Path) -> Result<String, ConvertError> {
        if is_markup_file(path) {
            MarkupPassthrough.convert(path)
        } else {
            self.command.convert(path)
        }
    }
}

pub fn is_markup_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKUP_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_markup_extension_detection() {
        assert!(is_markup_file(Path::new("reading.html")));
        assert!(is_markup_file(Path::new("READING.HTM")));
        assert!(!is_markup_file(Path::new("reading.docx")));
        assert!(!is_markup_file(Path::new("reading")));
    }

    #[test]
    fn test_passthrough_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.html");
        fs::write(&path, "<p>hello</p>").unwrap();
        assert_eq!(MarkupPassthrough.convert(&path).unwrap(), "<p>hello</p>");
    }

    #[test]
    fn test_passthrough_empty_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.html");
        fs::write(&path, "").unwrap();
        assert_eq!(MarkupPassthrough.convert(&path).unwrap(), "");
    }

    #[test]
    fn test_passthrough_missing_file() {
        let err = MarkupPassthrough
            .convert(Path::new("/definitely/not/here.html"))
            .unwrap_err();
        assert!(matches!(err, ConvertError::Read { .. }));
    }

    #[test]
    fn test_missing_converter_program() {
        let converter = CommandConverter::new("readex-no-such-converter-binary", Vec::new());
        let err = converter.convert(Path::new("exam.docx")).unwrap_err();
        assert!(matches!(err, ConvertError::Unavailable { .. }));
        assert!(err.to_string().contains("readex-no-such-converter-binary"));
    }

    #[test]
    fn test_auto_converter_routes_html_to_passthrough() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.htm");
        fs::write(&path, "<p>x</p>").unwrap();
        let auto = AutoConverter::new(CommandConverter::new(
            "readex-no-such-converter-binary",
            Vec::new(),
        ));
        assert_eq!(auto.convert(&path).unwrap(), "<p>x</p>");
    }
}
