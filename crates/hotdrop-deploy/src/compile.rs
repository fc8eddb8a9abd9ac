//! Style sheet compilation.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::CompileError;

/// Compiles a style source (e.g. SCSS) into CSS.
pub trait StyleCompiler: Send + Sync {
    /// Compile `source`, read from `origin`. `origin` resolves relative imports.
    fn compile(&self, source: &str, origin: &Path) -> Result<String, CompileError>;
}

/// [`StyleCompiler`] running an external command.
///
/// The source is piped on stdin and the CSS read from stdout, with the
/// source's directory as load path (`sass --stdin --load-path <dir>`).
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl StyleCompiler for CommandCompiler {
    fn compile(&self, source: &str, origin: &Path) -> Result<String, CompileError> {
        let load_path = origin.parent().unwrap_or(Path::new("."));
        let spawn_error = |source| CompileError::Spawn {
            command: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .arg("--stdin")
            .arg("--load-path")
            .arg(load_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes()).map_err(spawn_error)?;
        }
        let output = child.wait_with_output().map_err(spawn_error)?;

        if !output.status.success() {
            return Err(CompileError::Failed {
                command: self.program.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        String::from_utf8(output.stdout).map_err(|_| CompileError::Output {
            command: self.program.clone(),
        })
    }
}
