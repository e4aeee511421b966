//! Process execution for render invocations.

use std::io;
use std::process::{Command, Stdio};

use crate::command::RenderInvocation;
use crate::error::RenderError;

/// Runs a [`RenderInvocation`] to completion.
///
/// Implementations block until the process exits. The watcher calls them
/// from a blocking task, one invocation at a time.
pub trait RenderRunner: Send + Sync + 'static {
    /// Runs the invocation and returns its exit code.
    ///
    /// `Ok(None)` means the process ended without an exit code (killed by a
    /// signal). `Err` means the process could not be started.
    fn run(&self, invocation: &RenderInvocation) -> io::Result<Option<i32>>;
}

/// Launches the renderer as a child process.
///
/// The child inherits stdout and stderr so renderer diagnostics reach the
/// operator; stdin is closed. No timeout is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl RenderRunner for ProcessRunner {
    fn run(&self, invocation: &RenderInvocation) -> io::Result<Option<i32>> {
        let status = Command::new(invocation.executable.as_std_path())
            .args(&invocation.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(status.code())
    }
}

/// Classifies a runner outcome.
pub fn classify(outcome: io::Result<Option<i32>>) -> Result<(), RenderError> {
    match outcome {
        Ok(Some(0)) => Ok(()),
        Ok(Some(code)) => Err(RenderError::ExitCode { code }),
        Ok(None) => Err(RenderError::Signal),
        Err(e) => Err(RenderError::Launch(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use smallvec::SmallVec;

    fn invocation(executable: &str, arguments: &[&str]) -> RenderInvocation {
        RenderInvocation {
            executable: Utf8PathBuf::from(executable),
            arguments: arguments.iter().map(|s| (*s).to_owned()).collect::<SmallVec<_>>(),
            source_file: Utf8PathBuf::from("d.pu"),
        }
    }

    #[test]
    fn test_classify() {
        assert!(classify(Ok(Some(0))).is_ok());
        assert_eq!(classify(Ok(Some(3))).unwrap_err().exit_code(), Some(3));
        assert!(matches!(classify(Ok(None)), Err(RenderError::Signal)));
        assert!(
            classify(Err(io::Error::new(io::ErrorKind::NotFound, "missing")))
                .unwrap_err()
                .is_launch()
        );
    }

    #[test]
    fn test_missing_executable_is_launch_error() {
        let outcome = ProcessRunner.run(&invocation("/nonexistent/bin/java", &["-version"]));
        assert!(outcome.is_err());
        assert!(classify(outcome).unwrap_err().is_launch());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_codes_are_reported() {
        let ok = ProcessRunner.run(&invocation("/bin/sh", &["-c", "exit 0"]));
        assert_eq!(ok.unwrap(), Some(0));

        let failed = ProcessRunner.run(&invocation("/bin/sh", &["-c", "exit 7"]));
        assert_eq!(failed.unwrap(), Some(7));
    }
}
