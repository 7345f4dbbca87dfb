use std::io::ErrorKind;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::domain::Error;

/// A user-configured program that takes its input on stdin and answers on
/// stdout. Backs both the image extractor and the analyzer.
#[derive(Debug, Clone)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Splits a configured command line on whitespace. `None` when blank.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    /// Feeds `input` to the command and returns its stdout. A non-zero exit
    /// becomes the error built by `fail`, carrying the command's stderr.
    pub async fn pipe(&self, input: &[u8], fail: fn(String) -> Error) -> Result<String, Error> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // stdin is written while the output is drained, so a command that
        // answers before reading everything can't fill its pipes and stall
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(input).await {
                // the command may exit without reading its input; its status decides
                Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;

        debug!(program = %self.program, status = %output.status, "command finished");
        if !output.status.success() {
            return Err(fail(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> ExternalCommand {
        ExternalCommand::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn blank_command_line_is_none() {
        assert!(ExternalCommand::from_command_line("  ").is_none());
        let cmd = ExternalCommand::from_command_line("vision --json -q").unwrap();
        assert_eq!(cmd.program, "vision");
        assert_eq!(cmd.args, ["--json", "-q"]);
    }

    #[tokio::test]
    async fn input_reaches_the_command() {
        let out = sh("tr a-z A-Z").pipe(b"ana", Error::Extraction).await.unwrap();
        assert_eq!(out, "ANA");
    }

    #[tokio::test]
    async fn chatty_command_with_large_input_completes() {
        // more than a pipe buffer on stdout and stderr before stdin is read
        let cmd = sh("head -c 200000 /dev/zero | tr '\\0' ' '; \
                      head -c 200000 /dev/zero >&2; \
                      cat | wc -c");
        let input = vec![b'x'; 1 << 20];

        let out = tokio::time::timeout(Duration::from_secs(30), cmd.pipe(&input, Error::Extraction))
            .await
            .expect("command stalled")
            .unwrap();
        assert!(out.len() > 200_000);
        assert_eq!(out.trim(), "1048576");
    }

    #[tokio::test]
    async fn failure_carries_stderr() {
        let err = sh("echo broken >&2; exit 3")
            .pipe(b"", Error::Extraction)
            .await
            .unwrap_err();
        let Error::Extraction(message) = err else {
            panic!("unexpected error kind");
        };
        assert!(message.contains("broken"));
    }
}
