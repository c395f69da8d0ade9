//! `.docx` -> PDF conversion through a headless LibreOffice process.

use crate::core::ConfigProvider;
use crate::domain::ports::DocumentConverter;
use crate::utils::error::{BotError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;

pub struct LibreOfficeConverter {
    program: String,
    timeout: Duration,
    permits: Arc<Semaphore>,
    scratch_dir: Option<PathBuf>,
}

impl LibreOfficeConverter {
    pub fn new(program: impl Into<String>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            program: program.into(),
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            scratch_dir: None,
        }
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        let converter = Self::new(
            config.converter_program(),
            config.conversion_timeout(),
            config.max_concurrent_conversions(),
        );
        match config.scratch_dir() {
            Some(dir) => converter.with_scratch_dir(dir),
            None => converter,
        }
    }

    /// Creates work directories under `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Runs `<program> --version`, returning the first line of its output.
    pub async fn check_version(&self) -> Result<String> {
        let output = self.run(&["--version".to_string()], None).await?;
        if !output.status.success() {
            return Err(BotError::ConversionError {
                message: format!("'{} --version' exited with {}", self.program, output.status),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    async fn run(&self, args: &[String], cwd: Option<&Path>) -> Result<Output> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout can take down forked helpers too.
        #[cfg(unix)]
        command.process_group(0);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BotError::ConverterNotFound {
                    program: self.program.clone(),
                }
            } else {
                BotError::IoError(e)
            }
        })?;

        let pid = child.id();
        // Dropping the future on timeout drops the child, which kills it.
        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => Ok(output?),
            Err(_) => {
                kill_process_group(pid);
                Err(BotError::ConversionTimeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pid, "could not kill converter process group: {}", e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert(&self, docx: Vec<u8>, stem: &str) -> Result<Vec<u8>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BotError::ConversionError {
                message: "converter is shutting down".to_string(),
            })?;

        // Removed on drop, whatever happens below.
        let mut builder = tempfile::Builder::new();
        builder.prefix("fuel-report-");
        let workdir = match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir)?,
            None => builder.tempdir()?,
        };
        let docx_path = workdir.path().join(format!("{}.docx", stem));
        let pdf_path = workdir.path().join(format!("{}.pdf", stem));
        let profile_dir = workdir.path().join("profile");
        tokio::fs::write(&docx_path, &docx).await?;

        let args = vec![
            // A private profile lets several conversions run side by side.
            format!("-env:UserInstallation=file://{}", profile_dir.display()),
            "--headless".to_string(),
            "--convert-to".to_string(),
            "pdf".to_string(),
            "--outdir".to_string(),
            workdir.path().display().to_string(),
            docx_path.display().to_string(),
        ];

        tracing::debug!(program = %self.program, stem, "starting conversion");
        let started = std::time::Instant::now();
        let output = self.run(&args, Some(workdir.path())).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::info!(stdout = %stdout.trim(), "LibreOffice stdout");
        if !stderr.trim().is_empty() {
            tracing::info!(stderr = %stderr.trim(), "LibreOffice stderr");
        }

        if !output.status.success() || !pdf_path.exists() {
            let message = format!(
                "LibreOffice exited with {} and {} a PDF",
                output.status,
                if pdf_path.exists() { "produced" } else { "did not produce" }
            );
            tracing::error!("{}", message);
            return Err(BotError::ConversionError { message });
        }

        let pdf = tokio::fs::read(&pdf_path).await?;
        tracing::info!(
            bytes = pdf.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "document converted"
        );
        Ok(pdf)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Writes an executable shell script standing in for `libreoffice`.
    fn fake_program(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-office");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_missing_program() {
        let converter =
            LibreOfficeConverter::new("/nonexistent/libreoffice", Duration::from_secs(5), 1);
        let err = converter.convert(b"docx".to_vec(), "report").await.unwrap_err();
        assert!(matches!(err, BotError::ConverterNotFound { .. }));
    }

    #[tokio::test]
    async fn test_successful_conversion_reads_pdf() {
        let dir = tempfile::tempdir().unwrap();
        // The last two arguments are "--outdir <dir> <file>"; copy input to <stem>.pdf.
        let program = fake_program(
            dir.path(),
            r#"for last; do :; done
out=$(dirname "$last")/$(basename "$last" .docx).pdf
cp "$last" "$out"
echo "convert $last -> $out""#,
        );
        let converter = LibreOfficeConverter::new(program, Duration::from_secs(10), 2);
        let pdf = converter
            .convert(b"%PDF-fake".to_vec(), "report")
            .await
            .unwrap();
        assert_eq!(pdf, b"%PDF-fake");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_conversion_error() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(dir.path(), "echo broken >&2\nexit 3");
        let converter = LibreOfficeConverter::new(program, Duration::from_secs(10), 1);
        let err = converter.convert(b"docx".to_vec(), "report").await.unwrap_err();
        assert!(matches!(err, BotError::ConversionError { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(dir.path(), "sleep 5");
        let converter = LibreOfficeConverter::new(program, Duration::from_millis(200), 1);
        let err = converter.convert(b"docx".to_vec(), "report").await.unwrap_err();
        assert!(matches!(err, BotError::ConversionTimeout { timeout_ms: 200 }));
        assert!(err.to_string().contains("200 ms"));
    }

    #[tokio::test]
    async fn test_timeout_kills_forked_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("helper-survived");
        // The launcher forks a helper and waits, as soffice does with soffice.bin.
        let program = fake_program(
            dir.path(),
            &format!("(sleep 1; touch '{}') &\nsleep 5", marker.display()),
        );
        let converter = LibreOfficeConverter::new(program, Duration::from_millis(200), 1);
        let err = converter.convert(b"docx".to_vec(), "report").await.unwrap_err();
        assert!(matches!(err, BotError::ConversionTimeout { .. }));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists(), "forked helper outlived the timeout");
    }

    #[tokio::test]
    async fn test_work_directory_removed_after_conversion() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let copy = fake_program(
            tools.path(),
            r#"for last; do :; done
cp "$last" "$(dirname "$last")/$(basename "$last" .docx).pdf""#,
        );
        let converter = LibreOfficeConverter::new(copy, Duration::from_secs(10), 1)
            .with_scratch_dir(scratch.path());
        converter.convert(b"%PDF".to_vec(), "report").await.unwrap();
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

        let broken = tempfile::tempdir().unwrap();
        let failing = fake_program(broken.path(), "exit 1");
        let converter = LibreOfficeConverter::new(failing, Duration::from_secs(10), 1)
            .with_scratch_dir(scratch.path());
        assert!(converter.convert(b"docx".to_vec(), "report").await.is_err());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_check_version_reports_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_program(dir.path(), "echo 'LibreOffice 7.4.7.2'\necho extra");
        let converter = LibreOfficeConverter::new(program, Duration::from_secs(5), 1);
        assert_eq!(converter.check_version().await.unwrap(), "LibreOffice 7.4.7.2");
    }
}
