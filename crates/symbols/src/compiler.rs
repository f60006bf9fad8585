use crate::error::CompilerError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

/// Source name the unit is submitted under
pub const COMPILER_UNIT_NAME: &str = "Unit.sol";

const STDERR_TAIL_BYTES: usize = 2048;

/// External compiler able to list the top-level declarations of a source text.
#[async_trait]
pub trait CompilerService: Send + Sync {
    async fn declared_symbols(&self, source: &str) -> Result<Vec<String>, CompilerError>;
}

/// `solc --standard-json` driven over stdin/stdout.
pub struct SolcCompiler {
    program: PathBuf,
    timeout: Duration,
    spawn_failure_reported: AtomicBool,
}

impl SolcCompiler {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            spawn_failure_reported: AtomicBool::new(false),
        }
    }

    fn standard_input(source: &str) -> Value {
        json!({
            "language": "Solidity",
            "sources": { COMPILER_UNIT_NAME: { "content": source } },
            "settings": {
                "optimizer": { "enabled": false },
                "outputSelection": { "*": { "*": ["abi"] } }
            }
        })
    }

    async fn invoke(&self, source: &str) -> Result<Vec<u8>, CompilerError> {
        let mut child = tokio::process::Command::new(&self.program)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let input = serde_json::to_vec(&Self::standard_input(source))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&input).await?;
            // Dropping stdin closes the pipe so solc starts compiling
        }

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail_start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
            let tail_start = (tail_start..stderr.len())
                .find(|i| stderr.is_char_boundary(*i))
                .unwrap_or(stderr.len());
            return Err(CompilerError::Rejected {
                code: output.status.code(),
                stderr: stderr[tail_start..].trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    fn report_spawn_failure(&self, err: &CompilerError) {
        if matches!(err, CompilerError::Spawn(_))
            && !self.spawn_failure_reported.swap(true, Ordering::Relaxed)
        {
            log::warn!(
                "Compiler {} unavailable ({err}); naming falls back to declaration matching",
                self.program.display()
            );
        }
    }
}

/// Contract names listed for the submitted unit, in compiler output order.
///
/// An output without a `contracts` section (compile errors) yields an empty list.
pub(crate) fn contract_names(stdout: &[u8]) -> Result<Vec<String>, CompilerError> {
    let output: Value = serde_json::from_slice(stdout)?;
    let names = output
        .get("contracts")
        .and_then(|contracts| contracts.get(COMPILER_UNIT_NAME))
        .and_then(Value::as_object)
        .map(|unit| unit.keys().cloned().collect())
        .unwrap_or_default();
    Ok(names)
}

#[async_trait]
impl CompilerService for SolcCompiler {
    async fn declared_symbols(&self, source: &str) -> Result<Vec<String>, CompilerError> {
        // Dropping the invocation on timeout drops the child, which kills it
        let result = match timeout(self.timeout, self.invoke(source)).await {
            Ok(Ok(stdout)) => contract_names(&stdout),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CompilerError::Timeout(self.timeout)),
        };
        if let Err(err) = &result {
            self.report_spawn_failure(err);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_names_reads_the_unit_section() {
        let stdout = br#"{
            "contracts": {
                "Unit.sol": { "Token": { "abi": [] }, "Ownable": { "abi": [] } },
                "Other.sol": { "Ignored": { "abi": [] } }
            }
        }"#;
        let mut names = contract_names(stdout).unwrap();
        names.sort();
        assert_eq!(names, vec!["Ownable".to_string(), "Token".to_string()]);
    }

    #[test]
    fn compile_errors_yield_no_names() {
        let stdout = br#"{"errors":[{"severity":"error","message":"ParserError"}]}"#;
        assert!(contract_names(stdout).unwrap().is_empty());
    }

    #[test]
    fn garbage_output_is_malformed() {
        let err = contract_names(b"Segmentation fault").unwrap_err();
        assert!(matches!(err, CompilerError::MalformedOutput(_)));
        assert!(err.is_infrastructure());
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let compiler = SolcCompiler::new(
            "/nonexistent/specgen-test-solc",
            Duration::from_secs(5),
        );
        let err = compiler
            .declared_symbols("contract A {}")
            .await
            .unwrap_err();
        assert!(matches!(err, CompilerError::Spawn(_)));
    }
}
