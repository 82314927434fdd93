//! External-process provider
//!
//! Delegates every call to an external program, for vendors whose only
//! integration is a script or SDK in another runtime. Each call runs
//! `<program> <args..> <verb>` with a JSON request on stdin and expects one
//! JSON envelope on stdout:
//!
//! ```text
//! {"ok": true,  "result": <verb-specific>}
//! {"ok": false, "error": "message"}
//! ```
//!
//! | verb       | request                                            | result                      |
//! |------------|----------------------------------------------------|-----------------------------|
//! | `backends` | `{}`                                               | `[BackendDescriptor, ..]`   |
//! | `submit`   | `{backend, shots, qasm, num_qubits, num_clbits}`   | `{"job_id": ".."}`          |
//! | `job`      | `{job_id}`                                         | `ProviderJob`               |
//! | `cancel`   | `{job_id}`                                         | anything                    |

use crate::{BackendDescriptor, BackendError, ProviderJob, QuantumProvider, Result};
use qproof_core::Circuit;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// Provider backed by an external program
#[derive(Debug, Clone)]
pub struct ProcessProvider {
    name: String,
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessProvider {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the verb
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn call<T: DeserializeOwned>(&self, verb: &str, request: &Value) -> Result<T> {
        let payload = serde_json::to_vec(request)?;
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(verb)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                BackendError::CommunicationError(format!(
                    "Failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(err) = stdin.write_all(&payload) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(BackendError::CommunicationError(format!(
                    "{} {}: request not delivered: {}",
                    self.name, verb, err
                )));
            }
        }
        let output = child.wait_with_output()?;
        debug!(provider = %self.name, verb, status = ?output.status.code(), "provider process finished");

        if !output.status.success() {
            return Err(BackendError::CommunicationError(format!(
                "{} {} exited with {}: {}",
                self.program.display(),
                verb,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let envelope: Envelope = serde_json::from_slice(&output.stdout).map_err(|e| {
            BackendError::ProtocolError(format!("{} {}: bad envelope: {}", self.name, verb, e))
        })?;
        if !envelope.ok {
            let message = envelope
                .error
                .unwrap_or_else(|| "unspecified provider error".to_string());
            return Err(match verb {
                "submit" => BackendError::JobSubmissionFailed(message),
                _ => BackendError::CommunicationError(message),
            });
        }
        serde_json::from_value(envelope.result.unwrap_or(Value::Null)).map_err(|e| {
            BackendError::ProtocolError(format!("{} {}: bad result: {}", self.name, verb, e))
        })
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    backend: &'a str,
    shots: u64,
    qasm: String,
    num_qubits: usize,
    num_clbits: usize,
}

#[derive(Debug, Deserialize)]
struct Submitted {
    job_id: String,
}

impl QuantumProvider for ProcessProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_backends(&self) -> Result<Vec<BackendDescriptor>> {
        self.call("backends", &json!({}))
    }

    fn submit_job(&self, circuit: &Circuit, backend: &str, shots: u64) -> Result<String> {
        let request = SubmitRequest {
            backend,
            shots,
            qasm: circuit.to_qasm(),
            num_qubits: circuit.num_qubits(),
            num_clbits: circuit.num_clbits(),
        };
        let submitted: Submitted = self.call("submit", &serde_json::to_value(&request)?)?;
        Ok(submitted.job_id)
    }

    fn job(&self, job_id: &str) -> Result<ProviderJob> {
        self.call("job", &json!({ "job_id": job_id }))
    }

    fn cancel_job(&self, job_id: &str) -> Result<()> {
        let _: Value = self.call("cancel", &json!({ "job_id": job_id }))?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::JobStatus;
    use qproof_core::ExperimentFamily;
    use std::fs;
    use std::path::Path;

    /// Vendor script run through `/bin/sh`
    fn script(dir: &Path, body: &str) -> ProcessProvider {
        let path = dir.join("provider.sh");
        fs::write(&path, format!("cat > /dev/null\n{}\n", body)).unwrap();
        ProcessProvider::new("vendor", "/bin/sh").with_args([path.to_string_lossy().into_owned()])
    }

    const FAKE_VENDOR: &str = r#"case "$1" in
  backends) echo '{"ok":true,"result":[{"name":"qpu_one","qubits":20,"pending_jobs":4,"operational":true}]}' ;;
  submit) echo '{"ok":true,"result":{"job_id":"remote-7"}}' ;;
  job) echo '{"ok":true,"result":{"status":"COMPLETED","counts":{"00":510,"11":490,"01":24}}}' ;;
  cancel) echo '{"ok":true,"result":null}' ;;
  *) echo '{"ok":false,"error":"unknown verb"}' ;;
esac"#;

    #[test]
    fn test_round_trip_through_script() {
        let dir = tempfile::tempdir().unwrap();
        let provider = script(dir.path(), FAKE_VENDOR);

        let backends = provider.list_backends().unwrap();
        assert_eq!(backends.len(), 1);
        assert_eq!(backends[0].candidate.name, "qpu_one");

        let circuit = ExperimentFamily::Bell.build_circuit(None).unwrap();
        assert_eq!(provider.submit_job(&circuit, "qpu_one", 1024).unwrap(), "remote-7");

        let job = provider.job("remote-7").unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.counts.unwrap()["11"], 490);
        provider.cancel_job("remote-7").unwrap();
    }

    #[test]
    fn test_error_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let provider = script(dir.path(), r#"echo '{"ok":false,"error":"quota exhausted"}'"#);
        let circuit = ExperimentFamily::Bell.build_circuit(None).unwrap();
        match provider.submit_job(&circuit, "qpu_one", 10) {
            Err(BackendError::JobSubmissionFailed(msg)) => assert_eq!(msg, "quota exhausted"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_non_zero_exit_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let provider = script(dir.path(), "echo boom >&2; exit 3");
        assert!(matches!(provider.job("x"), Err(BackendError::CommunicationError(_))));

        let dir = tempfile::tempdir().unwrap();
        let provider = script(dir.path(), "echo not-json");
        assert!(matches!(provider.job("x"), Err(BackendError::ProtocolError(_))));
    }

    #[test]
    fn test_child_exiting_before_reading_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deaf.sh");
        fs::write(&path, "exit 0\n").unwrap();
        let provider =
            ProcessProvider::new("vendor", "/bin/sh").with_args([path.to_string_lossy().into_owned()]);

        // larger than any pipe buffer, so the write cannot complete
        let job_id = "x".repeat(1 << 20);
        match provider.job(&job_id) {
            Err(BackendError::CommunicationError(msg)) => {
                assert!(msg.contains("request not delivered"), "{}", msg)
            }
            other => panic!("unexpected: {:?}", other.map(|j| j.status)),
        }
    }

    #[test]
    fn test_missing_program() {
        let provider = ProcessProvider::new("vendor", "/nonexistent/qproof-provider").with_args(["--json"]);
        assert!(matches!(provider.list_backends(), Err(BackendError::CommunicationError(_))));
    }
}
