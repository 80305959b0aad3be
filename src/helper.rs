//! Long-lived helper processes speaking line-delimited JSON.
//!
//! Each request is one JSON document on the helper's stdin, terminated by a
//! newline; the helper answers with exactly one JSON line on stdout. A reply
//! of the form `{"error": "..."}` reports a failed request without ending the
//! process. Helper stderr is passed through to ours.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// How to launch a helper: `<interpreter> <script> <args...>`.
#[derive(Debug, Clone)]
pub struct HelperCommand {
    pub interpreter: String,
    pub script: PathBuf,
    pub args: Vec<String>,
}

impl HelperCommand {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

struct HelperProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl HelperProcess {
    fn spawn(command: &HelperCommand) -> Result<Self> {
        let mut child = Command::new(&command.interpreter)
            .arg(&command.script)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| {
                format!(
                    "failed to start helper {} {}",
                    command.interpreter,
                    command.script.display()
                )
            })?;

        let stdin = child.stdin.take().context("helper stdin unavailable")?;
        let stdout = child.stdout.take().context("helper stdout unavailable")?;
        info!(script = %command.script.display(), pid = child.id(), "helper started");

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    fn exchange(&mut self, request: &str) -> Result<String> {
        let stdin = self.stdin.as_mut().context("helper stdin closed")?;
        stdin
            .write_all(request.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush())
            .context("failed to send request to helper")?;

        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .context("failed to read helper reply")?;
        if read == 0 {
            let status = self.child.try_wait().ok().flatten();
            anyhow::bail!("helper exited before replying (status: {status:?})");
        }
        Ok(line)
    }
}

impl Drop for HelperProcess {
    fn drop(&mut self) {
        // Closing stdin is the helper's signal to exit.
        self.stdin.take();
        if let Err(e) = self.child.wait() {
            warn!("failed to reap helper process: {e}");
        }
    }
}

/// A helper started on first use and kept for every later request.
///
/// Calls are serialised through a mutex. When an exchange fails at the
/// transport level the process is dropped and the next call starts a new one.
pub struct PersistentHelper {
    command: HelperCommand,
    process: Mutex<Option<HelperProcess>>,
}

impl PersistentHelper {
    pub fn new(command: HelperCommand) -> Self {
        Self {
            command,
            process: Mutex::new(None),
        }
    }

    pub fn script_path(&self) -> &Path {
        &self.command.script
    }

    pub fn is_running(&self) -> bool {
        self.process.lock().map(|p| p.is_some()).unwrap_or(false)
    }

    pub fn call<Req, Resp>(&self, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_string(request)?;
        let mut guard = self
            .process
            .lock()
            .map_err(|_| anyhow::anyhow!("helper lock poisoned"))?;

        if guard.is_none() {
            *guard = Some(HelperProcess::spawn(&self.command)?);
        }
        let outcome = match guard.as_mut() {
            Some(process) => process.exchange(&payload),
            None => anyhow::bail!("helper not running"),
        };
        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                *guard = None;
                return Err(e);
            }
        };
        drop(guard);

        debug!(bytes = reply.len(), "helper replied");
        parse_reply(&reply)
    }
}

fn parse_reply<Resp: DeserializeOwned>(line: &str) -> Result<Resp> {
    let value: Value =
        serde_json::from_str(line.trim_end()).context("failed to parse helper reply as JSON")?;
    if let Some(message) = value.get("error") {
        let message = message.as_str().map(str::to_string).unwrap_or_else(|| message.to_string());
        anyhow::bail!("helper reported an error: {message}");
    }
    serde_json::from_value(value).context("unexpected helper reply shape")
}


#[cfg(all(test, unix))]
mod tests {
    use super::testing::shell_script;
    use super::*;
    use pretty_assertions::assert_eq;

    /// Replies with how many requests this process has served.
    const COUNTER: &str = r#"n=0
while IFS= read -r line; do
  n=$((n+1))
  echo "[$n]"
done
"#;

    #[test]
    fn one_process_serves_every_request() {
        let helper = PersistentHelper::new(HelperCommand::new("sh", shell_script(COUNTER)));
        assert!(!helper.is_running());

        let first: Vec<u32> = helper.call(&"a").unwrap();
        let second: Vec<u32> = helper.call(&"b").unwrap();

        assert_eq!((first, second), (vec![1], vec![2]));
        assert!(helper.is_running());
    }

    #[test]
    fn error_reply_keeps_the_process() {
        let script = shell_script(
            r#"n=0
while IFS= read -r line; do
  n=$((n+1))
  if [ "$n" = 1 ]; then echo '{"error": "model busy"}'; else echo "[$n]"; fi
done
"#,
        );
        let helper = PersistentHelper::new(HelperCommand::new("sh", script));

        let err = helper.call::<_, Vec<u32>>(&"a").unwrap_err();
        assert!(err.to_string().contains("model busy"));
        let next: Vec<u32> = helper.call(&"b").unwrap();
        assert_eq!(next, vec![2]);
    }

    #[test]
    fn dead_helper_is_restarted() {
        let script = shell_script("IFS= read -r line\necho '[7]'\n");
        let helper = PersistentHelper::new(HelperCommand::new("sh", script));

        let first: Vec<u32> = helper.call(&"a").unwrap();
        assert_eq!(first, vec![7]);
        assert!(helper.call::<_, Vec<u32>>(&"b").is_err());
        assert!(!helper.is_running());
        let again: Vec<u32> = helper.call(&"c").unwrap();
        assert_eq!(again, vec![7]);
    }

    #[test]
    fn missing_interpreter_is_an_error() {
        let helper = PersistentHelper::new(HelperCommand::new(
            "docintel-no-such-interpreter",
            "helper.py",
        ));
        assert!(helper.call::<_, Vec<u32>>(&"a").is_err());
    }
}
