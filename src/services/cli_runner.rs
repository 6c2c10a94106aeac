use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Failed to parse command line: {0}")]
    BadCommand(String),

    #[error("spawning {cmd}: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    // The message shown to the user, already extracted from the output
    #[error("{0}")]
    Rejected(String),
}

/// Expand `${VAR}` from `vars` first, then the process environment.
/// Unknown variables expand to the empty string.
pub fn expand_cmdline(cmdline: &str, vars: &BTreeMap<String, String>) -> String {
    let re = match Regex::new(r"\$\{([A-Za-z0-9_]+)\}") {
        Ok(re) => re,
        Err(_) => return cmdline.to_string(),
    };
    re.replace_all(cmdline, |caps: &regex::Captures| {
        let key = &caps[1];
        if let Some(v) = vars.get(key) {
            // Quote if contains whitespace to keep it a single arg in shlex::split
            if v.chars().any(|c| c.is_whitespace()) {
                let escaped = v.replace('"', "\\\"");
                return format!("\"{escaped}\"");
            }
            return v.clone();
        }
        env::var(key).unwrap_or_default()
    })
    .to_string()
}

fn split_cmdline(expanded: &str) -> Option<Vec<String>> {
    shlex::split(expanded).filter(|p| !p.is_empty())
}

pub fn run_cmdline_to_json(cmdline: &str, vars: &BTreeMap<String, String>) -> Result<JsonValue> {
    let expanded = expand_cmdline(cmdline, vars);
    let parts = split_cmdline(&expanded).ok_or_else(|| anyhow!("Failed to parse command line"))?;
    let output = Command::new(&parts[0])
        .args(&parts[1..])
        .env("ADMIN_TUI_JSON", "1")
        .output()
        .with_context(|| format!("spawning {expanded}"))?;
    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(anyhow!("Command failed: {}\n{}", cmdline, err.trim()));
    }
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let v: JsonValue = serde_json::from_str(&text).with_context(|| "parsing command JSON")?;
    Ok(v)
}

/// Run a create/update command with `payload` as JSON on stdin.
///
/// Exit status 0 is success; stdout is returned as JSON when it parses and
/// as `Null` otherwise. On failure the user-facing message is taken from
/// the command's JSON envelope, then stderr, then `fallback`.
pub fn run_submit(
    cmdline: &str,
    vars: &BTreeMap<String, String>,
    payload: &JsonValue,
    fallback: &str,
) -> Result<JsonValue, SubmitError> {
    let expanded = expand_cmdline(cmdline, vars);
    let parts = split_cmdline(&expanded).ok_or_else(|| SubmitError::BadCommand(cmdline.to_string()))?;
    let spawn_err = |source| SubmitError::Spawn {
        cmd: expanded.clone(),
        source,
    };
    let mut child = Command::new(&parts[0])
        .args(&parts[1..])
        .env("ADMIN_TUI_JSON", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;
    let body = serde_json::to_vec(payload).unwrap_or_default();
    let stdin = child.stdin.take();
    // Fed from its own thread: the command may fill stdout before reading.
    let output = std::thread::scope(|s| {
        if let Some(mut stdin) = stdin {
            s.spawn(move || {
                // A command that ignores stdin may close it early; its exit status decides.
                if let Err(e) = stdin.write_all(&body) {
                    tracing::debug!(error = %e, "submit command closed stdin");
                }
            });
        }
        child.wait_with_output()
    })
    .map_err(spawn_err)?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        return Ok(serde_json::from_str(&stdout).unwrap_or(JsonValue::Null));
    }
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    tracing::debug!(status = ?output.status.code(), "submit command failed");
    Err(SubmitError::Rejected(extract_error_message(
        &stdout, &stderr, fallback,
    )))
}

const MESSAGE_PATHS: &[&[&str]] = &[
    &["response", "data", "message"],
    &["data", "message"],
    &["message"],
    &["error"],
];

/// Pick the most specific error text a failed command produced.
pub fn extract_error_message(stdout: &str, stderr: &str, fallback: &str) -> String {
    for text in [stdout, stderr] {
        let Ok(v) = serde_json::from_str::<JsonValue>(text.trim()) else {
            continue;
        };
        for path in MESSAGE_PATHS {
            let found = path.iter().try_fold(&v, |cur, k| cur.get(*k));
            if let Some(msg) = found.and_then(|m| m.as_str()).filter(|s| !s.is_empty()) {
                return msg.to_string();
            }
        }
    }
    let stderr = stderr.trim();
    if !stderr.is_empty() && serde_json::from_str::<JsonValue>(stderr).is_err() {
        return stderr.to_string();
    }
    fallback.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expand_prefers_vars_and_quotes_whitespace() {
        let mut vars = BTreeMap::new();
        vars.insert("RECORD_ID".to_string(), "42".to_string());
        vars.insert("NAME".to_string(), "two words".to_string());
        let out = expand_cmdline("cli update ${RECORD_ID} ${NAME} ${ADMIN_TUI_SURELY_UNSET}", &vars);
        assert_eq!(out, "cli update 42 \"two words\" ");
        assert_eq!(
            shlex::split(&out).unwrap(),
            vec!["cli", "update", "42", "two words"]
        );
    }

    #[test]
    fn error_message_prefers_nested_response_message() {
        let out = json!({"response": {"data": {"message": "code taken"}}, "message": "outer"});
        assert_eq!(
            extract_error_message(&out.to_string(), "", "Failed to create tenant"),
            "code taken"
        );
        let out = json!({"message": "outer"});
        assert_eq!(extract_error_message(&out.to_string(), "", "x"), "outer");
    }

    #[test]
    fn error_message_falls_back_to_stderr_then_default() {
        assert_eq!(
            extract_error_message("", "permission denied\n", "Failed to update role"),
            "permission denied"
        );
        assert_eq!(
            extract_error_message("not json", "", "Failed to update role"),
            "Failed to update role"
        );
        assert_eq!(
            extract_error_message("", "{\"error\": \"bad token\"}", "x"),
            "bad token"
        );
    }

    #[cfg(unix)]
    #[test]
    fn submit_pipes_payload_to_stdin() {
        let v = run_submit("cat", &BTreeMap::new(), &json!({"name": "Acme"}), "x").unwrap();
        assert_eq!(v, json!({"name": "Acme"}));
    }

    #[cfg(unix)]
    #[test]
    fn submit_survives_command_that_writes_before_reading() {
        // Both directions exceed a pipe buffer.
        let cmd = "sh -c 'yes x | head -c 300000; cat >/dev/null'";
        let payload = json!({"description": "y".repeat(300_000)});
        let v = run_submit(cmd, &BTreeMap::new(), &payload, "x").unwrap();
        assert_eq!(v, JsonValue::Null);
    }

    #[cfg(unix)]
    #[test]
    fn submit_failure_uses_stdout_envelope() {
        let cmd = r#"sh -c 'cat >/dev/null; echo "{\"message\":\"nope\"}"; exit 3'"#;
        let err = run_submit(cmd, &BTreeMap::new(), &json!({}), "Failed to create tenant")
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = run_submit("   ", &BTreeMap::new(), &json!({}), "x").unwrap_err();
        assert!(matches!(err, SubmitError::BadCommand(_)));
    }
}
