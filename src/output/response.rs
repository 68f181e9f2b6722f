//! CLI response formatting and output.
//!
//! `--json` runs print one envelope on stdout; plain runs print errors as
//! text. Exit codes are mapped in `main`.

use convoy::error::Hint;
use convoy::{Error, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_json_result<T: Serialize>(result: &Result<T>) -> Result<()> {
    match result {
        Ok(data) => print_response(&CliResponse::success(data)),
        Err(err) => print_response(&CliResponse::<()>::from_error(err)),
    }
}

/// Plain-text rendering of an uncaught error: the message and its hints, or
/// the whole structure when debugging.
pub fn render_error(err: &Error, debug: bool) -> String {
    if debug {
        let response = CliResponse::<()>::from_error(err);
        return response
            .to_json()
            .unwrap_or_else(|_| format!("{:?}", err));
    }
    let mut out = err.message.clone();
    for hint in &err.hints {
        out.push_str(&format!("\n  hint: {}", hint.message));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_error_shows_message_and_hints() {
        let err = Error::config_not_found("/etc/site.cfg");
        let text = render_error(&err, false);
        assert!(text.starts_with("Config file not found: /etc/site.cfg"));
        assert!(text.contains("\n  hint: "));
    }

    #[test]
    fn debug_error_shows_code_and_details() {
        let err = Error::duplicate_task("clean");
        let text = render_error(&err, true);
        assert!(text.contains("\"code\": \"registry.duplicate_task\""));
        assert!(text.contains("\"key\": \"clean\""));
    }
}
