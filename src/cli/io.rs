//! JSON output for the CLI
//!
//! Every command writes exactly one JSON object to stdout:
//! `{"status":"ok","data":...}` or `{"status":"error","code":..,"message":..}`.

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&ok_envelope(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_json(&error_envelope(code, message))
}

fn ok_envelope(data: Value) -> Value {
    serde_json::json!({
        "status": "ok",
        "data": data
    })
}

fn error_envelope(code: &str, message: &str) -> Value {
    serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        let ok = ok_envelope(serde_json::json!({"count": 2}));
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["data"]["count"], 2);

        let err = error_envelope("GEOALERT_STORE_NOT_FOUND", "no such subscriber");
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "GEOALERT_STORE_NOT_FOUND");
        assert_eq!(err["message"], "no such subscriber");
    }
}
