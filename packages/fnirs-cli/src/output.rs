use std::io::Write;
use std::path::Path;

/// Write a JSON string to stdout, or to a file when a path is given.
pub fn write_output(json: &str, output_path: Option<&Path>) -> Result<(), String> {
    match output_path {
        Some(path) => std::fs::write(path, json)
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e)),
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(json.as_bytes())
                .and_then(|_| handle.write_all(b"\n"))
                .map_err(|e| format!("Failed to write to stdout: {}", e))
        }
    }
}

/// Serialize a value to pretty-printed JSON.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {}", e))
}

/// Serialize and print a value as pretty JSON, mapping failures to an exit code.
pub fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    match to_json(value).and_then(|json| write_output(&json, None)) {
        Ok(()) => crate::exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            crate::exit_codes::EXECUTION_ERROR
        }
    }
}
