use serde_json::Value;

/// Pretty-printed JSON on stdout; a serialization failure goes to stderr.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("failed to render JSON output: {e}"),
    }
}
