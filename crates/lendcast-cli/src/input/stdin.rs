use serde_json::Value;
use std::io::{self, Read};

/// Read piped JSON from stdin, if any. An interactive terminal (or an
/// empty pipe) yields `None` so callers can fall back to flags.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    match buffer.trim() {
        "" => Ok(None),
        payload => Ok(Some(serde_json::from_str(payload)?)),
    }
}
