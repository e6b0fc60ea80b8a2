//! Reading and writing trigger events as JSON

use crate::{Result, SignUpEvent, TriggerError};
use std::io::{Read, Write};

/// Parse an event from a JSON document.
///
/// # Errors
///
/// Returns [`TriggerError::EmptyInput`] for blank input and
/// [`TriggerError::Json`] when the document is not a sign-up event.
pub fn parse_event(input: &str) -> Result<SignUpEvent> {
    if input.trim().is_empty() {
        return Err(TriggerError::EmptyInput);
    }
    Ok(serde_json::from_str(input)?)
}

/// Read a whole event from `reader` (usually stdin).
///
/// # Errors
///
/// Returns an error if reading fails or the input is not a sign-up event.
pub fn read_event(mut reader: impl Read) -> Result<SignUpEvent> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;
    parse_event(&input)
}

/// Write `event` to `writer` followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_event(mut writer: impl Write, event: &SignUpEvent, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, event)?;
    } else {
        serde_json::to_writer(&mut writer, event)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
