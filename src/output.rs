use crate::error::DashError;
use crate::report::ReportArtifact;

/// Print TOON result to stdout.
pub fn print_result(toon_string: &str) {
    if toon_string.ends_with('\n') {
        print!("{}", toon_string);
    } else {
        println!("{}", toon_string);
    }
}

/// Print error to stderr in the contract format: error: <category>: <message>
pub fn print_error(err: &DashError) {
    eprintln!("error: {}", err);
}

/// Print an informational line to stderr.
pub fn print_notice(message: &str) {
    eprintln!("note: {}", message);
}

/// Print a truncation warning to stderr for interactive visibility.
pub fn print_truncation_warning(message: &str) {
    eprintln!("warning: {}", message);
}

/// Message shown when a join stopped at the row limit.
pub fn truncation_message(limit: usize) -> String {
    format!(
        "Showing the first {} rows. Use --limit N or --no-limit for more.",
        limit
    )
}

/// Render the report summary as a TOON object.
///
/// Summary includes: file (string), path (string), mime_type (string),
/// bytes (number), rows_written (number), filters (number).
pub fn report_summary(artifact: &ReportArtifact) -> Result<String, DashError> {
    let mut map = serde_json::Map::new();
    map.insert(
        "file".to_string(),
        serde_json::Value::String(artifact.file_name.clone()),
    );
    map.insert(
        "path".to_string(),
        serde_json::Value::String(artifact.path.display().to_string()),
    );
    map.insert(
        "mime_type".to_string(),
        serde_json::Value::String(artifact.mime_type.to_string()),
    );
    map.insert(
        "bytes".to_string(),
        serde_json::Value::Number(artifact.bytes.len().into()),
    );
    map.insert(
        "rows_written".to_string(),
        serde_json::Value::Number(artifact.data_rows.into()),
    );
    map.insert(
        "filters".to_string(),
        serde_json::Value::Number(artifact.filter_rows.into()),
    );

    toon_format::encode_default(&serde_json::Value::Object(map)).map_err(|e| DashError::Format {
        message: e.to_string(),
    })
}

/// Print the report summary to stdout.
pub fn print_report_summary(artifact: &ReportArtifact) -> Result<(), DashError> {
    print_result(&report_summary(artifact)?);
    Ok(())
}
