//! Renderings of the record listing: CSV document and inline chat text

use std::path::Path;

use crate::core::error::{AppError, AppResult};
use crate::storage::wells::{Record, WellStore};

/// Column order of the exported table, identical to the `wells` table
pub const CSV_HEADER: [&str; 5] = ["field", "well", "status", "comment", "updated_at"];

/// Telegram rejects messages longer than this
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Excel only detects UTF-8 in CSV files that start with a byte order mark
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Exports records to CSV, header first, one row per record.
pub fn records_to_csv(records: &[Record]) -> AppResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }

    writer.into_inner().map_err(|e| AppError::Io(e.into_error()))
}

/// Writes the full store as CSV to `path`. Returns the number of records.
pub fn export_to_file(store: &WellStore, path: &Path) -> AppResult<usize> {
    let records = store.list_all()?;
    let bytes = records_to_csv(&records)?;
    std::fs::write(path, bytes)?;
    Ok(records.len())
}

/// Text listing of all wells, as shown by the "🛢 Скважины" button.
pub fn wells_listing(records: &[Record]) -> String {
    let blocks: Vec<String> = records
        .iter()
        .map(|r| format!("🛢 {} ({})\nСтатус: {}\nКомментарий: {}\n", r.well, r.field, r.status, r.comment))
        .collect();
    truncate_for_message(blocks.join("\n"))
}

/// Detailed listing grouped by field, as shown by /show.
pub fn records_to_text(records: &[Record]) -> String {
    let mut text = String::new();
    let mut current_field: Option<&str> = None;

    for record in records {
        if current_field != Some(record.field.as_str()) {
            if current_field.is_some() {
                text.push('\n');
            }
            text.push_str(&format!("📍 {}\n", record.field));
            current_field = Some(record.field.as_str());
        }
        text.push_str(&format!(
            "  🛢 {}: {}\n     {}\n     обновлено {}\n",
            record.well, record.status, record.comment, record.updated_at
        ));
    }

    truncate_for_message(text)
}

/// Field names as a bulleted list.
pub fn fields_listing(fields: &[String]) -> String {
    let lines: Vec<String> = fields.iter().map(|f| format!("- {}", f)).collect();
    truncate_for_message(format!("📍 Месторождения:\n{}", lines.join("\n")))
}

fn truncate_for_message(text: String) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text;
    }
    let suffix = "\n…\nСписок обрезан, полный список: /export";
    let keep = MAX_MESSAGE_CHARS - suffix.chars().count();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(suffix);
    truncated
}
