//! Per-page record export as JSON Lines

use crate::record::PageRecord;
use crate::SurveyError;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one JSON object per record, replacing any existing file
pub fn write_records(path: &Path, records: &[PageRecord]) -> Result<(), SurveyError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
