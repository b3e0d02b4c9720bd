//! CSV export of aggregated rows
//!
//! The table has two header rows: the group of each column, then its field
//! name. The first two columns are the source line and website identity.
//! Multi-valued cells are JSON arrays; cells without values are empty.

use super::aggregate::WebsiteAggregate;
use super::schema::FieldGroups;
use crate::SurveyError;
use std::io::Write;
use std::path::Path;

/// Writes the table to a file, creating parent directories as needed
pub fn write_table(
    path: &Path,
    groups: &FieldGroups,
    rows: &[WebsiteAggregate],
) -> Result<(), SurveyError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_table_to(file, groups, rows)
}

/// Writes the table to any writer
pub fn write_table_to<W: Write>(
    writer: W,
    groups: &FieldGroups,
    rows: &[WebsiteAggregate],
) -> Result<(), SurveyError> {
    let columns = groups.columns();
    let mut csv = csv::Writer::from_writer(writer);

    let mut group_row = vec!["", ""];
    group_row.extend(columns.iter().map(|(group, _)| *group));
    csv.write_record(&group_row)?;

    let mut field_row = vec!["line", "website"];
    field_row.extend(columns.iter().map(|(_, field)| *field));
    csv.write_record(&field_row)?;

    for row in rows {
        let mut cells = Vec::with_capacity(columns.len() + 2);
        cells.push(row.line.to_string());
        cells.push(row.website.clone());
        for (_, field) in &columns {
            cells.push(cell(row.values(field))?);
        }
        csv.write_record(&cells)?;
    }

    csv.flush()?;
    Ok(())
}

fn cell(values: &[String]) -> Result<String, SurveyError> {
    if values.is_empty() {
        Ok(String::new())
    } else {
        Ok(serde_json::to_string(values)?)
    }
}
