//! JSON dump of a run's saved listings

use crate::listing::JobListing;
use crate::output::OutputResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `listings` as a pretty-printed JSON array, replacing any existing file
pub fn write_json_dump(listings: &[JobListing], output_path: &Path) -> OutputResult<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, listings)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(())
}
