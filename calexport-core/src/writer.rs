//! Writing exported documents to a stream or an output directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ExportResult;
use crate::merge::{ExportDocument, MergedCalendar};

/// Serialize one merged calendar, timezones included, to a caller-owned stream.
///
/// The stream is flushed but not closed.
pub fn write_calendar<W: Write + ?Sized>(
    calendar: &MergedCalendar,
    out: &mut W,
) -> ExportResult<()> {
    out.write_all(calendar.to_ics().as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Empty the output directory, removing it first if it already exists.
///
/// This deletes whatever was there before; concurrent readers may see a
/// missing or partially written directory.
pub async fn prepare_output_directory(dir: &Path) -> ExportResult<()> {
    if tokio::fs::metadata(dir).await.is_ok() {
        tracing::info!(path = %dir.display(), "removing existing output directory");
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}

/// Write each document to `{label}.ics` / `{label}.vcf` inside `dir`.
pub async fn write_documents(
    documents: &[ExportDocument],
    dir: &Path,
) -> ExportResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(documents.len());

    for document in documents {
        let path = dir.join(document.file_name());
        tokio::fs::write(&path, document.to_text()).await?;
        tracing::debug!(path = %path.display(), entries = document.len(), "wrote export file");
        written.push(path);
    }

    Ok(written)
}
