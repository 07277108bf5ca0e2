//! One export run: resolve, merge, write, commit.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use crate::directory::DirectoryService;
use crate::error::{ExportError, ExportResult};
use crate::exporter::{ExportSpec, ExportType};
use crate::merge::{merge_into_single, merge_per_collection};
use crate::selector::resolve_collections;
use crate::store::Transaction;
use crate::writer::{prepare_output_directory, write_calendar, write_documents};

/// Where exported data goes.
pub enum Destination {
    /// Everything merged into one calendar on a caller-owned stream.
    Stream(Box<dyn Write + Send>),
    /// One file per collection in a directory that is wiped first.
    Directory(PathBuf),
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Stream(_) => f.write_str("Stream"),
            Destination::Directory(path) => f.debug_tuple("Directory").field(path).finish(),
        }
    }
}

#[derive(Debug)]
pub struct ExportRequest {
    pub specs: Vec<ExportSpec>,
    pub destination: Destination,
    pub convert_to_mailto: bool,
}

impl ExportRequest {
    pub fn validate(&self) -> ExportResult<()> {
        check_specs(&self.specs, matches!(self.destination, Destination::Stream(_)))
    }
}

/// Reject spec lists that cannot be exported: an empty list, or address
/// books bound for a single stream.
pub fn check_specs(specs: &[ExportSpec], to_stream: bool) -> ExportResult<()> {
    if specs.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let has_contacts = specs
        .iter()
        .any(|s| s.export_type == ExportType::AddressBook);
    if has_contacts && to_stream {
        return Err(ExportError::ContactsRequireDirectory);
    }
    Ok(())
}

/// What an export run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub collections: usize,
    pub objects: usize,
    pub files: Vec<PathBuf>,
}

/// Run an export against an open transaction.
///
/// The transaction is committed whether or not the export succeeded; the
/// export's own error takes precedence over a commit failure.
pub async fn run_export<T, D>(
    request: ExportRequest,
    directory: &D,
    txn: &mut T,
) -> ExportResult<ExportSummary>
where
    T: Transaction + ?Sized,
    D: DirectoryService + ?Sized,
{
    let result = export(request, directory, txn).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "export failed");
    }

    let committed = txn.commit().await;
    match (result, committed) {
        (Err(e), Err(commit_err)) => {
            tracing::error!(error = %commit_err, "commit after failed export also failed");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(commit_err)) => Err(commit_err),
        (Ok(summary), Ok(())) => Ok(summary),
    }
}

async fn export<T, D>(
    request: ExportRequest,
    directory: &D,
    txn: &mut T,
) -> ExportResult<ExportSummary>
where
    T: Transaction + ?Sized,
    D: DirectoryService + ?Sized,
{
    request.validate()?;

    let collections = resolve_collections(&request.specs, directory, txn).await?;
    tracing::info!(collections = collections.len(), "resolved collections");

    match request.destination {
        Destination::Stream(mut out) => {
            let merged = merge_into_single(txn, &collections, request.convert_to_mailto).await?;
            write_calendar(&merged, &mut out)?;
            Ok(ExportSummary {
                collections: collections.len(),
                objects: merged.components().len(),
                files: Vec::new(),
            })
        }
        Destination::Directory(dir) => {
            prepare_output_directory(&dir).await?;
            let documents =
                merge_per_collection(txn, &collections, request.convert_to_mailto).await?;
            let files = write_documents(&documents, &dir).await?;
            Ok(ExportSummary {
                collections: collections.len(),
                objects: documents.iter().map(|d| d.len()).sum(),
                files,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::directory::FileDirectory;
    use crate::test_support::{StoreFixture, event_ics, vcard};

    /// Stream that keeps what was written after the request is consumed.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn stream_request(specs: Vec<ExportSpec>, buffer: &SharedBuffer) -> ExportRequest {
        ExportRequest {
            specs,
            destination: Destination::Stream(Box::new(buffer.clone())),
            convert_to_mailto: false,
        }
    }

    #[test]
    fn test_validate_requires_specs() {
        let request = stream_request(Vec::new(), &SharedBuffer::default());
        assert!(matches!(request.validate(), Err(ExportError::NothingToExport)));
    }

    #[test]
    fn test_validate_rejects_contacts_on_stream() {
        let spec = ExportSpec::uid("U1").of_type(ExportType::AddressBook);
        let request = stream_request(vec![spec], &SharedBuffer::default());
        assert!(matches!(
            request.validate(),
            Err(ExportError::ContactsRequireDirectory)
        ));
    }

    #[tokio::test]
    async fn test_single_stream_merges_with_one_timezone() {
        let fixture = StoreFixture::new();
        let work = fixture.calendar("U1", "work");
        let home = fixture.calendar("U1", "home");
        fixture.put(&work, "a.ics", &event_ics("A", "Standup", Some("America/Chicago")));
        fixture.put(&home, "b.ics", &event_ics("B", "Dinner", Some("America/Chicago")));

        let buffer = SharedBuffer::default();
        let request = stream_request(vec![ExportSpec::uid("U1")], &buffer);
        let mut txn = fixture.store().new_transaction();

        let summary = run_export(request, &FileDirectory::default(), &mut txn)
            .await
            .unwrap();

        assert_eq!(summary.collections, 2);
        assert_eq!(summary.objects, 2);
        assert!(summary.files.is_empty());

        let text = buffer.contents();
        assert_eq!(text.matches("BEGIN:VTIMEZONE").count(), 1);
        assert_eq!(text.matches("BEGIN:VEVENT").count(), 2);
        assert!(text.contains("UID:A"));
        assert!(text.contains("UID:B"));
    }

    #[tokio::test]
    async fn test_directory_export_writes_one_file_per_collection() {
        let fixture = StoreFixture::new();
        let work = fixture.calendar("U1", "work");
        fixture.set_properties(&work, Some("Work"), Some("#0000FF"));
        fixture.put(&work, "a.ics", &event_ics("A", "Standup", None));
        let book = fixture.addressbook("U1", "addressbook");
        fixture.put(&book, "c.vcf", &vcard("C", "Carol"));

        let out = fixture.root().join("out");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("stale.ics"), "old").unwrap();

        let request = ExportRequest {
            specs: vec![
                ExportSpec::uid("U1"),
                ExportSpec::uid("U1").of_type(ExportType::AddressBook),
            ],
            destination: Destination::Directory(out.clone()),
            convert_to_mailto: false,
        };
        let mut txn = fixture.store().new_transaction();

        let summary = run_export(request, &FileDirectory::default(), &mut txn)
            .await
            .unwrap();

        assert_eq!(summary.files, vec![out.join("U1_work.ics"), out.join("U1_addressbook.vcf")]);
        assert!(!out.join("stale.ics").exists());

        let calendar = std::fs::read_to_string(out.join("U1_work.ics")).unwrap();
        assert!(calendar.contains("NAME:Work\r\n"));
        assert!(calendar.contains("COLOR:#0000FF\r\n"));
        assert!(calendar.contains("SOURCE:/calendars/__uids__/U1/work/\r\n"));

        let cards = std::fs::read_to_string(out.join("U1_addressbook.vcf")).unwrap();
        assert!(cards.contains("FN:Carol"));
    }

    #[tokio::test]
    async fn test_directory_export_contains_only_collection_files() {
        let fixture = StoreFixture::new();
        let work = fixture.calendar("U1", "work");
        let home = fixture.calendar("U1", "home");
        fixture.put(&work, "a.ics", &event_ics("A", "Standup", None));
        fixture.put(&home, "b.ics", &event_ics("B", "Dinner", None));
        let out = fixture.root().join("out");

        let request = ExportRequest {
            specs: vec![ExportSpec::uid("U1")],
            destination: Destination::Directory(out.clone()),
            convert_to_mailto: false,
        };
        let mut txn = fixture.store().new_transaction();
        run_export(request, &FileDirectory::default(), &mut txn)
            .await
            .unwrap();

        let mut files: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        assert_eq!(files, vec!["U1_home.ics", "U1_work.ics"]);
    }

    #[tokio::test]
    async fn test_failure_still_commits_provisioned_homes() {
        let fixture = StoreFixture::new();

        let spec = ExportSpec::uid("U9").with_collection("missing");
        let request = stream_request(vec![spec], &SharedBuffer::default());
        let mut txn = fixture.store().new_transaction();

        let result = run_export(request, &FileDirectory::default(), &mut txn).await;

        assert!(matches!(result, Err(ExportError::CollectionNotFound { .. })));
        assert!(fixture.root().join("calendars/__uids__/U9").is_dir());
    }

    #[tokio::test]
    async fn test_unknown_record_writes_nothing() {
        let fixture = StoreFixture::new();
        let out = fixture.root().join("out");

        let spec = ExportSpec::from_record_name("users:nobody").unwrap();
        let request = ExportRequest {
            specs: vec![spec],
            destination: Destination::Directory(out.clone()),
            convert_to_mailto: false,
        };
        let mut txn = fixture.store().new_transaction();

        let result = run_export(request, &FileDirectory::default(), &mut txn).await;

        assert!(matches!(result, Err(ExportError::RecordNotFound { .. })));
        assert!(!out.exists());
    }
}
