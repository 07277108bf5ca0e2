//! Resolve export specifications to the collections they name.

use crate::directory::{DirectoryService, RecordType};
use crate::error::{ExportError, ExportResult};
use crate::exporter::{ExportSpec, ExportType, HomeSource};
use crate::store::{Collection, Transaction};

/// Calendar collection that holds incoming scheduling messages; never exported
/// unless asked for by name.
const INBOX: &str = "inbox";

/// Resolve every spec, in order, into one flat list of collections.
pub async fn resolve_collections<T, D>(
    specs: &[ExportSpec],
    directory: &D,
    txn: &mut T,
) -> ExportResult<Vec<Collection>>
where
    T: Transaction + ?Sized,
    D: DirectoryService + ?Sized,
{
    let mut collections = Vec::new();
    for spec in specs {
        collections.extend(list_collections(spec, directory, txn).await?);
    }
    Ok(collections)
}

/// Enumerate the collections one spec refers to.
pub async fn list_collections<T, D>(
    spec: &ExportSpec,
    directory: &D,
    txn: &mut T,
) -> ExportResult<Vec<Collection>>
where
    T: Transaction + ?Sized,
    D: DirectoryService + ?Sized,
{
    match &spec.source {
        HomeSource::Uid(uid) => collections_for_home(uid, spec, txn).await,
        HomeSource::DirectoryRecord {
            record_type,
            short_name,
        } => {
            let uid = home_uid_for_record(record_type, short_name, directory).await?;
            collections_for_home(&uid, spec, txn).await
        }
        HomeSource::AllHomes => {
            let mut collections = Vec::new();
            for expanded in expand_all_homes(spec, txn).await? {
                if let HomeSource::Uid(uid) = &expanded.source {
                    collections.extend(collections_for_home(uid, &expanded, txn).await?);
                }
            }
            Ok(collections)
        }
    }
}

/// One UID spec per home of the spec's kind, carrying over its collection names.
pub async fn expand_all_homes<T>(spec: &ExportSpec, txn: &T) -> ExportResult<Vec<ExportSpec>>
where
    T: Transaction + ?Sized,
{
    let uids = txn.home_uids(spec.export_type).await?;
    tracing::debug!(homes = uids.len(), kind = %spec.export_type, "expanding all homes");

    Ok(uids
        .into_iter()
        .map(|uid| ExportSpec {
            source: HomeSource::Uid(uid),
            export_type: spec.export_type,
            collections: spec.collections.clone(),
        })
        .collect())
}

async fn home_uid_for_record<D>(
    record_type: &str,
    short_name: &str,
    directory: &D,
) -> ExportResult<String>
where
    D: DirectoryService + ?Sized,
{
    let kind = RecordType::from_old_name(record_type)?;

    let record = directory
        .record_with_short_name(kind, short_name)
        .await?
        .ok_or_else(|| ExportError::RecordNotFound {
            record_type: record_type.to_string(),
            short_name: short_name.to_string(),
        })?;

    tracing::debug!(record_type, short_name, uid = %record.uid, "resolved directory record");
    Ok(record.uid)
}

async fn collections_for_home<T>(
    uid: &str,
    spec: &ExportSpec,
    txn: &mut T,
) -> ExportResult<Vec<Collection>>
where
    T: Transaction + ?Sized,
{
    let home = txn.home_with_uid(uid, spec.export_type, true).await?;

    if !spec.collections.is_empty() {
        let mut collections = Vec::with_capacity(spec.collections.len());
        for name in &spec.collections {
            let collection = txn
                .collection_with_name(&home, name)
                .await?
                .ok_or_else(|| ExportError::CollectionNotFound {
                    home: uid.to_string(),
                    name: name.clone(),
                })?;
            collections.push(collection);
        }
        return Ok(collections);
    }

    let collections = txn.collections(&home).await?;
    Ok(match spec.export_type {
        ExportType::Calendar => collections.into_iter().filter(|c| c.name != INBOX).collect(),
        ExportType::AddressBook => collections,
    })
}
