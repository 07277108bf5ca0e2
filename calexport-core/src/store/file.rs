//! Filesystem-backed store.
//!
//! Layout under the data root:
//!
//! ```text
//! calendars/__uids__/{uid}/{collection}/*.ics
//! addressbooks/__uids__/{uid}/{collection}/*.vcf
//! {collection}/.properties.toml     displayname, color
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{ExportError, ExportResult};
use crate::exporter::ExportType;
use crate::store::{Collection, CollectionProperties, Home, StoredObject, Transaction};

const UIDS_DIR: &str = "__uids__";
const PROPERTIES_FILE: &str = ".properties.toml";

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn new_transaction(&self) -> FileTransaction {
        FileTransaction {
            root: self.root.clone(),
            pending_homes: Vec::new(),
        }
    }
}

/// A transaction over a [`FileStore`].
///
/// Homes looked up with `create` are only provisioned on disk by `commit`;
/// dropping the transaction without committing leaves the store untouched.
#[derive(Debug)]
pub struct FileTransaction {
    root: PathBuf,
    pending_homes: Vec<PathBuf>,
}

impl FileTransaction {
    fn kind_root(&self, kind: ExportType) -> PathBuf {
        self.root.join(kind.home_root()).join(UIDS_DIR)
    }

    fn home_path(&self, home: &Home) -> PathBuf {
        self.kind_root(home.kind).join(&home.owner_uid)
    }

    async fn load_collection(&self, home: &Home, name: &str) -> ExportResult<Collection> {
        let path = self.home_path(home).join(name);
        let properties = load_properties(&path).await?;

        Ok(Collection {
            owner_uid: home.owner_uid.clone(),
            name: name.to_string(),
            kind: home.kind,
            properties,
        })
    }
}

#[async_trait]
impl Transaction for FileTransaction {
    async fn home_with_uid(
        &mut self,
        uid: &str,
        kind: ExportType,
        create: bool,
    ) -> ExportResult<Home> {
        if !is_path_segment(uid) {
            return Err(ExportError::HomeNotFound(uid.to_string()));
        }
        let home = Home {
            owner_uid: uid.to_string(),
            kind,
        };
        let path = self.home_path(&home);

        if !is_dir(&path).await {
            if !create {
                return Err(ExportError::HomeNotFound(uid.to_string()));
            }
            tracing::debug!(uid, %kind, "home will be provisioned on commit");
            if !self.pending_homes.contains(&path) {
                self.pending_homes.push(path);
            }
        }

        Ok(home)
    }

    async fn home_uids(&self, kind: ExportType) -> ExportResult<Vec<String>> {
        list_dir(&self.kind_root(kind), EntryKind::Directory).await
    }

    async fn collections(&self, home: &Home) -> ExportResult<Vec<Collection>> {
        let names = list_dir(&self.home_path(home), EntryKind::Directory).await?;

        let mut collections = Vec::with_capacity(names.len());
        for name in names {
            collections.push(self.load_collection(home, &name).await?);
        }
        Ok(collections)
    }

    async fn collection_with_name(
        &self,
        home: &Home,
        name: &str,
    ) -> ExportResult<Option<Collection>> {
        if !is_path_segment(name) {
            return Ok(None);
        }
        if !is_dir(&self.home_path(home).join(name)).await {
            return Ok(None);
        }
        self.load_collection(home, name).await.map(Some)
    }

    async fn objects(&self, collection: &Collection) -> ExportResult<Vec<StoredObject>> {
        let dir = self
            .kind_root(collection.kind)
            .join(&collection.owner_uid)
            .join(&collection.name);
        let extension = collection.kind.extension();

        let names = list_dir(&dir, EntryKind::File).await?;

        let mut objects = Vec::new();
        for name in names
            .into_iter()
            .filter(|n| Path::new(n).extension().is_some_and(|e| e == extension))
        {
            let text = tokio::fs::read_to_string(dir.join(&name)).await?;
            objects.push(StoredObject { name, text });
        }
        Ok(objects)
    }

    async fn commit(&mut self) -> ExportResult<()> {
        for path in self.pending_homes.drain(..) {
            tracing::debug!(path = %path.display(), "provisioning home");
            tokio::fs::create_dir_all(&path).await?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Directory,
    File,
}

/// A name that stays one directory level below its parent when joined.
fn is_path_segment(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(&['/', '\\', '\0'][..])
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|m| m.is_dir())
}

/// Sorted names of the visible entries of `dir`; a missing directory is empty.
async fn list_dir(dir: &Path, kind: EntryKind) -> ExportResult<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let file_type = entry.file_type().await?;
        let wanted = match kind {
            EntryKind::Directory => file_type.is_dir(),
            EntryKind::File => file_type.is_file(),
        };
        if wanted {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

async fn load_properties(collection_dir: &Path) -> ExportResult<CollectionProperties> {
    let path = collection_dir.join(PROPERTIES_FILE);

    match tokio::fs::read_to_string(&path).await {
        Ok(content) => toml::from_str(&content)
            .map_err(|e| ExportError::Config(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(CollectionProperties::default()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StoreFixture, event_ics};

    #[tokio::test]
    async fn test_collections_are_sorted_and_skip_hidden_dirs() {
        let fixture = StoreFixture::new();
        fixture.calendar("U1", "work");
        fixture.calendar("U1", "home");
        fixture.calendar("U1", ".trash");

        let mut txn = fixture.store().new_transaction();
        let home = txn.home_with_uid("U1", ExportType::Calendar, false).await.unwrap();
        let names: Vec<String> = txn
            .collections(&home)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(names, vec!["home", "work"]);
    }

    #[tokio::test]
    async fn test_collection_properties_are_loaded() {
        let fixture = StoreFixture::new();
        let work = fixture.calendar("U1", "work");
        fixture.set_properties(&work, Some("Work"), Some("#FF0000"));

        let mut txn = fixture.store().new_transaction();
        let home = txn.home_with_uid("U1", ExportType::Calendar, false).await.unwrap();
        let collection = txn.collection_with_name(&home, "work").await.unwrap().unwrap();

        assert_eq!(collection.properties.display_name.as_deref(), Some("Work"));
        assert_eq!(collection.properties.color.as_deref(), Some("#FF0000"));
        assert_eq!(collection.label(), "U1_work");
        assert_eq!(collection.source_path(), "/calendars/__uids__/U1/work/");
    }

    #[tokio::test]
    async fn test_missing_collection_is_none() {
        let fixture = StoreFixture::new();
        fixture.calendar("U1", "work");

        let mut txn = fixture.store().new_transaction();
        let home = txn.home_with_uid("U1", ExportType::Calendar, false).await.unwrap();

        assert!(txn.collection_with_name(&home, "nope").await.unwrap().is_none());
        assert!(txn.collection_with_name(&home, "../U2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_objects_only_include_matching_extension() {
        let fixture = StoreFixture::new();
        let work = fixture.calendar("U1", "work");
        fixture.put(&work, "b.ics", &event_ics("b", "B", None));
        fixture.put(&work, "a.ics", &event_ics("a", "A", None));
        fixture.put(&work, "notes.txt", "not a calendar object");

        let mut txn = fixture.store().new_transaction();
        let home = txn.home_with_uid("U1", ExportType::Calendar, false).await.unwrap();
        let collection = txn.collection_with_name(&home, "work").await.unwrap().unwrap();
        let objects = txn.objects(&collection).await.unwrap();

        let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a.ics", "b.ics"]);
    }

    #[tokio::test]
    async fn test_home_uids_lists_one_kind() {
        let fixture = StoreFixture::new();
        fixture.calendar("U2", "cal");
        fixture.calendar("U1", "cal");
        fixture.addressbook("U3", "addressbook");

        let txn = fixture.store().new_transaction();

        assert_eq!(txn.home_uids(ExportType::Calendar).await.unwrap(), vec!["U1", "U2"]);
        assert_eq!(txn.home_uids(ExportType::AddressBook).await.unwrap(), vec!["U3"]);
    }

    #[tokio::test]
    async fn test_missing_home_without_create_is_an_error() {
        let fixture = StoreFixture::new();
        let mut txn = fixture.store().new_transaction();

        let result = txn.home_with_uid("ghost", ExportType::Calendar, false).await;

        assert!(matches!(result, Err(ExportError::HomeNotFound(uid)) if uid == "ghost"));
    }

    #[tokio::test]
    async fn test_created_home_is_provisioned_only_on_commit() {
        let fixture = StoreFixture::new();
        let home_dir = fixture.root().join("calendars/__uids__/new-user");

        {
            let mut txn = fixture.store().new_transaction();
            let home = txn.home_with_uid("new-user", ExportType::Calendar, true).await.unwrap();
            assert!(txn.collections(&home).await.unwrap().is_empty());
        }
        assert!(!home_dir.exists(), "Dropped transaction must not provision");

        let mut txn = fixture.store().new_transaction();
        txn.home_with_uid("new-user", ExportType::Calendar, true).await.unwrap();
        txn.commit().await.unwrap();

        assert!(home_dir.is_dir());
    }

    #[tokio::test]
    async fn test_uid_cannot_leave_the_home_root() {
        let fixture = StoreFixture::new();
        let store = FileStore::open(fixture.root().join("data"));
        let mut txn = store.new_transaction();

        for uid in ["../../escaped", "a/b", "a\\b", "..", ".hidden", ""] {
            let result = txn.home_with_uid(uid, ExportType::Calendar, true).await;
            assert!(
                matches!(&result, Err(ExportError::HomeNotFound(u)) if u == uid),
                "UID {:?} should be rejected",
                uid
            );
        }
        txn.commit().await.unwrap();

        assert!(!fixture.root().join("data/escaped").exists());
        assert!(!fixture.root().join("data/calendars").exists());
    }
}
