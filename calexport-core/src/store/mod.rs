//! Read access to the calendar server's data store.
//!
//! The export never talks to the server; it opens one transaction against
//! the store, lists homes, collections and objects through it, and commits
//! it at the end.

mod file;

pub use file::{FileStore, FileTransaction};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ExportResult;
use crate::exporter::ExportType;
use crate::ics::{IcsCalendar, parse_calendar, peruser};

/// A user's or resource's top-level calendar or address book container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Home {
    pub owner_uid: String,
    pub kind: ExportType,
}

/// Metadata properties of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CollectionProperties {
    #[serde(rename = "displayname")]
    pub display_name: Option<String>,
    pub color: Option<String>,
}

/// A named calendar or address book within a home.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub owner_uid: String,
    pub name: String,
    pub kind: ExportType,
    pub properties: CollectionProperties,
}

impl Collection {
    /// `{ownerUID}_{collectionName}`, used to name per-collection output files.
    pub fn label(&self) -> String {
        format!("{}_{}", self.owner_uid, self.name)
    }

    /// Canonical server path of a calendar collection.
    pub fn source_path(&self) -> String {
        format!("/calendars/__uids__/{}/{}/", self.owner_uid, self.name)
    }
}

/// One calendar object or vCard resource in a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub text: String,
}

impl StoredObject {
    /// The stored component with nothing filtered.
    pub fn component(&self) -> ExportResult<IcsCalendar> {
        parse_calendar(&self.text)
    }

    /// The component as `owner_uid` sees it.
    ///
    /// With `only_owner_props` the owner's per-user data is merged in and every
    /// per-user block is stripped; without it the stored component is returned as-is.
    pub fn filtered_component(
        &self,
        owner_uid: &str,
        only_owner_props: bool,
    ) -> ExportResult<IcsCalendar> {
        let mut calendar = self.component()?;
        if only_owner_props {
            peruser::filter_for_owner(&mut calendar, owner_uid);
        }
        Ok(calendar)
    }
}

/// A read transaction against the store.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Look up a home, provisioning it on commit when `create` is set.
    async fn home_with_uid(
        &mut self,
        uid: &str,
        kind: ExportType,
        create: bool,
    ) -> ExportResult<Home>;

    /// Owner UIDs of every home of the given kind, sorted.
    async fn home_uids(&self, kind: ExportType) -> ExportResult<Vec<String>>;

    /// Every collection in a home, sorted by name.
    async fn collections(&self, home: &Home) -> ExportResult<Vec<Collection>>;

    async fn collection_with_name(
        &self,
        home: &Home,
        name: &str,
    ) -> ExportResult<Option<Collection>>;

    /// Objects of a collection, sorted by resource name.
    async fn objects(&self, collection: &Collection) -> ExportResult<Vec<StoredObject>>;

    async fn commit(&mut self) -> ExportResult<()>;
}
