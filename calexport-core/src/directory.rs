//! Directory service lookups (record type + short name -> home UID).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ExportError, ExportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    User,
    Group,
    Location,
    Resource,
    Address,
}

impl RecordType {
    /// Map the old plural record type names (`users`, `locations`, ...) used on
    /// the command line to a record type.
    pub fn from_old_name(name: &str) -> ExportResult<Self> {
        match name {
            "users" => Ok(RecordType::User),
            "groups" => Ok(RecordType::Group),
            "locations" => Ok(RecordType::Location),
            "resources" => Ok(RecordType::Resource),
            "addresses" => Ok(RecordType::Address),
            other => Err(ExportError::UnknownRecordType(other.to_string())),
        }
    }

    pub fn old_name(&self) -> &'static str {
        match self {
            RecordType::User => "users",
            RecordType::Group => "groups",
            RecordType::Location => "locations",
            RecordType::Resource => "resources",
            RecordType::Address => "addresses",
        }
    }
}

impl FromStr for RecordType {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_old_name(s)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.old_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryRecord {
    pub record_type: RecordType,
    pub uid: String,
    pub short_names: Vec<String>,
    pub full_name: Option<String>,
}

#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn record_with_short_name(
        &self,
        record_type: RecordType,
        short_name: &str,
    ) -> ExportResult<Option<DirectoryRecord>>;
}

#[derive(Debug, Default, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    records: Vec<DirectoryRecord>,
}

/// Directory backed by a TOML accounts file:
///
/// ```toml
/// [[records]]
/// record_type = "user"
/// uid = "10000000-0000-0000-0000-000000000001"
/// short_names = ["user01"]
/// full_name = "User 01"
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileDirectory {
    records: Vec<DirectoryRecord>,
}

impl FileDirectory {
    pub fn new(records: Vec<DirectoryRecord>) -> Self {
        FileDirectory { records }
    }

    /// Load the accounts file. A missing file gives an empty directory.
    pub async fn load(path: &Path) -> ExportResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no accounts file, directory is empty");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let file: AccountsFile = toml::from_str(&content)
            .map_err(|e| ExportError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(file.records))
    }

    pub fn parse(content: &str) -> ExportResult<Self> {
        let file: AccountsFile =
            toml::from_str(content).map_err(|e| ExportError::Config(e.to_string()))?;
        Ok(Self::new(file.records))
    }

    pub fn records(&self) -> &[DirectoryRecord] {
        &self.records
    }
}

#[async_trait]
impl DirectoryService for FileDirectory {
    async fn record_with_short_name(
        &self,
        record_type: RecordType,
        short_name: &str,
    ) -> ExportResult<Option<DirectoryRecord>> {
        Ok(self
            .records
            .iter()
            .find(|r| r.record_type == record_type && r.short_names.iter().any(|n| n == short_name))
            .cloned())
    }
}
