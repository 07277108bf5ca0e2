//! Export specifications: which homes and collections to export.

use std::fmt;

/// What kind of collections an export reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportType {
    #[default]
    Calendar,
    AddressBook,
}

impl ExportType {
    /// File extension of stored objects and exported files.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportType::Calendar => "ics",
            ExportType::AddressBook => "vcf",
        }
    }

    /// Top-level directory name of this kind of home in the store.
    pub fn home_root(&self) -> &'static str {
        match self {
            ExportType::Calendar => "calendars",
            ExportType::AddressBook => "addressbooks",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExportType::Calendar => write!(f, "calendars"),
            ExportType::AddressBook => write!(f, "contacts"),
        }
    }
}

/// How an exporter finds the UID of the home it exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeSource {
    Uid(String),
    DirectoryRecord {
        record_type: String,
        short_name: String,
    },
    AllHomes,
}

/// One exporter: a home source, the kind of collections to read and an
/// optional list of collection names (empty means all of them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpec {
    pub source: HomeSource,
    pub export_type: ExportType,
    pub collections: Vec<String>,
}

impl ExportSpec {
    pub fn new(source: HomeSource, export_type: ExportType) -> Self {
        ExportSpec {
            source,
            export_type,
            collections: Vec::new(),
        }
    }

    pub fn uid(uid: &str) -> Self {
        Self::new(HomeSource::Uid(uid.to_string()), ExportType::Calendar)
    }

    pub fn record(record_type: &str, short_name: &str) -> Self {
        Self::new(
            HomeSource::DirectoryRecord {
                record_type: record_type.to_string(),
                short_name: short_name.to_string(),
            },
            ExportType::Calendar,
        )
    }

    /// Parse a `recordType:shortName` pair. The short name may itself contain colons.
    pub fn from_record_name(record_name: &str) -> Option<Self> {
        let (record_type, short_name) = record_name.split_once(':')?;
        if record_type.is_empty() || short_name.is_empty() {
            return None;
        }
        Some(Self::record(record_type, short_name))
    }

    pub fn all_homes(export_type: ExportType) -> Self {
        Self::new(HomeSource::AllHomes, export_type)
    }

    pub fn of_type(mut self, export_type: ExportType) -> Self {
        self.export_type = export_type;
        self
    }

    pub fn with_collection(mut self, name: &str) -> Self {
        self.collections.push(name.to_string());
        self
    }
}
