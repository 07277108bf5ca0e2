//! Merging collection contents into exportable documents.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ExportError, ExportResult};
use crate::exporter::ExportType;
use crate::ics::{
    IcsCalendar, IcsComponent, IcsProperty, PRODID, convert_cuas_to_mailto, escape_text,
    write_component, write_line, write_property,
};
use crate::store::{Collection, StoredObject, Transaction};

/// A VCALENDAR being assembled from many stored objects.
///
/// Timezone definitions are never copied in with the components. They are
/// collected into a table and the ones actually referenced are emitted once
/// when the calendar is serialized.
#[derive(Debug, Clone, Default)]
pub struct MergedCalendar {
    properties: Vec<IcsProperty>,
    components: Vec<IcsComponent>,
    timezones: BTreeMap<String, IcsComponent>,
}

impl MergedCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_property(&mut self, property: IcsProperty) {
        self.properties.push(property);
    }

    pub fn properties(&self) -> &[IcsProperty] {
        &self.properties
    }

    pub fn components(&self) -> &[IcsComponent] {
        &self.components
    }

    pub fn add_component(&mut self, component: IcsComponent) {
        self.components.push(component);
    }

    /// Remember a VTIMEZONE definition. The first definition of a TZID wins.
    pub fn add_timezone(&mut self, timezone: IcsComponent) {
        let Some(tzid) = timezone.property_value("TZID").map(str::to_string) else {
            tracing::warn!("ignoring VTIMEZONE without TZID");
            return;
        };
        self.timezones.entry(tzid).or_insert(timezone);
    }

    /// Add the contents of one stored object: its timezones go to the
    /// table, everything else is (optionally rewritten and) appended.
    pub fn add_object(&mut self, calendar: IcsCalendar, convert_to_mailto: bool) {
        for mut component in calendar.components {
            if component.is("VTIMEZONE") {
                self.add_timezone(component);
                continue;
            }
            if convert_to_mailto {
                convert_cuas_to_mailto(&mut component);
            }
            self.add_component(component);
        }
    }

    /// Known timezone definitions referenced by the added components, by TZID.
    pub fn referenced_timezones(&self) -> Vec<&IcsComponent> {
        let mut referenced = BTreeSet::new();
        for component in &self.components {
            referenced.extend(component.referenced_tzids());
        }

        referenced
            .iter()
            .filter_map(|tzid| {
                let timezone = self.timezones.get(tzid);
                if timezone.is_none() {
                    tracing::warn!(tzid = %tzid, "no VTIMEZONE definition available");
                }
                timezone
            })
            .collect()
    }

    /// Serialize as a VCALENDAR with the referenced timezones embedded.
    pub fn to_ics(&self) -> String {
        let mut out = String::new();
        write_line(&mut out, "BEGIN:VCALENDAR");
        write_line(&mut out, "VERSION:2.0");
        write_line(&mut out, &format!("PRODID:{}", PRODID));
        for prop in &self.properties {
            write_property(&mut out, prop);
        }
        for timezone in self.referenced_timezones() {
            write_component(&mut out, timezone);
        }
        for component in &self.components {
            write_component(&mut out, component);
        }
        write_line(&mut out, "END:VCALENDAR");
        out
    }
}

/// One output target of a per-collection export.
#[derive(Debug, Clone)]
pub enum ExportDocument {
    Calendar {
        label: String,
        calendar: MergedCalendar,
    },
    AddressBook {
        label: String,
        cards: Vec<String>,
    },
}

impl ExportDocument {
    pub fn label(&self) -> &str {
        match self {
            ExportDocument::Calendar { label, .. } | ExportDocument::AddressBook { label, .. } => {
                label
            }
        }
    }

    pub fn kind(&self) -> ExportType {
        match self {
            ExportDocument::Calendar { .. } => ExportType::Calendar,
            ExportDocument::AddressBook { .. } => ExportType::AddressBook,
        }
    }

    /// `{label}.ics` or `{label}.vcf`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.label(), self.kind().extension())
    }

    /// Number of components or cards in the document.
    pub fn len(&self) -> usize {
        match self {
            ExportDocument::Calendar { calendar, .. } => calendar.components().len(),
            ExportDocument::AddressBook { cards, .. } => cards.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_text(&self) -> String {
        match self {
            ExportDocument::Calendar { calendar, .. } => calendar.to_ics(),
            ExportDocument::AddressBook { cards, .. } => cards.concat(),
        }
    }
}

/// Merge every collection into one calendar, in order.
pub async fn merge_into_single<T>(
    txn: &T,
    collections: &[Collection],
    convert_to_mailto: bool,
) -> ExportResult<MergedCalendar>
where
    T: Transaction + ?Sized,
{
    let mut merged = MergedCalendar::new();
    for collection in collections {
        if collection.kind == ExportType::AddressBook {
            return Err(ExportError::ContactsRequireDirectory);
        }
        add_calendar_objects(&mut merged, txn, collection, convert_to_mailto).await?;
    }
    Ok(merged)
}

/// Build one document per collection.
pub async fn merge_per_collection<T>(
    txn: &T,
    collections: &[Collection],
    convert_to_mailto: bool,
) -> ExportResult<Vec<ExportDocument>>
where
    T: Transaction + ?Sized,
{
    let mut documents = Vec::with_capacity(collections.len());

    for collection in collections {
        let label = collection.label();

        let document = match collection.kind {
            ExportType::Calendar => {
                let mut calendar = MergedCalendar::new();
                add_collection_properties(&mut calendar, collection);
                add_calendar_objects(&mut calendar, txn, collection, convert_to_mailto).await?;
                ExportDocument::Calendar { label, calendar }
            }
            ExportType::AddressBook => {
                let objects = txn.objects(collection).await?;
                tracing::debug!(collection = %label, cards = objects.len(), "collecting cards");
                let cards = objects.into_iter().map(card_text).collect();
                ExportDocument::AddressBook { label, cards }
            }
        };

        documents.push(document);
    }

    Ok(documents)
}

fn add_collection_properties(calendar: &mut MergedCalendar, collection: &Collection) {
    let props = &collection.properties;
    for (name, value) in [("NAME", &props.display_name), ("COLOR", &props.color)] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            // NAME and COLOR are not decoded by the parser, so they are held in wire form
            calendar.add_property(IcsProperty::new(name, escape_text(value)));
        }
    }
    calendar.add_property(IcsProperty::new("SOURCE", collection.source_path()));
}

async fn add_calendar_objects<T>(
    calendar: &mut MergedCalendar,
    txn: &T,
    collection: &Collection,
    convert_to_mailto: bool,
) -> ExportResult<()>
where
    T: Transaction + ?Sized,
{
    let objects = txn.objects(collection).await?;
    tracing::debug!(collection = %collection.label(), objects = objects.len(), "merging calendar");

    for object in &objects {
        let component = object
            .filtered_component(&collection.owner_uid, true)
            .map_err(|e| match e {
                ExportError::IcsParse(msg) => ExportError::IcsParse(format!(
                    "{} in {}: {}",
                    object.name,
                    collection.label(),
                    msg
                )),
                other => other,
            })?;
        calendar.add_object(component, convert_to_mailto);
    }
    Ok(())
}

fn card_text(object: StoredObject) -> String {
    let mut text = object.text;
    if !text.ends_with('\n') {
        text.push_str("\r\n");
    }
    text
}
