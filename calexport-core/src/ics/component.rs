//! Owned iCalendar component tree.
//!
//! Stored objects are parsed into these types so that sub-components can be
//! moved between calendars and edited (address rewriting, per-user merging)
//! before being written back out. Values of TEXT-typed properties are held
//! decoded (as the parser unescapes them) and re-escaped on output; every
//! other value is kept exactly as it appeared on the content line.

use std::collections::BTreeSet;

/// A property parameter such as `CN=Alice` or `TZID=America/Chicago`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcsParameter {
    pub name: String,
    pub value: Option<String>,
}

/// A content line: name, parameters and raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcsProperty {
    pub name: String,
    pub params: Vec<IcsParameter>,
    pub value: String,
}

impl IcsProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        IcsProperty {
            name: name.into(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    /// Value of the first parameter called `name` (case-insensitive).
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .and_then(|p| p.value.as_deref())
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push(IcsParameter {
            name: name.into(),
            value: Some(value.into()),
        });
    }

    pub fn remove_parameter(&mut self, name: &str) {
        self.params.retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

/// A `BEGIN:NAME` ... `END:NAME` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcsComponent {
    pub name: String,
    pub properties: Vec<IcsProperty>,
    pub components: Vec<IcsComponent>,
}

impl IcsComponent {
    pub fn new(name: impl Into<String>) -> Self {
        IcsComponent {
            name: name.into(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn property(&self, name: &str) -> Option<&IcsProperty> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn property_value(&self, name: &str) -> Option<&str> {
        self.property(name).map(|p| p.value.as_str())
    }

    pub fn properties_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a IcsProperty> {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn properties_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut IcsProperty> {
        self.properties
            .iter_mut()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn push_property(&mut self, property: IcsProperty) {
        self.properties.push(property);
    }

    pub fn remove_properties(&mut self, name: &str) {
        self.properties.retain(|p| !p.name.eq_ignore_ascii_case(name));
    }

    pub fn uid(&self) -> Option<&str> {
        self.property_value("UID")
    }

    pub fn recurrence_id(&self) -> Option<&str> {
        self.property_value("RECURRENCE-ID")
    }

    /// Every TZID parameter value used by this component or its children.
    pub fn referenced_tzids(&self) -> BTreeSet<String> {
        let mut tzids = BTreeSet::new();
        self.collect_tzids(&mut tzids);
        tzids
    }

    fn collect_tzids(&self, tzids: &mut BTreeSet<String>) {
        for prop in &self.properties {
            if let Some(tzid) = prop.parameter("TZID") {
                tzids.insert(tzid.to_string());
            }
        }
        for child in &self.components {
            child.collect_tzids(tzids);
        }
    }
}

/// The contents of a `VCALENDAR` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcsCalendar {
    pub properties: Vec<IcsProperty>,
    pub components: Vec<IcsComponent>,
}

impl IcsCalendar {
    /// Sub-components other than `VTIMEZONE`.
    pub fn subcomponents(&self) -> impl Iterator<Item = &IcsComponent> {
        self.components.iter().filter(|c| !c.is("VTIMEZONE"))
    }

    pub fn timezones(&self) -> impl Iterator<Item = &IcsComponent> {
        self.components.iter().filter(|c| c.is("VTIMEZONE"))
    }
}
