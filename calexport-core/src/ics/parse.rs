//! ICS parsing using the icalendar crate's parser.

use crate::error::{ExportError, ExportResult};
use crate::ics::component::{IcsCalendar, IcsComponent, IcsParameter, IcsProperty};
use icalendar::parser::{Component, Property, read_calendar, unfold};

/// Parse ICS content into an owned component tree.
pub fn parse_calendar(content: &str) -> ExportResult<IcsCalendar> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| ExportError::IcsParse(e.to_string()))?;

    Ok(IcsCalendar {
        properties: Vec::new(),
        components: calendar.components.iter().map(to_component).collect(),
    })
}

fn to_component(component: &Component) -> IcsComponent {
    IcsComponent {
        name: component.name.to_string(),
        properties: component.properties.iter().map(to_property).collect(),
        components: component.components.iter().map(to_component).collect(),
    }
}

fn to_property(prop: &Property) -> IcsProperty {
    IcsProperty {
        name: prop.name.to_string(),
        params: prop
            .params
            .iter()
            .map(|p| IcsParameter {
                name: p.key.to_string(),
                value: p.val.as_ref().map(|v| v.to_string()),
            })
            .collect(),
        value: prop.val.to_string(),
    }
}
