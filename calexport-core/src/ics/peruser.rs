//! Per-user data filtering.
//!
//! The server stores each sharee's private bits of an event (alarms,
//! transparency) in `X-CALENDARSERVER-PERUSER-DATA` blocks next to the shared
//! components. Exporting "as the owner sees it" means folding the owner's
//! block back into the matching instances and dropping everyone else's.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::ics::component::{IcsCalendar, IcsComponent};

pub const PERUSER_COMPONENT: &str = "X-CALENDARSERVER-PERUSER-DATA";
pub const PERINSTANCE_COMPONENT: &str = "X-CALENDARSERVER-PERINSTANCE";
pub const PERUSER_UID: &str = "X-CALENDARSERVER-PERUSER-UID";

/// Merge `owner_uid`'s per-user data into the calendar and strip all per-user blocks.
pub fn filter_for_owner(calendar: &mut IcsCalendar, owner_uid: &str) {
    let (peruser, mut components): (Vec<IcsComponent>, Vec<IcsComponent>) = calendar
        .components
        .drain(..)
        .partition(|c| c.is(PERUSER_COMPONENT));

    for block in peruser
        .into_iter()
        .filter(|b| b.property_value(PERUSER_UID) == Some(owner_uid))
    {
        for instance in block
            .components
            .into_iter()
            .filter(|c| c.is(PERINSTANCE_COMPONENT))
        {
            let key = InstanceKey::of(&instance);
            let target = components
                .iter_mut()
                .find(|c| !c.is("VTIMEZONE") && InstanceKey::of(c) == key);

            match target {
                Some(target) => merge_instance(target, instance),
                None => tracing::debug!(
                    recurrence_id = instance.recurrence_id().unwrap_or("master"),
                    "dropping per-user data for missing instance"
                ),
            }
        }
    }

    calendar.components = components;
}

/// Identifies which instance of a recurring component a block applies to.
///
/// Date-times that name a zone (or are UTC) compare by the instant they
/// denote, so `20250327T150000Z` and `TZID=America/Chicago:20250327T100000`
/// match. Dates, floating times and unknown zones compare literally.
#[derive(Debug, PartialEq, Eq)]
enum InstanceKey<'a> {
    Master,
    Instant(DateTime<Utc>),
    Literal(&'a str),
}

impl<'a> InstanceKey<'a> {
    fn of(component: &'a IcsComponent) -> Self {
        let Some(prop) = component.property("RECURRENCE-ID") else {
            return InstanceKey::Master;
        };
        let value = prop.value.trim();
        instant(value, prop.parameter("TZID"))
            .map(InstanceKey::Instant)
            .unwrap_or(InstanceKey::Literal(value))
    }
}

fn instant(value: &str, tzid: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(utc) = value.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
            .ok()
            .map(|dt| dt.and_utc());
    }
    let tz: chrono_tz::Tz = tzid?.parse().ok()?;
    let local = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn merge_instance(target: &mut IcsComponent, instance: IcsComponent) {
    for prop in instance.properties {
        if prop.name.eq_ignore_ascii_case("RECURRENCE-ID") {
            continue;
        }
        target.remove_properties(&prop.name);
        target.push_property(prop);
    }
    target.components.extend(instance.components);
}
