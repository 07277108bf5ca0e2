//! ICS parsing, editing and generation.
//!
//! This module handles reading and writing .ics content according to RFC 5545.

mod address;
mod component;
mod generate;
mod parse;
pub mod peruser;

pub use address::{convert_cuas_to_mailto, normalize_cu_addr};
pub use component::{IcsCalendar, IcsComponent, IcsParameter, IcsProperty};
pub use generate::{PRODID, escape_text, write_component, write_line, write_property};
pub use parse::parse_calendar;
