//! Scratch store layouts and iCalendar fixtures for tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::store::FileStore;

pub const CHICAGO_VTIMEZONE: &str = "BEGIN:VTIMEZONE\r\n\
TZID:America/Chicago\r\n\
BEGIN:STANDARD\r\n\
DTSTART:20071104T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=11;BYDAY=1SU\r\n\
TZOFFSETFROM:-0500\r\n\
TZOFFSETTO:-0600\r\n\
TZNAME:CST\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:20070311T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=2SU\r\n\
TZOFFSETFROM:-0600\r\n\
TZOFFSETTO:-0500\r\n\
TZNAME:CDT\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n";

/// A single-event calendar object; with a TZID it carries that zone's
/// VTIMEZONE (only America/Chicago has a real definition here).
pub fn event_ics(uid: &str, summary: &str, tzid: Option<&str>) -> String {
    let mut ics = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:TEST\r\n");
    match tzid {
        Some("America/Chicago") => ics.push_str(CHICAGO_VTIMEZONE),
        Some(other) => ics.push_str(&format!(
            "BEGIN:VTIMEZONE\r\nTZID:{}\r\nEND:VTIMEZONE\r\n",
            other
        )),
        None => {}
    }
    ics.push_str("BEGIN:VEVENT\r\n");
    ics.push_str(&format!("UID:{}\r\n", uid));
    ics.push_str("DTSTAMP:20250101T000000Z\r\n");
    match tzid {
        Some(tz) => {
            ics.push_str(&format!("DTSTART;TZID={}:20250320T150000\r\n", tz));
            ics.push_str(&format!("DTEND;TZID={}:20250320T160000\r\n", tz));
        }
        None => {
            ics.push_str("DTSTART:20250320T150000Z\r\n");
            ics.push_str("DTEND:20250320T160000Z\r\n");
        }
    }
    ics.push_str(&format!("SUMMARY:{}\r\n", summary));
    ics.push_str("END:VEVENT\r\nEND:VCALENDAR\r\n");
    ics
}

pub fn vcard(uid: &str, name: &str) -> String {
    format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:{}\r\nFN:{}\r\nN:{};;;;\r\nEND:VCARD\r\n",
        uid, name, name
    )
}

/// A temporary data root laid out like the file store expects.
pub struct StoreFixture {
    dir: TempDir,
}

impl StoreFixture {
    pub fn new() -> Self {
        StoreFixture {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn store(&self) -> FileStore {
        FileStore::open(self.root())
    }

    pub fn calendar(&self, uid: &str, name: &str) -> PathBuf {
        self.collection("calendars", uid, name)
    }

    pub fn addressbook(&self, uid: &str, name: &str) -> PathBuf {
        self.collection("addressbooks", uid, name)
    }

    fn collection(&self, kind: &str, uid: &str, name: &str) -> PathBuf {
        let path = self.root().join(kind).join("__uids__").join(uid).join(name);
        std::fs::create_dir_all(&path).expect("create collection dir");
        path
    }

    pub fn put(&self, collection: &Path, file_name: &str, content: &str) {
        std::fs::write(collection.join(file_name), content).expect("write object");
    }

    pub fn set_properties(
        &self,
        collection: &Path,
        display_name: Option<&str>,
        color: Option<&str>,
    ) {
        let mut content = String::new();
        if let Some(name) = display_name {
            content.push_str(&format!("displayname = {:?}\n", name));
        }
        if let Some(color) = color {
            content.push_str(&format!("color = {:?}\n", color));
        }
        std::fs::write(collection.join(".properties.toml"), content).expect("write properties");
    }
}
