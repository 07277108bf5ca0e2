//! Calendar user address (CUA) handling.

use crate::ics::component::{IcsComponent, IcsProperty};

const SCHEME_PREFIXES: [&str; 3] = ["mailto:", "urn:uuid:", "urn:x-uid:"];

/// Normalize a calendar user address for comparison.
///
/// Surrounding whitespace is trimmed and well-known scheme prefixes are
/// lowercased. Paths and other forms are returned as-is.
pub fn normalize_cu_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with('/') {
        return addr.to_string();
    }

    for prefix in SCHEME_PREFIXES {
        let has_prefix = addr
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
        if has_prefix {
            return format!("{}{}", prefix, &addr[prefix.len()..]);
        }
    }

    addr.to_string()
}

/// Replace non-mailto: ATTENDEE and ORGANIZER values with `mailto:` ones
/// where an `EMAIL` parameter says what the address is.
///
/// Addresses already in mailto: form are left alone, so applying this twice
/// is the same as applying it once.
pub fn convert_cuas_to_mailto(component: &mut IcsComponent) {
    for prop in component.properties.iter_mut() {
        if prop.name.eq_ignore_ascii_case("ATTENDEE")
            || prop.name.eq_ignore_ascii_case("ORGANIZER")
        {
            convert_property(prop);
        }
    }
}

fn convert_property(prop: &mut IcsProperty) {
    if normalize_cu_addr(&prop.value).starts_with("mailto:") {
        return;
    }

    let Some(email) = prop.parameter("EMAIL").filter(|e| !e.is_empty()) else {
        return;
    };

    let value = format!("mailto:{}", email);
    prop.set_value(value);
    prop.remove_parameter("EMAIL");
}
