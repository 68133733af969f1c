//! Scheme display names are guessed from what the archive gives us, in a
//! fixed fallback order: exact transport match, well-known transport alias,
//! the owning line's display name, well-known root types, identity.

use std::collections::BTreeMap;

use crate::ids::{TextId, TextIndexTable};

pub const ROOT_SCHEME_TYPE: &str = "ROOT";
pub const DEFAULT_SCHEME_TYPE: &str = "OTHER";

// Scheme file stems that are just renamed transports.
const WELL_KNOWN_SCHEME_TRANSPORTS: [(&str, &str); 3] = [
    ("railway", "trains"),
    ("tramways", "trams"),
    ("rechnoytramvay", "tramsriver"),
];

// Root scheme stems with conventional display names.
const WELL_KNOWN_ROOT_SCHEME_TYPES: [(&str, &str); 8] = [
    ("metro", "Метро"),
    ("railway", "Электричка"),
    ("trains", "Электричка"),
    ("tramways", "Трамвай"),
    ("trams", "Трамвай"),
    ("trolleys", "Троллейбус"),
    ("tramsriver", "Речной Трамвай"),
    ("rechnoytramvay", "Речной Трамвай"),
];

/// `transport_index`: transport name -> its type name.
/// `scheme_index`: owning-scheme stem -> (line display text, parent
/// transport's type name).
pub fn suggest_scheme_display_name_and_type(
    name: &str,
    transport_index: &BTreeMap<String, String>,
    scheme_index: &BTreeMap<String, (TextId, String)>,
    texts: &TextIndexTable,
) -> (String, String) {
    if let Some(type_name) = transport_index.get(name) {
        return (type_name.clone(), ROOT_SCHEME_TYPE.to_string());
    }

    if let Some((_, suggested)) = WELL_KNOWN_SCHEME_TRANSPORTS
        .iter()
        .find(|(alias, _)| *alias == name)
    {
        if let Some(type_name) = transport_index.get(*suggested) {
            return (type_name.clone(), ROOT_SCHEME_TYPE.to_string());
        }
    }

    if let Some((line_text_id, parent_type)) = scheme_index.get(name) {
        if let Some(display) = texts.get_text(*line_text_id) {
            return (display.to_string(), parent_type.clone());
        }
    }

    if let Some((_, display)) = WELL_KNOWN_ROOT_SCHEME_TYPES
        .iter()
        .find(|(stem, _)| *stem == name)
    {
        return (display.to_string(), ROOT_SCHEME_TYPE.to_string());
    }

    (name.to_string(), DEFAULT_SCHEME_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_order() {
        let mut texts = TextIndexTable::new();
        let line_text = texts.as_text_id("Filyovskaya line");

        let mut transport_index = BTreeMap::new();
        transport_index.insert("metro".to_string(), "Метро".to_string());
        transport_index.insert("trams".to_string(), "Трамвай".to_string());

        let mut scheme_index = BTreeMap::new();
        scheme_index.insert(
            "filevskaja".to_string(),
            (line_text, "Метро".to_string()),
        );

        // Exact transport name.
        assert_eq!(
            suggest_scheme_display_name_and_type("metro", &transport_index, &scheme_index, &texts),
            ("Метро".to_string(), ROOT_SCHEME_TYPE.to_string())
        );
        // Alias table pointing at an existing transport.
        assert_eq!(
            suggest_scheme_display_name_and_type(
                "tramways",
                &transport_index,
                &scheme_index,
                &texts
            ),
            ("Трамвай".to_string(), ROOT_SCHEME_TYPE.to_string())
        );
        // Owning line.
        assert_eq!(
            suggest_scheme_display_name_and_type(
                "filevskaja",
                &transport_index,
                &scheme_index,
                &texts
            ),
            ("Filyovskaya line".to_string(), "Метро".to_string())
        );
        // Well-known root type without a matching transport.
        assert_eq!(
            suggest_scheme_display_name_and_type(
                "trolleys",
                &transport_index,
                &scheme_index,
                &texts
            ),
            ("Троллейбус".to_string(), ROOT_SCHEME_TYPE.to_string())
        );
        // Identity fallback.
        assert_eq!(
            suggest_scheme_display_name_and_type(
                "mystery",
                &transport_index,
                &scheme_index,
                &texts
            ),
            ("mystery".to_string(), DEFAULT_SCHEME_TYPE.to_string())
        );
    }
}
