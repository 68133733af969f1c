//! Imports an extracted PMZ map folder into a normalized [`MapContainer`]
//! and serializes it for the map-viewing client. One import run is one
//! folder, processed start to finish with fresh state; a structural problem
//! (missing mandatory file, unresolvable station reference, undecodable
//! text) aborts the whole run.

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod archive;
mod delays;
mod files;
mod ids;
mod images;
mod metadata;
mod naming;
mod resources;
mod schemes;
mod serialize;
mod transports;

use std::path::Path;

use anyhow::Result;
use thiserror::Error;

pub use archive::extract_pmz;
pub use delays::DelayScheme;
pub use ids::{StationId, StationIndex, TextId, TextIndexTable};
pub use images::StationImage;
pub use metadata::{Metadata, SchemeMeta, TransportMeta};
pub use resources::convert_resources;
pub use schemes::{Scheme, SchemeImporter, SchemeLine, SchemeSegment, SchemeStation, SchemeTransfer};
pub use serialize::{store_model, TextTable};
pub use transports::{Line, LineSegment, LineStation, Transfer, Transport, TransportImporter};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("required file {0} not found")]
    MissingFile(String),
    #[error("unresolved pending station references: {0}")]
    PendingStations(String),
}

/// What the geocoding service resolves a city to. The lookup itself lives
/// outside this crate; the importer only consumes the answer.
pub struct CityInfo {
    pub geoname_id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

pub trait GeonameProvider {
    fn resolve_city(&self, city_name: &str, country_name: &str) -> Option<CityInfo>;
}

#[derive(Debug)]
pub struct MapContainer {
    pub meta: Metadata,
    pub transports: Vec<Transport>,
    pub schemes: Vec<Scheme>,
    pub images: Vec<StationImage>,
    pub texts: Vec<TextTable>,
}

/// Imports one extracted map folder. `archive_file_name` is the name of the
/// archive this folder came from (it keys the transport-type table);
/// `timestamp` is the archive's publication stamp, stored verbatim.
pub fn import_map(
    path: &Path,
    archive_file_name: &str,
    timestamp: i64,
    geonames: &dyn GeonameProvider,
) -> Result<MapContainer> {
    let mut station_index = StationIndex::new();
    let mut texts = TextIndexTable::new();

    let mut transport_importer =
        TransportImporter::new(archive_file_name, &mut station_index, &mut texts)?;
    let transports = transport_importer.import_transports(path)?;
    station_index.ensure_no_pending_stations()?;

    let mut scheme_importer = SchemeImporter::new(&transports, &mut station_index, &mut texts);
    let schemes = scheme_importer.import_schemes(path)?;

    let city = metadata::read_city_options(path)?;
    let city_info = geonames.resolve_city(&city.city_name, &city.country_name);
    if city_info.is_none() {
        warn!(
            "City '{}' ({}) not found by the geoname lookup",
            city.city_name, city.country_name
        );
    }

    let description = match (&city.comments, &city.authors) {
        (None, None) => None,
        (comments, authors) => {
            let joined: Vec<&str> = comments
                .iter()
                .chain(authors.iter())
                .map(|s| s.as_str())
                .collect();
            Some(joined.join("\n"))
        }
    };

    let delay_schemes = delays::classify_delay_names(&city.delay_names, &mut texts);

    let mut container = MapContainer {
        meta: Metadata {
            map_id: archive_file_name.to_string(),
            file: archive_file_name.to_string(),
            timestamp,
            geoname_id: city_info.as_ref().map(|c| c.geoname_id),
            latitude: city_info.as_ref().map(|c| c.latitude).unwrap_or(0.0),
            longitude: city_info.as_ref().map(|c| c.longitude).unwrap_or(0.0),
            description_text_id: description.map(|d| texts.as_common_text_id(&d)),
            comments_text_id: Some(texts.as_common_text_id("Imported from http://pmetro.su")),
            delays: delay_schemes,
            transport_types: metadata::transport_types(&transports),
            transports: metadata::transport_meta(&transports),
            schemes: metadata::scheme_meta(&transports, &schemes),
            locales: Vec::new(),
            default_locale: None,
        },
        transports,
        schemes,
        images: images::load_static_images(path)?,
        texts: Vec::new(),
    };

    let valid = validate_line_delays(&mut container);

    container.texts = build_text_tables(&texts);
    container.meta.locales = container.texts.iter().map(|t| t.locale.clone()).collect();
    container.meta.default_locale = container.meta.locales.first().cloned();

    info!(
        "Map loaded, texts: {}, text size: {}, valid: {}",
        texts.text_count(),
        texts.total_text_length(),
        valid
    );
    Ok(container)
}

/// The whole conversion: import, convert referenced assets, write the JSON
/// file set.
pub fn convert_map(
    src: &Path,
    dst: &Path,
    archive_file_name: &str,
    timestamp: i64,
    geonames: &dyn GeonameProvider,
) -> Result<()> {
    info!("Begin processing {}", src.display());
    let mut container = import_map(src, archive_file_name, timestamp, geonames)?;
    convert_resources(&mut container, src, dst)?;
    store_model(&container, dst)
}

/// Every line's delay table must line up with the map's declared delay
/// slots: short tables zero-pad, long ones are reported.
fn validate_line_delays(container: &mut MapContainer) -> bool {
    let slot_count = container.meta.delays.len();
    let mut valid = true;
    for transport in &mut container.transports {
        for line in &mut transport.lines {
            if line.delays.is_empty() || line.delays.len() == slot_count {
                continue;
            }
            valid = false;
            if line.delays.len() < slot_count {
                let mut next = 0;
                while line.delays.len() < slot_count {
                    let key = next.to_string();
                    next += 1;
                    if !line.delays.contains_key(&key) {
                        line.delays.insert(key, 0.0);
                    }
                }
            } else {
                error!(
                    "Delays in line '{}' of {}.trp do not fit the map delay list ({} slots)",
                    line.name, transport.name, slot_count
                );
            }
        }
    }
    valid
}

fn build_text_tables(texts: &TextIndexTable) -> Vec<TextTable> {
    let entries: Vec<(TextId, String)> = texts
        .entries()
        .iter()
        .map(|(id, text, _)| (*id, text.clone()))
        .collect();
    if entries.is_empty() {
        return Vec::new();
    }

    // A crude language sniff over the localizable texts is enough to tag the
    // table; proper localization happens downstream.
    let sample: String = texts
        .entries()
        .iter()
        .filter(|(_, _, common)| !common)
        .map(|(_, text, _)| text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let locale = detect_locale(&sample);

    vec![TextTable {
        locale: locale.to_string(),
        texts: entries,
    }]
}

fn detect_locale(sample: &str) -> &'static str {
    let total = sample.chars().filter(|c| c.is_alphabetic()).count();
    if total == 0 {
        return "en";
    }
    let cyrillic = sample
        .chars()
        .filter(|c| ('\u{0400}'..='\u{04FF}').contains(c))
        .count();
    if cyrillic * 3 > total {
        "ru"
    } else {
        "en"
    }
}
