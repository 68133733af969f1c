//! Imports `.trp` files into the line/station/segment topology. `Metro.trp`
//! is mandatory and goes first; its name establishes the default transport.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use pmz::ini::IniFile;
use pmz::stations::parse_stations_and_delays;
use pmz::values::{as_delay, as_delay_list, as_dict, as_quoted_list, un_bugger_for_float};

use crate::files::{file_stem_lowercase, find_files_by_extension, reference_stem};
use crate::ids::{StationId, StationIndex, TextId, TextIndexTable};
use crate::ImportError;

const DEFAULT_TRANSPORT_TYPE: &str = "Metro";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transport {
    pub name: String,
    pub type_name: String,
    pub lines: Vec<Line>,
    pub transfers: Vec<Transfer>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Line {
    pub name: String,
    pub text_id: TextId,
    /// Stem of the scheme file this line is drawn on, if any.
    pub scheme: Option<String>,
    pub stations: Vec<LineStation>,
    pub segments: Vec<LineSegment>,
    /// Travel-time tables keyed by delay slot (`"0"`, `"1"`, ... or a name
    /// like `Day`), in seconds.
    pub delays: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineStation {
    pub id: StationId,
    pub name: String,
    pub text_id: TextId,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LineSegment {
    pub from: StationId,
    pub to: StationId,
    pub delay: Option<f64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Transfer {
    pub from: StationId,
    pub to: StationId,
    pub delay: Option<f64>,
    pub is_visible: bool,
}

/// The bundled transport-type table, loaded once at importer construction.
/// Keys are `"<archive file name>.<trp stem>"`, both lowercased.
pub struct TransportTypes {
    types: BTreeMap<String, String>,
}

const TRANSPORT_TYPES_CSV: &str = include_str!("assets/transports.csv");

impl TransportTypes {
    pub fn load() -> Result<Self> {
        let mut types = BTreeMap::new();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(TRANSPORT_TYPES_CSV.as_bytes());
        for record in reader.deserialize() {
            let (map_file, trp_name, trp_type): (String, String, String) = record?;
            types.insert(
                format!(
                    "{}.zip.{}",
                    map_file.trim().to_lowercase(),
                    trp_name.trim().to_lowercase()
                ),
                trp_type.trim().to_string(),
            );
        }
        Ok(Self { types })
    }

    fn classify(&self, archive_file_name: &str, trp_name: &str, ini: &IniFile) -> String {
        if let Some(explicit) = ini.attr("Options", "Type") {
            return explicit.to_string();
        }
        let key = format!(
            "{}.{}",
            archive_file_name.to_lowercase(),
            trp_name.to_lowercase()
        );
        match self.types.get(&key) {
            Some(t) => t.clone(),
            None => {
                error!(
                    "Unknown transport type for '{}.trp' in '{}', used default",
                    trp_name, archive_file_name
                );
                DEFAULT_TRANSPORT_TYPE.to_string()
            }
        }
    }
}

pub struct TransportImporter<'a> {
    archive_file_name: &'a str,
    types: TransportTypes,
    station_index: &'a mut StationIndex,
    texts: &'a mut TextIndexTable,
}

impl<'a> TransportImporter<'a> {
    pub fn new(
        archive_file_name: &'a str,
        station_index: &'a mut StationIndex,
        texts: &'a mut TextIndexTable,
    ) -> Result<Self> {
        Ok(Self {
            archive_file_name,
            types: TransportTypes::load()?,
            station_index,
            texts,
        })
    }

    pub fn import_transports(&mut self, path: &Path) -> Result<Vec<Transport>> {
        let files = find_files_by_extension(path, "trp")?;
        let default_file = files
            .iter()
            .find(|f| f.file_name().and_then(|n| n.to_str()) == Some("Metro.trp"))
            .cloned()
            .ok_or_else(|| ImportError::MissingFile(format!("Metro.trp in {}", path.display())))?;

        let mut transports = vec![self.import_transport(&default_file)?];
        for file in files.iter().filter(|f| **f != default_file) {
            transports.push(self.import_transport(file)?);
        }
        Ok(transports)
    }

    fn import_transport(&mut self, file: &Path) -> Result<Transport> {
        let ini = IniFile::read(file)?;
        let name = file_stem_lowercase(file);
        let type_name = self.types.classify(self.archive_file_name, &name, &ini);
        let lines = self.import_lines(&ini)?;
        let transfers = self.import_transfers(&ini);
        Ok(Transport {
            name,
            type_name,
            lines,
            transfers,
        })
    }

    fn import_lines(&mut self, ini: &IniFile) -> Result<Vec<Line>> {
        let mut section_names = ini.sections_with_prefix("Line");
        section_names.sort();

        let mut lines = Vec::new();
        for section in section_names {
            let name = match ini.attr(section, "Name") {
                Some(n) => n.to_string(),
                None => {
                    warn!(
                        "Section [{}] of {} has no Name, skipped",
                        section,
                        ini.path().display()
                    );
                    continue;
                }
            };
            let display_name = ini.attr_or(section, "Alias", &name);
            let scheme = ini.attr(section, "LineMap").map(reference_stem);
            let stations_text = ini.attr_or(section, "Stations", "");
            let driving_text = ini.attr_or(section, "Driving", "");
            let aliases = as_dict(&ini.attr_or(section, "Aliases", ""));
            let delays = parse_line_delays(&name, &ini.attr_collection(section, "Delay"));

            let (parsed_stations, parsed_segments) =
                parse_stations_and_delays(&stations_text, &driving_text);

            let mut stations = Vec::new();
            for parsed in &parsed_stations {
                let id = self.station_index.register_station(&name, &parsed.name)?;
                let display = aliases
                    .get(&parsed.display_name)
                    .cloned()
                    .unwrap_or_else(|| parsed.display_name.clone());
                stations.push(LineStation {
                    id,
                    name: parsed.name.clone(),
                    text_id: self.texts.as_text_id(&display),
                });
            }

            let segments = parsed_segments
                .iter()
                .map(|s| LineSegment {
                    from: stations[s.from].id,
                    to: stations[s.to].id,
                    delay: s.delay,
                })
                .collect();

            lines.push(Line {
                text_id: self.texts.as_text_id(&display_name),
                name,
                scheme,
                stations,
                segments,
                delays,
            });
        }
        Ok(lines)
    }

    fn import_transfers(&mut self, ini: &IniFile) -> Vec<Transfer> {
        let Some(section) = ini.section("Transfers") else {
            return Vec::new();
        };

        let mut transfers = Vec::new();
        for (key, value) in section.iter() {
            if key.starts_with("__") {
                continue;
            }
            let params = as_quoted_list(value);
            if params.len() < 4 {
                warn!(
                    "Transfer '{}' in {} has too few fields, skipped",
                    key,
                    ini.path().display()
                );
                continue;
            }
            let from = self.station_index.get_station_id(&params[0], &params[1]);
            let to = self.station_index.get_station_id(&params[2], &params[3]);
            let delay = params
                .get(4)
                .and_then(|raw| as_delay(&un_bugger_for_float(raw)));
            let is_visible = params
                .get(5)
                .map(|flag| flag.trim() != "invisible")
                .unwrap_or(true);
            transfers.push(Transfer {
                from,
                to,
                delay,
                is_visible,
            });
        }
        transfers
    }
}

/// One line's `Delay*` keys. A plain `Delays=` list fills positional slots;
/// named keys like `DelayDay=` fill named slots. `Delays` wins if both occur.
fn parse_line_delays(line_name: &str, section: &BTreeMap<String, String>) -> BTreeMap<String, f64> {
    let mut delays = BTreeMap::new();
    if let Some(text) = section.get("Delays") {
        if section.len() > 1 {
            error!(
                "Line '{}' contains both Delays and Delay* parameters, used Delays",
                line_name
            );
        }
        for (i, delay) in as_delay_list(text).into_iter().enumerate() {
            if let Some(delay) = delay {
                delays.insert(i.to_string(), delay);
            }
        }
        return delays;
    }

    for (key, value) in section {
        let slot = &key["Delay".len()..];
        if slot.is_empty() {
            error!("Line '{}' contains unknown parameter {}, ignored", line_name, key);
            continue;
        }
        match as_delay(value) {
            Some(delay) => {
                delays.insert(slot.to_string(), delay);
            }
            None => error!(
                "Line '{}' has unparseable delay {}={}, ignored",
                line_name, key, value
            ),
        }
    }
    delays
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_table_positional() {
        let mut section = BTreeMap::new();
        section.insert("Delays".to_string(), "2.30,4".to_string());
        let delays = parse_line_delays("Red", &section);
        assert_eq!(delays.get("0"), Some(&150.0));
        assert_eq!(delays.get("1"), Some(&240.0));
    }

    #[test]
    fn delay_table_named_slots() {
        let mut section = BTreeMap::new();
        section.insert("DelayDay".to_string(), "1.30".to_string());
        section.insert("DelayNight".to_string(), "3".to_string());
        let delays = parse_line_delays("Red", &section);
        assert_eq!(delays.get("Day"), Some(&90.0));
        assert_eq!(delays.get("Night"), Some(&180.0));
    }

    #[test]
    fn delays_list_wins_over_named() {
        let mut section = BTreeMap::new();
        section.insert("Delays".to_string(), "1".to_string());
        section.insert("DelayDay".to_string(), "2".to_string());
        let delays = parse_line_delays("Red", &section);
        assert_eq!(delays.len(), 1);
        assert_eq!(delays.get("0"), Some(&60.0));
    }

    #[test]
    fn transport_type_table_loads() {
        let types = TransportTypes::load().unwrap();
        assert!(!types.types.is_empty());
        assert_eq!(
            types.types.get("moscow.zip.metro").map(|s| s.as_str()),
            Some("Метро")
        );
    }
}
