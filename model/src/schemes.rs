//! Imports `.map` scheme files: binds coordinates to the topology built by
//! the transport importer and produces renderable station/segment lists.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use pmz::geometry::cubic_interpolate;
use pmz::ini::IniFile;
use pmz::values::{
    as_int_point_list, as_int_rect_list, as_nullable_list_stripped, as_points, as_quoted_list,
};

use crate::files::{file_stem_lowercase, find_appropriate_file, find_files_by_extension, reference_stem};
use crate::ids::{StationId, StationIndex, TextId, TextIndexTable};
use crate::naming::suggest_scheme_display_name_and_type;
use crate::transports::{Line, Transport};
use crate::ImportError;

const DEFAULT_LINES_WIDTH: i32 = 9;
const DEFAULT_STATIONS_DIAMETER: f64 = 11.0;
const DEFAULT_COLOR: &str = "000000";
const DEFAULT_LABELS_COLOR: &str = "000000";
const DEFAULT_LABELS_BACKGROUND_COLOR: &str = "-1";
const SCHEME_GAP_SIZE: i32 = 150;

// Coordinates the map authors use to mean "not placed".
const EMPTY_COORDS: [(i32, i32); 3] = [(0, 0), (-1, -1), (-2, -2)];
const EMPTY_RECT: (i32, i32, i32, i32) = (0, 0, 0, 0);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scheme {
    pub name: String,
    pub display_name: String,
    pub type_name: String,
    pub name_text_id: TextId,
    pub type_text_id: TextId,
    pub width: i32,
    pub height: i32,
    pub images: Vec<String>,
    pub stations_diameter: f64,
    pub lines_width: i32,
    pub upper_case: bool,
    pub word_wrap: bool,
    pub is_vector: bool,
    pub transports: Vec<String>,
    pub default_transports: Vec<String>,
    pub lines: Vec<SchemeLine>,
    pub transfers: Vec<SchemeTransfer>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemeLine {
    pub name: String,
    pub text_id: TextId,
    pub line_color: String,
    pub line_width: i32,
    pub labels_color: String,
    pub labels_bg_color: String,
    /// Layout rectangle for the line's label block, when the scheme sets one.
    pub rect: Option<(i32, i32, i32, i32)>,
    pub stations: Vec<SchemeStation>,
    pub segments: Vec<SchemeSegment>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemeStation {
    pub id: StationId,
    pub name: String,
    pub text_id: TextId,
    pub coord: Option<(i32, i32)>,
    pub rect: Option<(i32, i32, i32, i32)>,
    pub is_working: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemeSegment {
    pub from: StationId,
    pub to: StationId,
    pub points: Vec<(f64, f64)>,
    pub is_working: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SchemeTransfer {
    pub from: StationId,
    pub to: StationId,
    pub from_coord: Option<(i32, i32)>,
    pub to_coord: Option<(i32, i32)>,
}

type AdditionalNodes = BTreeMap<(StationId, StationId), (Vec<(f64, f64)>, bool)>;

pub struct SchemeImporter<'a> {
    station_index: &'a mut StationIndex,
    texts: &'a mut TextIndexTable,
    line_index: BTreeMap<String, Line>,
    transport_index: BTreeMap<String, String>,
    scheme_index: BTreeMap<String, (TextId, String)>,
    visible_transfers: Vec<(StationId, StationId)>,
    // Last color assigned to each line name across all schemes so far.
    line_colors: BTreeMap<String, String>,
}

impl<'a> SchemeImporter<'a> {
    pub fn new(
        transports: &[Transport],
        station_index: &'a mut StationIndex,
        texts: &'a mut TextIndexTable,
    ) -> Self {
        let mut line_index = BTreeMap::new();
        let mut scheme_index = BTreeMap::new();
        let mut transport_index = BTreeMap::new();
        let mut visible_transfers = Vec::new();
        for trp in transports {
            transport_index.insert(trp.name.clone(), trp.type_name.clone());
            for line in &trp.lines {
                line_index.insert(line.name.clone(), line.clone());
                if let Some(scheme) = &line.scheme {
                    if !scheme.is_empty() {
                        scheme_index
                            .insert(scheme.clone(), (line.text_id, trp.type_name.clone()));
                    }
                }
            }
            for transfer in &trp.transfers {
                if transfer.is_visible {
                    visible_transfers.push((transfer.from, transfer.to));
                }
            }
        }
        Self {
            station_index,
            texts,
            line_index,
            transport_index,
            scheme_index,
            visible_transfers,
            line_colors: BTreeMap::new(),
        }
    }

    pub fn import_schemes(&mut self, path: &Path) -> Result<Vec<Scheme>> {
        let files = find_files_by_extension(path, "map")?;
        let default_file = files
            .iter()
            .find(|f| f.file_name().and_then(|n| n.to_str()) == Some("Metro.map"))
            .cloned()
            .ok_or_else(|| ImportError::MissingFile(format!("Metro.map in {}", path.display())))?;

        let mut schemes = vec![self.import_scheme(&default_file)?];
        for file in files.iter().filter(|f| **f != default_file) {
            schemes.push(self.import_scheme(file)?);
        }
        Ok(schemes)
    }

    fn import_scheme(&mut self, file: &Path) -> Result<Scheme> {
        let ini = IniFile::read(file)?;
        let name = file_stem_lowercase(file);

        let lines_width = ini.int_attr_or("Options", "LinesWidth", DEFAULT_LINES_WIDTH);
        let diameter = ini.float_attr_or("Options", "StationDiameter", DEFAULT_STATIONS_DIAMETER);
        let upper_case = ini.bool_attr_or("Options", "UpperCase", true);
        let word_wrap = ini.bool_attr_or("Options", "WordWrap", true);
        let is_vector = ini.attr_or("Options", "IsVector", "1") == "1";

        let transports = as_nullable_list_stripped(ini.attr("Options", "Transports"))
            .unwrap_or_else(|| vec!["Metro".to_string()])
            .iter()
            .map(|t| reference_stem(t))
            .collect();
        let default_transports =
            as_nullable_list_stripped(ini.attr("Options", "CheckedTransports"))
                .unwrap_or_else(|| vec!["Metro".to_string()])
                .iter()
                .map(|t| reference_stem(t))
                .collect();

        let (display_name, type_name) = suggest_scheme_display_name_and_type(
            &name,
            &self.transport_index,
            &self.scheme_index,
            self.texts,
        );

        let images = self.image_links(file, &as_quoted_list(&ini.attr_or("Options", "ImageFileName", "")));
        let additional_nodes = self.load_additional_nodes(&ini);

        let mut lines = Vec::new();
        for section in ini.sections() {
            if self.line_index.contains_key(section.name()) {
                lines.push(self.load_scheme_line(
                    &ini,
                    section.name().to_string(),
                    lines_width,
                    &additional_nodes,
                ));
            }
        }

        let transfers = self.scheme_transfers(&lines);
        let (width, height) = scheme_size(&lines, SCHEME_GAP_SIZE);

        Ok(Scheme {
            name_text_id: self.texts.as_text_id(&display_name),
            type_text_id: self.texts.as_common_text_id(&type_name),
            name,
            display_name,
            type_name,
            width,
            height,
            images,
            stations_diameter: diameter,
            lines_width,
            upper_case,
            word_wrap,
            is_vector,
            transports,
            default_transports,
            lines,
            transfers,
        })
    }

    fn image_links(&self, parent_file: &Path, links: &[String]) -> Vec<String> {
        let root = parent_file.parent().unwrap_or_else(|| Path::new("."));
        let mut images = Vec::new();
        for link in links.iter().filter(|l| !l.is_empty()) {
            let resolved = find_appropriate_file(root.join(link));
            if resolved.is_file() {
                if let Some(name) = resolved.file_name().and_then(|n| n.to_str()) {
                    images.push(name.to_string());
                }
            } else {
                error!(
                    "Not found file {} referenced in {}, ignored",
                    resolved.display(),
                    parent_file.display()
                );
            }
        }
        images
    }

    fn load_additional_nodes(&mut self, ini: &IniFile) -> AdditionalNodes {
        let mut nodes = AdditionalNodes::new();
        let Some(section) = ini.section("AdditionalNodes") else {
            return nodes;
        };
        for (key, value) in section.iter() {
            if key.starts_with("__") || value.is_empty() {
                continue;
            }
            let parts = as_quoted_list(value);
            if parts.len() < 5 {
                warn!(
                    "Skipped invalid additional node '{}' in {}: '{}'",
                    key,
                    ini.path().display(),
                    value
                );
                continue;
            }
            let points = match as_points(&parts[3..]) {
                Ok(points) => points,
                Err(err) => {
                    warn!(
                        "Skipped invalid additional node '{}' in {}: {}",
                        key,
                        ini.path().display(),
                        err
                    );
                    continue;
                }
            };
            let is_spline = parts.last().map(|p| p == "spline").unwrap_or(false);
            let from = self.station_index.get_station_id(&parts[0], &parts[1]);
            let to = self.station_index.get_station_id(&parts[0], &parts[2]);
            nodes.insert((from, to), (points, is_spline));
        }
        nodes
    }

    fn load_scheme_line(
        &mut self,
        ini: &IniFile,
        line_name: String,
        scheme_lines_width: i32,
        additional_nodes: &AdditionalNodes,
    ) -> SchemeLine {
        let trp_line = self.line_index[&line_name].clone();

        let line_color = self.line_color(&line_name, ini.attr(&line_name, "Color"));
        let line_width = ini.int_attr_or(&line_name, "Width", scheme_lines_width);
        let labels_color = ini.attr_or(&line_name, "LabelsColor", DEFAULT_LABELS_COLOR);
        let labels_bg_color = ini.attr_or(&line_name, "LabelsBColor", DEFAULT_LABELS_BACKGROUND_COLOR);

        let rect = as_int_rect_list(&ini.attr_or(&line_name, "Rect", ""))
            .into_iter()
            .next()
            .flatten();
        let coords = as_int_point_list(&ini.attr_or(&line_name, "Coordinates", ""));
        let rects = as_int_rect_list(&ini.attr_or(&line_name, "Rects", ""));

        let stations = load_stations(&trp_line, &coords, &rects);
        let segments = load_segments(&trp_line, &stations, additional_nodes);

        SchemeLine {
            name: line_name,
            text_id: trp_line.text_id,
            line_color,
            line_width,
            labels_color,
            labels_bg_color,
            rect,
            stations,
            segments,
        }
    }

    /// A line drawn on an earlier scheme keeps its color on later ones unless
    /// the scheme overrides it.
    fn line_color(&mut self, line_name: &str, proposed: Option<&str>) -> String {
        if let Some(color) = proposed.filter(|c| !c.is_empty()) {
            self.line_colors
                .insert(line_name.to_string(), color.to_string());
            return color.to_string();
        }
        self.line_colors
            .get(line_name)
            .cloned()
            .unwrap_or_else(|| DEFAULT_COLOR.to_string())
    }

    fn scheme_transfers(&self, lines: &[SchemeLine]) -> Vec<SchemeTransfer> {
        let mut scheme_stations: BTreeMap<StationId, &SchemeStation> = BTreeMap::new();
        for line in lines {
            for station in &line.stations {
                scheme_stations.insert(station.id, station);
            }
        }

        let mut transfers = Vec::new();
        for (from, to) in &self.visible_transfers {
            let (Some(from_station), Some(to_station)) =
                (scheme_stations.get(from), scheme_stations.get(to))
            else {
                continue;
            };
            transfers.push(SchemeTransfer {
                from: *from,
                to: *to,
                from_coord: from_station.coord,
                to_coord: to_station.coord,
            });
        }
        transfers
    }
}

fn load_stations(
    trp_line: &Line,
    coords: &[Option<(i32, i32)>],
    rects: &[Option<(i32, i32, i32, i32)>],
) -> Vec<SchemeStation> {
    trp_line
        .stations
        .iter()
        .enumerate()
        .map(|(i, station)| SchemeStation {
            id: station.id,
            name: station.name.clone(),
            text_id: station.text_id,
            coord: coords
                .get(i)
                .copied()
                .flatten()
                .filter(|c| !EMPTY_COORDS.contains(c)),
            rect: rects
                .get(i)
                .copied()
                .flatten()
                .filter(|r| *r != EMPTY_RECT),
            is_working: is_station_working(station.id, trp_line),
        })
        .collect()
}

fn is_station_working(id: StationId, trp_line: &Line) -> bool {
    trp_line
        .segments
        .iter()
        .any(|s| (s.from == id || s.to == id) && s.delay.map(|d| d > 0.0).unwrap_or(false))
}

fn load_segments(
    trp_line: &Line,
    stations: &[SchemeStation],
    additional_nodes: &AdditionalNodes,
) -> Vec<SchemeSegment> {
    let coords: BTreeMap<StationId, Option<(i32, i32)>> =
        stations.iter().map(|s| (s.id, s.coord)).collect();

    let mut segments: BTreeMap<(StationId, StationId), SchemeSegment> = BTreeMap::new();
    let mut removed: Vec<(StationId, StationId)> = Vec::new();

    for trp_segment in &trp_line.segments {
        let (from, to) = (trp_segment.from, trp_segment.to);
        let normalized = (from.min(to), from.max(to));
        if removed.contains(&normalized) {
            continue;
        }

        let (Some(start), Some(end)) = (
            coords.get(&from).copied().flatten(),
            coords.get(&to).copied().flatten(),
        ) else {
            continue;
        };

        let mut is_working = trp_segment.delay.map(|d| d > 0.0).unwrap_or(false);
        let (extra, is_spline) = additional_points(additional_nodes, from, to);

        // A single sentinel point means "don't draw this segment at all",
        // dropping an already-recorded opposite direction too.
        if extra.len() == 1 && is_empty_point(extra[0]) {
            removed.push(normalized);
            segments.remove(&normalized);
            continue;
        }

        let mut points: Vec<(f64, f64)> = Vec::new();
        points.push((start.0 as f64, start.1 as f64));
        points.extend(extra);
        points.push((end.0 as f64, end.1 as f64));
        if is_spline {
            points = cubic_interpolate(&points)
                .into_iter()
                .map(|(x, y)| (x.round(), y.round()))
                .collect();
        }

        if let Some(existing) = segments.get(&normalized) {
            // Direction-symmetric records merge: the longer point list wins
            // and a working direction keeps the segment working.
            if existing.points.len() > points.len() {
                points = existing.points.clone();
            }
            is_working |= existing.is_working;
        }
        segments.insert(
            normalized,
            SchemeSegment {
                from: normalized.0,
                to: normalized.1,
                points,
                is_working,
            },
        );
    }

    segments.into_values().collect()
}

/// The two-lookup direction match: a forward `(from, to)` entry wins; a
/// reverse entry applies with its points reversed.
fn additional_points(
    nodes: &AdditionalNodes,
    from: StationId,
    to: StationId,
) -> (Vec<(f64, f64)>, bool) {
    if let Some((points, is_spline)) = nodes.get(&(from, to)) {
        return (points.clone(), *is_spline);
    }
    if let Some((points, is_spline)) = nodes.get(&(to, from)) {
        let mut reversed = points.clone();
        reversed.reverse();
        return (reversed, *is_spline);
    }
    (Vec::new(), false)
}

fn is_empty_point(point: (f64, f64)) -> bool {
    EMPTY_COORDS
        .iter()
        .any(|(x, y)| point == (*x as f64, *y as f64))
}

fn scheme_size(lines: &[SchemeLine], gap: i32) -> (i32, i32) {
    let mut width = 0;
    let mut height = 0;
    for line in lines {
        for station in &line.stations {
            if let Some((x, y)) = station.coord {
                width = width.max(x);
                height = height.max(y);
            }
        }
        for segment in &line.segments {
            for (x, y) in &segment.points {
                width = width.max(*x as i32);
                height = height.max(*y as i32);
            }
        }
    }
    (width + gap, height + gap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transports::{LineSegment, LineStation};

    fn test_line() -> Line {
        let mut texts = TextIndexTable::new();
        let text_id = texts.as_text_id("Red");
        Line {
            name: "Red".to_string(),
            text_id,
            scheme: None,
            stations: vec![
                LineStation {
                    id: StationId(0),
                    name: "A".to_string(),
                    text_id,
                },
                LineStation {
                    id: StationId(1),
                    name: "B".to_string(),
                    text_id,
                },
                LineStation {
                    id: StationId(2),
                    name: "C".to_string(),
                    text_id,
                },
            ],
            segments: vec![
                LineSegment {
                    from: StationId(0),
                    to: StationId(1),
                    delay: Some(300.0),
                },
                LineSegment {
                    from: StationId(1),
                    to: StationId(0),
                    delay: Some(300.0),
                },
                LineSegment {
                    from: StationId(1),
                    to: StationId(2),
                    delay: None,
                },
            ],
            delays: BTreeMap::new(),
        }
    }

    #[test]
    fn opposite_directions_merge_into_one_segment() {
        let line = test_line();
        let coords = vec![Some((10, 10)), Some((20, 10)), Some((30, 20))];
        let stations = load_stations(&line, &coords, &[]);
        let segments = load_segments(&line, &stations, &AdditionalNodes::new());
        assert_eq!(segments.len(), 2);
        let ab = &segments[0];
        assert_eq!((ab.from, ab.to), (StationId(0), StationId(1)));
        assert!(ab.is_working);
        let bc = &segments[1];
        assert!(!bc.is_working);
    }

    #[test]
    fn unplaced_stations_drop_their_segments() {
        let line = test_line();
        // B uses the (0,0) sentinel: both its segments vanish, but the
        // station stays listed.
        let coords = vec![Some((10, 10)), Some((0, 0)), Some((30, 20))];
        let stations = load_stations(&line, &coords, &[]);
        assert_eq!(stations.len(), 3);
        assert_eq!(stations[1].coord, None);
        let segments = load_segments(&line, &stations, &AdditionalNodes::new());
        assert!(segments.is_empty());
    }

    fn one_way_line() -> Line {
        let mut line = test_line();
        // Only the A->B direction, so no merge interferes.
        line.segments = vec![LineSegment {
            from: StationId(0),
            to: StationId(1),
            delay: Some(300.0),
        }];
        line
    }

    #[test]
    fn reverse_additional_nodes_flip_points() {
        let line = one_way_line();
        let coords = vec![Some((10, 10)), Some((20, 10)), Some((30, 20))];
        let stations = load_stations(&line, &coords, &[]);
        let mut nodes = AdditionalNodes::new();
        // Authored against the B->A direction; the A->B record reverses it.
        nodes.insert(
            (StationId(1), StationId(0)),
            (vec![(18.0, 12.0), (12.0, 12.0)], false),
        );
        let segments = load_segments(&line, &stations, &nodes);
        let ab = &segments[0];
        assert_eq!(
            ab.points,
            vec![(10.0, 10.0), (12.0, 12.0), (18.0, 12.0), (20.0, 10.0)]
        );
    }

    #[test]
    fn sentinel_additional_node_suppresses_segment() {
        let line = test_line();
        let coords = vec![Some((10, 10)), Some((20, 10)), Some((30, 20))];
        let stations = load_stations(&line, &coords, &[]);
        let mut nodes = AdditionalNodes::new();
        nodes.insert((StationId(0), StationId(1)), (vec![(0.0, 0.0)], false));
        let segments = load_segments(&line, &stations, &nodes);
        assert_eq!(segments.len(), 1);
        assert_eq!((segments[0].from, segments[0].to), (StationId(1), StationId(2)));
    }

    #[test]
    fn station_working_flag_from_incident_delays() {
        let line = test_line();
        let stations = load_stations(&line, &[], &[]);
        assert!(stations[0].is_working);
        assert!(stations[1].is_working);
        // C's only segment has no delay.
        assert!(!stations[2].is_working);
    }

    #[test]
    fn spline_flag_interpolates_points() {
        let line = one_way_line();
        let coords = vec![Some((0, 0)), Some((40, 0)), Some((60, 20))];
        let stations = load_stations(&line, &coords, &[]);
        let mut nodes = AdditionalNodes::new();
        nodes.insert((StationId(0), StationId(1)), (vec![(20.0, 20.0)], true));
        let segments = load_segments(&line, &stations, &nodes);
        // 3 control points refine to 17.
        assert_eq!(segments[0].points.len(), 17);
        assert_eq!(segments[0].points[0], (0.0, 0.0));
        assert_eq!(*segments[0].points.last().unwrap(), (40.0, 0.0));
    }
}
