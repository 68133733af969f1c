//! City-level metadata from the `.cty` file, plus the per-map directory of
//! transports and schemes the serialized output links together.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use pmz::ini::IniFile;
use pmz::values::as_list;

use crate::delays::DelayScheme;
use crate::files::find_file_by_extension;
use crate::ids::TextId;
use crate::schemes::Scheme;
use crate::transports::Transport;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Metadata {
    pub map_id: String,
    pub file: String,
    pub timestamp: i64,
    pub geoname_id: Option<i64>,
    pub latitude: f64,
    pub longitude: f64,
    pub description_text_id: Option<TextId>,
    pub comments_text_id: Option<TextId>,
    pub delays: Vec<DelayScheme>,
    pub transport_types: Vec<String>,
    pub transports: Vec<TransportMeta>,
    pub schemes: Vec<SchemeMeta>,
    pub locales: Vec<String>,
    pub default_locale: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransportMeta {
    pub name: String,
    pub file: String,
    pub type_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemeMeta {
    pub name: String,
    pub file: String,
    pub transports: Vec<String>,
    pub default_transports: Vec<String>,
    /// A root scheme isn't owned by any line; clients list those first.
    pub root: bool,
    pub display_name: String,
    pub type_name: String,
}

pub struct CityOptions {
    pub city_name: String,
    pub country_name: String,
    pub delay_names: Vec<String>,
    pub comments: Option<String>,
    pub authors: Option<String>,
}

pub fn read_city_options(path: &Path) -> Result<CityOptions> {
    let ini = IniFile::read(&find_file_by_extension(path, "cty")?)?;
    Ok(CityOptions {
        city_name: ini.attr_or("Options", "CityName", ""),
        country_name: ini.attr_or("Options", "Country", ""),
        delay_names: as_list(&ini.attr_or("Options", "DelayNames", "Day,Night")),
        comments: ini.composite_attr("Options", "Comment").map(|c| c.to_string()),
        authors: ini
            .composite_attr("Options", "MapAuthors")
            .map(|a| a.to_string()),
    })
}

pub fn transport_meta(transports: &[Transport]) -> Vec<TransportMeta> {
    transports
        .iter()
        .map(|trp| TransportMeta {
            name: trp.name.clone(),
            file: format!("transports/{}.json", trp.name),
            type_name: trp.type_name.clone(),
        })
        .collect()
}

pub fn scheme_meta(transports: &[Transport], schemes: &[Scheme]) -> Vec<SchemeMeta> {
    // Schemes referenced as some line's LineMap are children, not roots.
    let mut children: Vec<&str> = Vec::new();
    for trp in transports {
        for line in &trp.lines {
            if let Some(scheme) = &line.scheme {
                children.push(scheme.as_str());
            }
        }
    }

    schemes
        .iter()
        .map(|scheme| SchemeMeta {
            name: scheme.name.clone(),
            file: format!("schemes/{}.json", scheme.name),
            transports: scheme.transports.clone(),
            default_transports: scheme.default_transports.clone(),
            root: !children.contains(&scheme.name.as_str()),
            display_name: scheme.display_name.clone(),
            type_name: scheme.type_name.clone(),
        })
        .collect()
}

pub fn transport_types(transports: &[Transport]) -> Vec<String> {
    let mut types: Vec<String> = transports.iter().map(|t| t.type_name.clone()).collect();
    types.sort();
    types.dedup();
    types
}
