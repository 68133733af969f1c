//! The `.txt` static-image indexes: per-station photo references grouped by
//! line. These files repeat keys freely, so values go through the composite
//! accessor to catch every occurrence.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use pmz::ini::IniFile;

use crate::files::find_files_by_extension;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StationImage {
    pub caption: String,
    pub line: String,
    pub station: String,
    pub image: String,
}

pub fn load_static_images(path: &Path) -> Result<Vec<StationImage>> {
    let mut images = Vec::new();
    for file in find_files_by_extension(path, "txt")? {
        let ini = IniFile::read(&file)?;
        if ini.attr("Options", "Type") != Some("Image") {
            continue;
        }
        let caption = ini.attr_or("Options", "Caption", "");
        load_images(&ini, &caption, &mut images);
    }
    Ok(images)
}

fn load_images(ini: &IniFile, caption: &str, images: &mut Vec<StationImage>) {
    for section in ini.sections() {
        if section.name() == "Options" {
            continue;
        }
        for (station, _) in section.iter() {
            if station.starts_with("__") {
                continue;
            }
            let value = ini
                .composite_attr(section.name(), station)
                .unwrap_or_default();
            for image in value.split('\n').filter(|i| !i.is_empty()) {
                images.push(StationImage {
                    caption: caption.to_string(),
                    line: section.name().to_string(),
                    station: station.to_string(),
                    image: image.to_string(),
                });
            }
        }
    }
}
