//! Writes a finished container as the JSON file set the map client consumes:
//! one metadata file, one file per transport and scheme, an images manifest
//! and the text tables.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::ids::TextId;
use crate::MapContainer;

#[derive(Debug, Serialize)]
pub struct TextTable {
    pub locale: String,
    pub texts: Vec<(TextId, String)>,
}

pub fn store_model(container: &MapContainer, dst: &Path) -> Result<()> {
    fs_err::create_dir_all(dst)?;
    write_json(&dst.join("meta.json"), &container.meta)?;

    let transports_dir = dst.join("transports");
    fs_err::create_dir_all(&transports_dir)?;
    for transport in &container.transports {
        write_json(
            &transports_dir.join(format!("{}.json", transport.name)),
            transport,
        )?;
    }

    let schemes_dir = dst.join("schemes");
    fs_err::create_dir_all(&schemes_dir)?;
    for scheme in &container.schemes {
        write_json(&schemes_dir.join(format!("{}.json", scheme.name)), scheme)?;
    }

    write_json(&dst.join("images.json"), &container.images)?;

    let texts_dir = dst.join("texts");
    fs_err::create_dir_all(&texts_dir)?;
    for table in &container.texts {
        write_json(&texts_dir.join(format!("{}.json", table.locale)), table)?;
    }

    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    fs_err::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
