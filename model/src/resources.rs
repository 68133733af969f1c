//! Converts the static assets a map references into client-friendly formats:
//! `.vec` drawings become SVG (plus a bounding-box sidecar), PNGs are copied
//! through. Bitmap re-encoding belongs to the image pipeline outside this
//! crate; those references are logged and dropped.

use std::path::{Path, PathBuf};

use anyhow::Result;

use pmz::vec::convert_vec_file;

use crate::files::find_appropriate_file;
use crate::MapContainer;

pub fn convert_resources(container: &mut MapContainer, src: &Path, dst: &Path) -> Result<()> {
    let schemes_path = dst.join("res").join("schemes");
    fs_err::create_dir_all(&schemes_path)?;

    for scheme in &mut container.schemes {
        let mut converted = Vec::new();
        for image in &scheme.images {
            if let Some(rel) = convert_static_file(src, image, &schemes_path, dst)? {
                converted.push(rel);
            }
        }
        scheme.images = converted;
    }

    let stations_path = dst.join("res").join("stations");
    fs_err::create_dir_all(&stations_path)?;

    let mut kept = Vec::new();
    for mut image in container.images.drain(..) {
        match convert_static_file(src, &image.image, &stations_path, dst)? {
            Some(rel) => {
                image.image = rel;
                kept.push(image);
            }
            None => continue,
        }
    }
    container.images = kept;

    Ok(())
}

/// Converts one referenced file into `dst_dir`, returning its path relative
/// to the output root (forward slashes, for the JSON manifests).
fn convert_static_file(
    src: &Path,
    src_name: &str,
    dst_dir: &Path,
    dst_root: &Path,
) -> Result<Option<String>> {
    let src_file = find_appropriate_file(src.join(src_name));
    if !src_file.is_file() {
        error!("Not found image file {}", src_file.display());
        return Ok(None);
    }

    let stem = Path::new(&src_name.to_lowercase())
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string();
    let ext = src_file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let dst_file = match ext.as_str() {
        "vec" => {
            let dst_file = dst_dir.join(format!("{}.svg", stem));
            debug!("Convert {}", src_file.display());
            let drawing = convert_vec_file(&src_file)?;
            fs_err::write(&dst_file, &drawing.svg)?;
            fs_err::write(
                dst_dir.join(format!("{}.svg.meta", stem)),
                serde_json::to_string(&drawing.bounds)?,
            )?;
            dst_file
        }
        "png" => {
            let dst_file = dst_dir.join(format!("{}.png", stem));
            fs_err::copy(&src_file, &dst_file)?;
            dst_file
        }
        "bmp" | "gif" => {
            // Left to the bitmap conversion pipeline.
            warn!(
                "No converter for {} here, reference dropped",
                src_file.display()
            );
            return Ok(None);
        }
        _ => {
            let dst_file = dst_dir.join(src_name.to_lowercase());
            warn!("No converters found for file {}, copy file", src_file.display());
            fs_err::copy(&src_file, &dst_file)?;
            dst_file
        }
    };

    Ok(Some(relative_forward_slashes(&dst_file, dst_root)))
}

fn relative_forward_slashes(file: &Path, root: &Path) -> String {
    let rel: PathBuf = match file.strip_prefix(root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => file.to_path_buf(),
    };
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
