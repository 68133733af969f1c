//! Unpacks a `.pmz` archive (a plain zip) into a working directory for the
//! importer to read.

use std::path::Path;

use anyhow::Result;
use zip::ZipArchive;

pub fn extract_pmz(archive_path: &Path, dst: &Path) -> Result<()> {
    let file = fs_err::File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|err| anyhow!("{}: {}", archive_path.display(), err))?;

    fs_err::create_dir_all(dst)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(name) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            warn!("Skipped suspicious archive entry {:?}", entry.name());
            continue;
        };
        let out_path = dst.join(name);
        if entry.is_dir() {
            fs_err::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs_err::create_dir_all(parent)?;
        }
        let mut out = fs_err::File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;
    }
    Ok(())
}
