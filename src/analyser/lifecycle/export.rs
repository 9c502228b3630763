use super::version::{Lineage, Version};
use crate::analyser::logic::write_csv_bytes;
use crate::error::{Result, ResultExt as _};
use std::io::{Cursor, Write as _};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name a version is exported under.
pub fn csv_file_name(name: &str) -> String {
    if name.to_lowercase().ends_with(".csv") {
        name.to_owned()
    } else {
        format!("{name}.csv")
    }
}

pub fn version_csv(version: &Version) -> Result<Vec<u8>> {
    Ok(write_csv_bytes(version.data())?)
}

/// Zip archive holding one CSV entry per version of the lineage.
pub fn lineage_zip(lineage: &Lineage) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for version in lineage.versions() {
        zip.start_file(csv_file_name(&version.name), options)?;
        zip.write_all(&version_csv(version)?)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Write every version of the lineage as a CSV file under `dir`.
pub fn write_lineage_dir(lineage: &Lineage, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    lineage
        .versions()
        .map(|version| {
            let path = dir.join(csv_file_name(&version.name));
            std::fs::write(&path, version_csv(version)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}
