use anyhow::Context;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Package every file directly inside `source_dir` into a ZIP archive at `archive_path`.
///
/// Entries keep their file names and sit at the archive root.
pub fn build_archive(source_dir: &Path, archive_path: &Path) -> anyhow::Result<PathBuf> {
    let mut entries: Vec<PathBuf> = fs_err::read_dir(source_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    if let Some(parent) = archive_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }

    let file = fs_err::File::create(archive_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in &entries {
        let name = entry
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("unsupported file name {}", entry.display()))?
            .to_string();

        zip.start_file(name, options)
            .with_context(|| format!("Failed to add {} to archive", entry.display()))?;
        let mut source = fs_err::File::open(entry)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    zip.finish().context("Failed to finalize archive")?;
    tracing::info!("Packaged {} files into {}", entries.len(), archive_path.display());

    Ok(archive_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_archive_is_flat_and_ordered() {
        let source = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs_err::write(source.path().join("frame_0002.jpg"), b"second").unwrap();
        fs_err::write(source.path().join("frame_0001.jpg"), b"first").unwrap();
        fs_err::create_dir(source.path().join("nested")).unwrap();

        let archive_path = out.path().join("sub").join("frames.zip");
        let built = build_archive(source.path(), &archive_path).unwrap();
        assert_eq!(built, archive_path);

        let mut archive = zip::ZipArchive::new(fs_err::File::open(&archive_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);

        let mut first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "frame_0001.jpg");
        let mut content = String::new();
        first.read_to_string(&mut content).unwrap();
        assert_eq!(content, "first");
        drop(first);

        assert_eq!(archive.by_index(1).unwrap().name(), "frame_0002.jpg");
    }

    #[test]
    fn test_missing_source_dir_fails() {
        let out = TempDir::new().unwrap();
        assert!(build_archive(Path::new("/nonexistent/frames"), &out.path().join("x.zip")).is_err());
    }
}
