use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Read a file as text, substituting the replacement character for bad UTF-8.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
///
/// Missing parent directories are created first. Readers see either the old
/// contents or the new ones, never a partial file.
///
/// # Errors
/// Returns an error if the directories, the temp file, or the rename fail.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("out");
    let temp_path = parent.join(format!(".{name}.{}.partial", std::process::id()));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        // Windows refuses to rename over an existing file.
        if cfg!(windows) && path.exists() {
            fs::copy(&temp_path, path)?;
            let _ = fs::remove_file(&temp_path);
            return Ok(());
        }
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}
