use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Ensure `save_dir/folder` exists. An already existing directory is not an error.
pub fn ensure_keyword_dir(save_dir: &Path, folder: &str) -> io::Result<PathBuf> {
    let dir = save_dir.join(folder);

    if !dir.is_dir() {
        fs::create_dir_all(&dir)?;
        tracing::debug!("created directory {}", dir.display());
    }

    Ok(dir)
}

/// Destination of the `index`-th image for a keyword: `<dir>/<stem>_<index>.<ext>`
pub fn image_file_path(dir: &Path, stem: &str, index: usize, extension: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", stem, index, extension))
}

/// Append a fetched results page to `raw_html_<keyword>.txt` under `dir`
pub fn append_raw_html(dir: &Path, keyword: &str, body: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let file_path = dir.join(format!("raw_html_{}.txt", keyword));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&file_path)?;
    file.write_all(body.as_bytes())?;

    Ok(file_path)
}
