use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn validate_table_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);

    let ext = pb
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    match ext.as_deref() {
        Some("tsv") | Some("csv") | Some("txt") => {}
        _ => anyhow::bail!("File must have a .csv, .tsv or .txt extension: {}", path),
    }

    if !pb.is_file() {
        anyhow::bail!("File does not exist: {}", path);
    }

    Ok(())
}

pub fn validate_input_dir(path: &str) -> Result<()> {
    if !Path::new(path).is_dir() {
        anyhow::bail!("Input directory does not exist: {}", path);
    }
    Ok(())
}
