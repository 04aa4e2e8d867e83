//! Header-less, index-less writers for the paired output tables.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::table::Table;

/// Paths of one pipeline's output pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub psychometric: PathBuf,
    pub confounds: PathBuf,
}

impl OutputPaths {
    pub fn new<P: AsRef<Path>>(out_dir: P, prefix: &str) -> Self {
        OutputPaths {
            psychometric: out_dir.as_ref().join(format!("{}_y.csv", prefix)),
            confounds: out_dir.as_ref().join(format!("{}_conf.csv", prefix)),
        }
    }
}

/// Serialize the cells of `table`, no header row and no key column.
pub fn render_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e))
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.tmp", name))
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

/// Write both tables, or neither. Both are rendered and staged next to
/// their targets before either target is replaced.
pub fn write_outputs<P: AsRef<Path>>(
    out_dir: P,
    prefix: &str,
    psychometric: &Table,
    confounds: &Table,
) -> Result<OutputPaths> {
    if psychometric.keys() != confounds.keys() {
        anyhow::bail!("Psychometric and confound tables are not row-aligned");
    }

    let y_bytes = render_csv(psychometric).context("Failed to render psychometric table")?;
    let conf_bytes = render_csv(confounds).context("Failed to render confound table")?;

    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", out_dir))?;

    let paths = OutputPaths::new(out_dir, prefix);
    let y_stage = staging_path(&paths.psychometric);
    let conf_stage = staging_path(&paths.confounds);

    let staged = std::fs::write(&y_stage, y_bytes)
        .with_context(|| format!("Failed to write output file: {:?}", y_stage))
        .and_then(|_| {
            std::fs::write(&conf_stage, conf_bytes)
                .with_context(|| format!("Failed to write output file: {:?}", conf_stage))
        });
    if let Err(e) = staged {
        remove_quietly(&y_stage);
        remove_quietly(&conf_stage);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&y_stage, &paths.psychometric) {
        remove_quietly(&y_stage);
        remove_quietly(&conf_stage);
        return Err(e)
            .with_context(|| format!("Failed to write output file: {:?}", paths.psychometric));
    }
    if let Err(e) = std::fs::rename(&conf_stage, &paths.confounds) {
        remove_quietly(&paths.psychometric);
        remove_quietly(&conf_stage);
        return Err(e)
            .with_context(|| format!("Failed to write output file: {:?}", paths.confounds));
    }
    Ok(paths)
}
