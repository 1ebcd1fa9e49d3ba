use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use confnet_rs::Report;

/// Writes `report` as pretty JSON. The document goes to a sibling `.partial`
/// file first and is renamed into place, so an interrupted run never leaves
/// a truncated report behind.
pub fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create report output directory '{}': {err}",
                parent.display()
            )
        })?;
    }

    let partial = partial_path(path);
    if let Err(err) = write_json(&partial, report) {
        fs::remove_file(&partial).ok();
        return Err(err);
    }
    fs::rename(&partial, path).map_err(|err| {
        format!(
            "Failed to move report '{}' into place at '{}': {err}",
            partial.display(),
            path.display()
        )
    })?;

    tracing::info!(
        path = %path.display(),
        schema_version = report.schema_version,
        utterances = report.utterances.len(),
        confnet = report.confnet.is_some(),
        "hypothesis report written"
    );
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn write_json(path: &Path, report: &Report) -> Result<(), String> {
    let file = File::create(path)
        .map_err(|err| format!("Failed to create report file '{}': {err}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|err| format!("Failed to serialize report JSON '{}': {err}", path.display()))?;
    writer.write_all(b"\n").map_err(|err| {
        format!("Failed to finalize report file '{}': {err}", path.display())
    })?;
    writer
        .flush()
        .map_err(|err| format!("Failed to flush report file '{}': {err}", path.display()))
}
