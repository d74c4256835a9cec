use anyhow::Result;
use std::path::PathBuf;

/// Check an input table path before handing it to the reader.
pub fn validate_input_file(path: &str) -> Result<()> {
    let pb = PathBuf::from(path);
    if !pb.exists() {
        anyhow::bail!("File does not exist: {}", path);
    }
    if !pb.is_file() {
        anyhow::bail!("Not a regular file: {}", path);
    }
    Ok(())
}

/// Base file name of an input path, used to build default save names.
pub fn file_stem_name(path: &str) -> String {
    PathBuf::from(path)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Split a comma-separated flag value into trimmed, non-empty parts.
pub fn split_comma_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
