//! Schema source loading.

use std::path::Path;

use walkdir::WalkDir;

use crate::error::{DeployError, DeployResult};

/// Read the schema text from a single file or a directory tree.
///
/// Directories are scanned for `.graphql`/`.gql` files and concatenated in
/// path order, so the resulting text (and its digest) is stable across
/// runs.
pub fn load_schema(path: &Path) -> DeployResult<String> {
    if path.is_file() {
        return Ok(std::fs::read_to_string(path)?);
    }
    if !path.is_dir() {
        return Err(DeployError::Schema(format!(
            "schema path does not exist: {}",
            path.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| DeployError::Schema(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.path().extension().and_then(|e| e.to_str()) {
            Some("graphql") | Some("gql") => files.push(entry.path().to_path_buf()),
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(DeployError::Schema(format!(
            "no .graphql or .gql files under {}",
            path.display()
        )));
    }

    let mut combined = String::new();
    for file in files {
        if !combined.is_empty() {
            combined.push('\n');
        }
        combined.push_str(&std::fs::read_to_string(&file)?);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn single_file_is_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("datamodel.graphql");
        fs::write(&file, "type User { id: ID! }").unwrap();

        assert_eq!(load_schema(&file).unwrap(), "type User { id: ID! }");
    }

    #[test]
    fn directory_concatenates_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.graphql"), "type B { id: ID! }").unwrap();
        fs::write(dir.path().join("a.graphql"), "type A { id: ID! }").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let text = load_schema(dir.path()).unwrap();
        assert_eq!(text, "type A { id: ID! }\ntype B { id: ID! }");
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_schema(dir.path()).unwrap_err();
        assert!(matches!(err, DeployError::Schema(_)));
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = load_schema(Path::new("/nonexistent/schema")).unwrap_err();
        assert!(matches!(err, DeployError::Schema(_)));
    }
}
