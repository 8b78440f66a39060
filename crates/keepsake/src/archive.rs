//! Reading export files written as JavaScript assignments.
//!
//! Platform exports wrap their JSON in a script assignment so the files
//! can be loaded by a browser viewer:
//!
//! ```text
//! window.YTD.tweets.part0 = [ { ... } ]
//! Grailbird.data.tweets_2010_01 =
//!  [ { ... } ]
//! var user_details = { ... }
//! ```

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not an export fragment: {message}")]
    Format { path: PathBuf, message: String },

    #[error("no account details found in {path}")]
    MissingAccount { path: PathBuf },

    #[error("{path} contains no items")]
    Empty { path: PathBuf },
}

/// Parse the JSON on the right-hand side of a script assignment.
///
/// Text without an assignment is parsed as plain JSON.
pub fn parse_assignment(text: &str) -> Result<Value, String> {
    let text = text.trim_start_matches('\u{feff}').trim();
    let json_start = text
        .find(['[', '{'])
        .ok_or_else(|| "no JSON value found".to_string())?;
    let prefix = &text[..json_start];
    if !prefix.trim().is_empty() && !prefix.trim_end().ends_with('=') {
        return Err(format!("unexpected text before JSON: {}", prefix.trim()));
    }

    let body = text[json_start..].trim_end().trim_end_matches(';');
    serde_json::from_str(body).map_err(|e| e.to_string())
}

/// Read and parse one export fragment.
pub async fn read_fragment(path: &Path) -> Result<Value, ArchiveError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_assignment(&text).map_err(|message| ArchiveError::Format {
        path: path.to_path_buf(),
        message,
    })
}

/// Files in `dir` whose names satisfy `matches`, sorted by name.
///
/// A missing directory yields an empty list.
pub async fn list_files(
    dir: &Path,
    matches: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ArchiveError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut files = Vec::new();
    loop {
        let entry = entries.next_entry().await.map_err(|source| ArchiveError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let Some(entry) = entry else { break };
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        let path = entry.path();
        if is_file
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
            && matches(name)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_window_ytd_assignment() {
        let value = parse_assignment("window.YTD.tweets.part0 = [ {\"tweet\": {\"id_str\": \"1\"}} ]")
            .unwrap();
        assert_eq!(value, json!([{"tweet": {"id_str": "1"}}]));
    }

    #[test]
    fn parses_grailbird_assignment_across_lines() {
        let value = parse_assignment("Grailbird.data.tweets_2010_01 = \n [ {\"id\": 5} ];\n").unwrap();
        assert_eq!(value, json!([{"id": 5}]));
    }

    #[test]
    fn parses_var_object_and_plain_json() {
        assert_eq!(
            parse_assignment("var user_details = {\"screen_name\": \"a\"}").unwrap(),
            json!({"screen_name": "a"})
        );
        assert_eq!(parse_assignment("\u{feff}[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_assignment("hello").is_err());
        assert!(parse_assignment("console.log([1])").is_err());
        assert!(parse_assignment("x = [1,").is_err());
    }

    #[tokio::test]
    async fn list_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["tweets-part1.js", "tweets.js", "like.js", "tweets-part0.js"] {
            tokio::fs::write(dir.path().join(name), "[]").await.unwrap();
        }

        let files = list_files(dir.path(), |name| name.starts_with("tweets"))
            .await
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["tweets-part0.js", "tweets-part1.js", "tweets.js"]);

        assert!(
            list_files(&dir.path().join("missing"), |_| true)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
