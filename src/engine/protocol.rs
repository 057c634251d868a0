//! Wire shapes exchanged with the engine
//!
//! Requests are serialized to stdin, responses decoded from stdout. Engine
//! coordinates are 0-based lines; translation happens in the projector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Rule check (tslint --format json)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// One rule violation reported by tslint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub start_position: Position,
    pub end_position: Position,
    /// Absolute path of the offending file
    pub name: PathBuf,
    pub rule_name: String,
    #[serde(default)]
    pub failure: Option<String>,
}

pub fn decode_failures(bytes: &[u8]) -> serde_json::Result<Vec<Failure>> {
    // tslint prints nothing at all when there is nothing to report
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes)
}

// ============================================================================
// Metrics (tsmetrics)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub text_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CpdToken {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub image: String,
}

/// Per-file metrics/highlighting result. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsResponse {
    /// Present in batch responses only
    pub filepath: Option<PathBuf>,
    pub highlights: Vec<Highlight>,
    pub cpd_tokens: Vec<CpdToken>,
    pub ncloc: Vec<u32>,
    pub comment_lines: Vec<u32>,
    pub executable_lines: Vec<u32>,
    pub nosonar_lines: Vec<u32>,
    pub functions: i64,
    pub statements: i64,
    pub classes: i64,
}

/// Request shape sent to the metrics command
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MetricsRequest {
    /// `{file_content}`: oldest per-file variant
    Legacy { file_content: String },
    /// `{fileContent, filepath}`
    #[serde(rename_all = "camelCase")]
    PerFile {
        file_content: String,
        filepath: String,
    },
    /// `{filepaths}`
    Batch { filepaths: Vec<String> },
}

impl MetricsRequest {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Batch responses come back as an array of file results or as an object
/// keyed by file path.
pub fn decode_batch(bytes: &[u8]) -> serde_json::Result<Vec<MetricsResponse>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Batch {
        List(Vec<MetricsResponse>),
        Keyed(std::collections::BTreeMap<PathBuf, MetricsResponse>),
    }

    Ok(match serde_json::from_slice::<Batch>(bytes)? {
        Batch::List(list) => list,
        Batch::Keyed(map) => map
            .into_iter()
            .map(|(path, mut r)| {
                r.filepath.get_or_insert(path);
                r
            })
            .collect(),
    })
}

pub fn decode_single(bytes: &[u8]) -> serde_json::Result<MetricsResponse> {
    serde_json::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failure() {
        let json = r#"[{"startPosition":{"line":1,"character":5},"endPosition":{"line":1,"character":6},
            "name":"/p/a.ts","ruleName":"no-unconditional-jump","failure":"Remove this jump"}]"#;
        let f = decode_failures(json.as_bytes()).unwrap();
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].start_position, Position { line: 1, character: 5 });
        assert_eq!(f[0].rule_name, "no-unconditional-jump");
        assert_eq!(f[0].failure.as_deref(), Some("Remove this jump"));
    }

    #[test]
    fn test_empty_rule_output_means_no_failures() {
        assert!(decode_failures(b"").unwrap().is_empty());
        assert!(decode_failures(b"\n").unwrap().is_empty());
        assert!(decode_failures(b"not json").is_err());
    }

    #[test]
    fn test_partial_metrics_response_defaults() {
        let r = decode_single(br#"{"ncloc":[55,77,99],"commentLines":[24,42],"nosonarLines":[24],"statements":100,"functions":10,"classes":1}"#).unwrap();
        assert_eq!(r.ncloc, vec![55, 77, 99]);
        assert_eq!(r.comment_lines, vec![24, 42]);
        assert!(r.highlights.is_empty());
        assert!(r.executable_lines.is_empty());
        assert_eq!(r.statements, 100);
    }

    #[test]
    fn test_request_shapes() {
        let legacy = MetricsRequest::Legacy { file_content: "x".into() }.to_json();
        assert_eq!(legacy, r#"{"file_content":"x"}"#);
        let per_file = MetricsRequest::PerFile {
            file_content: "x".into(),
            filepath: "/p/a.ts".into(),
        }
        .to_json();
        assert_eq!(per_file, r#"{"fileContent":"x","filepath":"/p/a.ts"}"#);
        let batch = MetricsRequest::Batch { filepaths: vec!["/p/a.ts".into()] }.to_json();
        assert_eq!(batch, r#"{"filepaths":["/p/a.ts"]}"#);
    }

    #[test]
    fn test_batch_list_and_keyed_forms() {
        let list = decode_batch(br#"[{"filepath":"/p/a.ts","ncloc":[1]}]"#).unwrap();
        assert_eq!(list[0].filepath.as_deref(), Some(std::path::Path::new("/p/a.ts")));

        let keyed = decode_batch(br#"{"/p/b.ts":{"ncloc":[1,2]}}"#).unwrap();
        assert_eq!(keyed[0].filepath.as_deref(), Some(std::path::Path::new("/p/b.ts")));
        assert_eq!(keyed[0].ncloc, vec![1, 2]);
    }
}
