use crate::merge::{END_MARKER, START_MARKER};
use serde::{Deserialize, Serialize};

/// One merge unit cut back out of a merged document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// The `/<root>/<rel>` path carried by the start marker.
    pub path: String,
    /// Full annotated block, markers included.
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// Splits a merged document into one chunk per file block.
///
/// Blocks are recognized by the marker prefixes. Text outside a block is
/// dropped, and a block without an end marker runs to the end of the document.
pub fn split_merged_document(text: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Option<(String, usize, Vec<&str>)> = None;
    let mut last_line = 0;

    for (idx, line) in text.lines().enumerate() {
        let number = idx + 1;
        last_line = number;
        if let Some(path) = line.strip_prefix(START_MARKER) {
            if let Some((open_path, start, lines)) = current.take() {
                log::debug!("Chunk for {} has no end marker before line {}", open_path, number);
                chunks.push(close(open_path, start, number - 1, &lines));
            }
            current = Some((path.trim_end().to_string(), number, vec![line]));
            continue;
        }
        let Some((_, _, lines)) = current.as_mut() else {
            continue;
        };
        lines.push(line);
        if line.starts_with(END_MARKER) {
            if let Some((path, start, lines)) = current.take() {
                chunks.push(close(path, start, number, &lines));
            }
        }
    }

    if let Some((path, start, lines)) = current.take() {
        chunks.push(close(path, start, last_line, &lines));
    }
    log::info!("Split merged document into {} chunks.", chunks.len());
    chunks
}

fn close(path: String, start_line: usize, end_line: usize, lines: &[&str]) -> Chunk {
    Chunk {
        path,
        text: lines.join("\n"),
        start_line,
        end_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_blocks_and_ignores_stray_text() {
        let doc = format!(
            "preamble\n{s}/app/a.ts\nconst a = 1;\n{e}/app/a.ts\n\n{s}/app/b.ts\n\n{e}/app/b.ts\n",
            s = START_MARKER,
            e = END_MARKER
        );
        let chunks = split_merged_document(&doc);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].path, "/app/a.ts");
        assert_eq!(chunks[0].start_line, 2);
        assert_eq!(chunks[0].end_line, 4);
        assert_eq!(
            chunks[0].text,
            format!("{}/app/a.ts\nconst a = 1;\n{}/app/a.ts", START_MARKER, END_MARKER)
        );
        assert_eq!(chunks[1].start_line, 6);
        assert_eq!(chunks[1].end_line, 8);
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        let doc = format!("{}/app/a.ts\nline one\nline two", START_MARKER);
        let chunks = split_merged_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end_line, 3);
        assert!(chunks[0].text.ends_with("line two"));
    }

    #[test]
    fn start_marker_closes_an_open_block() {
        let doc = format!("{s}/app/a.ts\nx\n{s}/app/b.ts\ny\n{e}/app/b.ts", s = START_MARKER, e = END_MARKER);
        let chunks = split_merged_document(&doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].end_line, 2);
        assert_eq!(chunks[1].path, "/app/b.ts");
    }

    #[test]
    fn empty_document_has_no_chunks() {
        assert!(split_merged_document("").is_empty());
    }
}
