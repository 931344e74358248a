use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::TexError;
use crate::parse::{ArgKind, NodeId, NodeKind, TexDocument, parse};

/// One entry of a bibliography: its citation key and whitespace-normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bibitem {
    pub key: String,
    pub text: String,
}

impl Bibitem {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

/// A newline, any (lazily matched) whitespace, then another newline.
static PARAGRAPH_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*?\n").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Segments the bibliography of a TeX document into [`Bibitem`]s.
///
/// The extractor only carries configuration (which command names start an
/// entry). Scan state lives inside each call, so one extractor can be shared
/// across documents and threads.
#[derive(Debug, Clone)]
pub struct BibitemExtractor {
    markers: Vec<String>,
}

impl Default for BibitemExtractor {
    fn default() -> Self {
        Self {
            markers: vec!["bibitem".to_string()],
        }
    }
}

impl BibitemExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom set of entry-starting command names (without backslash).
    pub fn with_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Parse `tex` and extract its bibliography entries.
    pub fn extract(&self, tex: &str) -> Result<Vec<Bibitem>, TexError> {
        let doc = parse(tex)?;
        Ok(self.extract_from_document(&doc))
    }

    /// Extract bibliography entries from an already parsed document.
    ///
    /// Markers are found in document order and grouped by their enclosing
    /// node. Each enclosing node is scanned once, the first time one of its
    /// markers is seen, and any entry still open at its end is flushed.
    pub fn extract_from_document(&self, doc: &TexDocument) -> Vec<Bibitem> {
        let mut scan = Scan::default();
        let mut scanned: HashSet<NodeId> = HashSet::new();

        for marker in doc.find_all(|id, _| self.is_marker(doc, id)) {
            let Some(parent) = doc.parent(marker) else {
                continue;
            };
            if !scanned.insert(parent) {
                continue;
            }
            for &child in doc.children(parent) {
                scan.process(self, doc, child);
            }
            scan.finalize();
        }

        tracing::debug!(
            blocks = scanned.len(),
            items = scan.items.len(),
            "extracted bibitems"
        );
        scan.items
    }

    fn is_marker(&self, doc: &TexDocument, id: NodeId) -> bool {
        doc.command_name(id)
            .is_some_and(|name| self.markers.iter().any(|m| m == name))
    }
}

/// Scan state for one extraction: the open entry's label and its text so far.
#[derive(Default)]
struct Scan {
    label: Option<String>,
    buffer: String,
    items: Vec<Bibitem>,
}

impl Scan {
    fn process(&mut self, extractor: &BibitemExtractor, doc: &TexDocument, id: NodeId) {
        if extractor.is_marker(doc, id) {
            if self.label.is_some() {
                self.finalize();
            }
            self.label = extract_label(doc, id);
            return;
        }

        // Text seen without an open entry is dropped, never buffered.
        if self.label.is_none() {
            return;
        }
        let Some(text) = node_text(doc, id) else {
            return;
        };

        match PARAGRAPH_BREAK_RE.find(text) {
            Some(brk) => {
                self.buffer.push_str(&text[..brk.start()]);
                self.finalize();
            }
            None => self.buffer.push_str(text),
        }
    }

    /// Emit the open entry, if any, and reset. The buffer is cleared either way.
    fn finalize(&mut self) {
        if let Some(key) = self.label.take() {
            let text = clean_text(&self.buffer);
            self.items.push(Bibitem { key, text });
        }
        self.buffer.clear();
    }
}

fn node_text<'d>(doc: &'d TexDocument, id: NodeId) -> Option<&'d str> {
    match doc.kind(id) {
        NodeKind::Comment(_) => None,
        _ => doc.string(id),
    }
}

/// The first required argument whose content is a plain string.
fn extract_label(doc: &TexDocument, marker: NodeId) -> Option<String> {
    doc.args(marker)
        .iter()
        .filter(|&&arg| doc.arg_kind(arg) == Some(ArgKind::Required))
        .find_map(|&arg| doc.string(arg))
        .map(str::to_string)
}

fn clean_text(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(tex: &str) -> Vec<Bibitem> {
        BibitemExtractor::new().extract(tex).unwrap()
    }

    #[test]
    fn test_inline_bibitems() {
        assert_eq!(
            extract(r"\bibitem{a} Alpha text. \bibitem{b} Beta text."),
            vec![Bibitem::new("a", "Alpha text."), Bibitem::new("b", "Beta text.")]
        );
    }

    #[test]
    fn test_paragraph_break_ends_entry() {
        assert_eq!(
            extract("\\bibitem{a} Alpha\n\nstray text \\bibitem{b} Beta"),
            vec![Bibitem::new("a", "Alpha"), Bibitem::new("b", "Beta")]
        );
    }

    #[test]
    fn test_break_with_whitespace_between_newlines() {
        assert_eq!(
            extract("\\bibitem{a} Alpha\n \t \nlost"),
            vec![Bibitem::new("a", "Alpha")]
        );
    }

    #[test]
    fn test_single_newline_is_not_a_break() {
        assert_eq!(
            extract("\\bibitem{a} Alpha\n  continued"),
            vec![Bibitem::new("a", "Alpha continued")]
        );
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            extract("\\bibitem{k}\n   A.\tAuthor,\n  {Title}   here.  "),
            vec![Bibitem::new("k", "A. Author, Title here.")]
        );
    }

    #[test]
    fn test_nested_flattenable_nodes_contribute_text() {
        assert_eq!(
            extract(r"\bibitem{k} See \emph{Title} and {\em Lost} end."),
            vec![Bibitem::new("k", "See Title and end.")]
        );
    }

    #[test]
    fn test_unlabeled_marker_drops_following_text() {
        assert_eq!(
            extract(r"\bibitem{a} First. \bibitem{\ref{x}} Orphan text. \bibitem{c} Third."),
            vec![Bibitem::new("a", "First."), Bibitem::new("c", "Third.")]
        );
        assert_eq!(extract(r"\bibitem Nothing labeled here."), vec![]);
    }

    #[test]
    fn test_optional_argument_is_not_the_label() {
        assert_eq!(
            extract(r"\bibitem[Doe et al.(2020)]{doe20} Doe, J. Paper."),
            vec![Bibitem::new("doe20", "Doe, J. Paper.")]
        );
        assert_eq!(extract(r"\bibitem[Only optional] Text."), vec![]);
    }

    #[test]
    fn test_label_after_space_or_line_break() {
        assert_eq!(
            extract("\\bibitem {a} Alpha. \\bibitem\n{b} Beta. \\bibitem\t[B]{c} Gamma."),
            vec![
                Bibitem::new("a", "Alpha."),
                Bibitem::new("b", "Beta."),
                Bibitem::new("c", "Gamma."),
            ]
        );
    }

    #[test]
    fn test_label_never_read_across_paragraph_break() {
        assert_eq!(extract("\\bibitem\n\n{a} Alpha."), vec![]);
    }

    #[test]
    fn test_many_unclosed_brackets_in_entry() {
        let tex = format!("\\bibitem{{a}} {}", "\\x[".repeat(40));
        let items = extract(&tex);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].key, "a");
    }

    #[test]
    fn test_thebibliography_environment() {
        let tex = "\\section{Intro}\nBody text.\n\\begin{thebibliography}{99}\n\
                   \\bibitem{one} First entry,\n  spanning lines.\n\
                   \\bibitem{two} Second entry.\n\
                   \\end{thebibliography}\nAfter.";
        assert_eq!(
            extract(tex),
            vec![
                Bibitem::new("one", "First entry, spanning lines."),
                Bibitem::new("two", "Second entry."),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            extract("\\bibitem{a} Alpha % hidden\n beta"),
            vec![Bibitem::new("a", "Alpha beta")]
        );
    }

    #[test]
    fn test_two_bibliography_blocks() {
        let tex = "\\begin{thebibliography}{1}\\bibitem{a} A.\\end{thebibliography}\n\
                   text\n\
                   \\begin{thebibliography}{1}\\bibitem{b} B.\\end{thebibliography}";
        assert_eq!(
            extract(tex),
            vec![Bibitem::new("a", "A."), Bibitem::new("b", "B.")]
        );
    }

    #[test]
    fn test_empty_entry_text() {
        assert_eq!(
            extract(r"\bibitem{a}\bibitem{b} B"),
            vec![Bibitem::new("a", ""), Bibitem::new("b", "B")]
        );
    }

    #[test]
    fn test_custom_markers() {
        let extractor = BibitemExtractor::with_markers(["bibitem", "bibentry"]);
        assert_eq!(
            extractor.extract(r"\bibentry{x} X. \bibitem{y} Y.").unwrap(),
            vec![Bibitem::new("x", "X."), Bibitem::new("y", "Y.")]
        );
    }

    #[test]
    fn test_no_markers() {
        assert!(extract("Just prose, no bibliography.").is_empty());
    }

    #[test]
    fn test_parse_error_propagates() {
        let err = BibitemExtractor::new()
            .extract(r"\bibitem{a} {unclosed")
            .unwrap_err();
        assert!(matches!(err, TexError::Parse(_)));
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let extractor = BibitemExtractor::new();
        let tex = "\\bibitem{a} Alpha\n\nstray \\bibitem{b} Beta";
        let first = extractor.extract(tex).unwrap();
        let second = extractor.extract(tex).unwrap();
        assert_eq!(first, second);
    }
}
