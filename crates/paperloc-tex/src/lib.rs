use std::path::Path;

use thiserror::Error;

pub mod bibitem;
pub mod equations;
pub mod parse;

pub use bibitem::{Bibitem, BibitemExtractor};
pub use equations::{Equation, extract_equations, find_equations};
pub use parse::{ArgKind, NodeId, NodeKind, ParseError, ParseErrorKind, TexDocument, parse};

#[derive(Error, Debug)]
pub enum TexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TeX: {0}")]
    Parse(#[from] ParseError),
}

/// Extract `\bibitem` entries from TeX source.
pub fn extract_bibitems(tex: &str) -> Result<Vec<Bibitem>, TexError> {
    BibitemExtractor::new().extract(tex)
}

/// Extract `\bibitem` entries from a `.tex` or `.bbl` file.
pub fn extract_bibitems_from_file(path: &Path) -> Result<Vec<Bibitem>, TexError> {
    let content = std::fs::read_to_string(path)?;
    extract_bibitems(&content)
}
