use serde::{Deserialize, Serialize};

use crate::TexError;
use crate::parse::{NodeId, NodeKind, TexDocument, parse};

/// Environments whose body is typeset as display math.
const MATH_ENVIRONMENTS: &[&str] = &[
    "equation",
    "equation*",
    "align",
    "align*",
    "gather",
    "gather*",
    "multline",
    "multline*",
    "eqnarray",
    "eqnarray*",
    "displaymath",
    "math",
];

/// A math expression found in TeX source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    /// Position among all equations of the document, from 0.
    pub index: usize,
    /// TeX between the delimiters.
    pub tex: String,
    pub display: bool,
    /// Byte range of the whole expression, delimiters included.
    pub start: usize,
    pub end: usize,
}

/// Parse `tex` and list its equations in document order.
pub fn extract_equations(tex: &str) -> Result<Vec<Equation>, TexError> {
    let doc = parse(tex)?;
    Ok(find_equations(&doc))
}

/// Every outermost math node or math environment, in document order.
///
/// Math nested inside another equation (for example `$..$` inside
/// `\text{..}` in an `align`) belongs to the outer equation and is not
/// listed separately.
pub fn find_equations(doc: &TexDocument) -> Vec<Equation> {
    doc.find_all(|id, kind| is_math(doc, id, kind))
        .into_iter()
        .filter(|&id| !doc.has_ancestor(id, |a, kind| is_math(doc, a, kind)))
        .enumerate()
        .map(|(index, id)| {
            let span = doc.span(id);
            Equation {
                index,
                tex: doc.inner_source(id).to_string(),
                display: match doc.kind(id) {
                    NodeKind::Math { display } => *display,
                    _ => true,
                },
                start: span.start,
                end: span.end,
            }
        })
        .collect()
}

fn is_math(doc: &TexDocument, id: NodeId, kind: &NodeKind) -> bool {
    match kind {
        NodeKind::Math { .. } => true,
        NodeKind::Environment { .. } => doc
            .environment_name(id)
            .is_some_and(|name| MATH_ENVIRONMENTS.contains(&name)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_and_display() {
        let tex = r"Let $x = 1$ and $$y = 2$$ then \[z\].";
        let eqs = extract_equations(tex).unwrap();
        assert_eq!(eqs.len(), 3);
        assert_eq!(eqs[0].tex, "x = 1");
        assert!(!eqs[0].display);
        assert_eq!(&tex[eqs[0].start..eqs[0].end], "$x = 1$");
        assert_eq!(eqs[1].tex, "y = 2");
        assert!(eqs[1].display);
        assert_eq!(eqs[2].index, 2);
        assert_eq!(eqs[2].tex, "z");
    }

    #[test]
    fn test_math_environment_hides_nested_math() {
        let tex = "\\begin{align}\na &= b \\text{ if $c$}\n\\end{align} and $d$";
        let eqs = extract_equations(tex).unwrap();
        assert_eq!(eqs.len(), 2);
        assert_eq!(eqs[0].tex, "\na &= b \\text{ if $c$}\n");
        assert!(eqs[0].display);
        assert_eq!(eqs[1].tex, "d");
        assert_eq!(eqs[1].index, 1);
    }

    #[test]
    fn test_non_math_environment_ignored() {
        let eqs = extract_equations(r"\begin{itemize}\item $q$\end{itemize}").unwrap();
        assert_eq!(eqs.len(), 1);
        assert_eq!(eqs[0].tex, "q");
    }

    #[test]
    fn test_no_equations() {
        assert!(extract_equations("plain prose").unwrap().is_empty());
    }
}
