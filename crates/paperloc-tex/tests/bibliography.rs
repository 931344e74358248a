//! End-to-end bibliography extraction on realistic `.tex` / `.bbl` input.

use std::io::Write;

use paperloc_tex::{Bibitem, TexError, extract_bibitems, extract_bibitems_from_file};

const NATBIB_BBL: &str = r"\begin{thebibliography}{3}
\providecommand{\natexlab}[1]{#1}

\bibitem[Vaswani et~al.(2017)]{vaswani2017}
Ashish Vaswani, Noam Shazeer, and Niki Parmar.
\newblock Attention is all you need.
\newblock In \emph{Advances in Neural Information Processing Systems}, 2017.

\bibitem[Devlin et~al.(2019)]{devlin2019}
Jacob Devlin, Ming-Wei Chang, Kenton Lee, and Kristina Toutanova.
\newblock BERT: Pre-training of deep bidirectional transformers.
% a stray comment
\newblock In \emph{NAACL}, 2019.

\bibitem{nolabel-ok} Short entry.

\end{thebibliography}
";

#[test]
fn natbib_bbl_entries() {
    let items = extract_bibitems(NATBIB_BBL).unwrap();
    let keys: Vec<&str> = items.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["vaswani2017", "devlin2019", "nolabel-ok"]);

    assert!(items[0].text.starts_with("Ashish Vaswani, Noam Shazeer"));
    assert!(items[0].text.contains("Attention is all you need."));
    assert!(items[0].text.contains("Advances in Neural Information Processing Systems"));
    assert!(items[0].text.ends_with("2017."));
    assert!(!items[0].text.contains('\n'));
    assert!(!items[0].text.contains("  "));

    assert!(items[1].text.contains("NAACL"));
    assert!(!items[1].text.contains("stray comment"));
    assert_eq!(items[2], Bibitem::new("nolabel-ok", "Short entry."));
}

#[test]
fn from_file() {
    let mut file = tempfile::Builder::new().suffix(".bbl").tempfile().unwrap();
    file.write_all(NATBIB_BBL.as_bytes()).unwrap();
    let items = extract_bibitems_from_file(file.path()).unwrap();
    assert_eq!(items.len(), 3);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = extract_bibitems_from_file(&dir.path().join("absent.tex")).unwrap_err();
    assert!(matches!(err, TexError::Io(_)));
}

#[test]
fn malformed_tex_is_parse_error() {
    let err = extract_bibitems("\\begin{thebibliography}{1}\n\\bibitem{a} A.\n").unwrap_err();
    match err {
        TexError::Parse(e) => assert_eq!(e.line, 1),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn bibitems_serialize_as_key_and_text() {
    let items = extract_bibitems(r"\bibitem{a} Alpha.").unwrap();
    let json = serde_json::to_string(&items).unwrap();
    assert_eq!(json, r#"[{"key":"a","text":"Alpha."}]"#);
}
