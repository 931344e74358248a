//! [`DirectoryStore`] against a real pipeline data directory.

use std::fs;
use std::path::Path;

use paperloc_core::Locatable;
use paperloc_ingest::{
    DetectedEntity, Diagnostic, DirectoryStore, EntitySchema, IngestError, PaperAssembler,
    PaperStore, SchemaMapping,
};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Two papers for entity type `terms`; the second has no external id.
fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(&root.join("s2-metadata/2101.00001/s2_id"), "s2-abc\n");
    write(
        &root.join("detected-terms/2101.00001/entities-terms.csv"),
        "id,tex_path,start,end,tex,context_tex,name,term_type\n\
         term-0,main.tex,10,20,attention,ctx,attention,noun\n\
         term-1,main.tex,30,40,encoder,ctx,encoder,\n",
    );
    write(
        &root.join("detected-terms/2101.00001/entities-abbreviations.csv"),
        "id,tex_path,extra_column\n\
         term-0,appendix.tex,ignored\n",
    );
    write(
        &root.join("detected-terms/2101.00001/notes.txt"),
        "not an entity file",
    );
    write(
        &root.join("terms-locations/2101.00001/entity_locations.csv"),
        "tex_path,iteration,hue,entity_id,page,left,top,width,height,relative_file_path\n\
         main.tex,0,0.1,term-0,0,0.10,0.20,0.05,0.01,main.pdf\n\
         appendix.tex,0,0.1,term-0,5,0.30,0.40,0.05,0.01,main.pdf\n\
         main.tex,1,0.2,term-0,1,0.50,0.60,0.05,0.01,main.pdf\n",
    );

    write(
        &root.join("detected-terms/hep-th__9901001/entities-terms.csv"),
        "id,tex_path\nterm-0,main.tex\n",
    );
    write(
        &root.join("terms-locations/hep-th__9901001/entity_locations.csv"),
        "tex_path,iteration,hue,entity_id,page,left,top,width,height,relative_file_path\n",
    );
    dir
}

#[test]
fn discovers_papers_from_locations_dir() {
    let dir = fixture();
    let store = DirectoryStore::new(dir.path(), "terms");
    assert_eq!(
        store.paper_ids().unwrap(),
        vec!["2101.00001".to_string(), "hep-th/9901001".to_string()]
    );
}

#[test]
fn no_locations_dir_means_no_papers() {
    let dir = tempfile::tempdir().unwrap();
    let store = DirectoryStore::new(dir.path(), "terms");
    assert!(store.paper_ids().unwrap().is_empty());
}

#[test]
fn entity_files_follow_glob() {
    let dir = fixture();
    let store = DirectoryStore::new(dir.path(), "terms");
    let names: Vec<String> = store
        .entity_files("2101.00001")
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["entities-abbreviations.csv", "entities-terms.csv"]);

    let only_terms = DirectoryStore::new(dir.path(), "terms").with_entity_glob("*-terms.csv");
    assert_eq!(only_terms.entity_files("2101.00001").unwrap().len(), 1);
}

#[test]
fn reads_rows_with_schema() {
    let dir = fixture();
    let store = DirectoryStore::new(dir.path(), "terms");
    let files = store.entity_files("2101.00001").unwrap();
    let terms = store.read_entities(&files[1], EntitySchema::Term).unwrap();
    assert_eq!(terms.len(), 2);
    match &terms[0] {
        DetectedEntity::Term(t) => {
            assert_eq!(t.name, "attention");
            assert_eq!(t.term_type.as_deref(), Some("noun"));
            assert_eq!((t.start, t.end), (10, 20));
        }
        other => panic!("expected term, got {other:?}"),
    }
    match &terms[1] {
        DetectedEntity::Term(t) => assert_eq!(t.term_type, None),
        other => panic!("expected term, got {other:?}"),
    }
}

#[test]
fn end_to_end_localize() {
    let dir = fixture();
    let store = DirectoryStore::new(dir.path(), "terms");
    let schemas = SchemaMapping::by_file_name([("entities-terms.csv", EntitySchema::Term)]);
    let assembler = PaperAssembler::new(store).with_schemas(Some(schemas));

    let outcome = assembler.assemble("2101.00001").unwrap();
    assert!(matches!(
        outcome.diagnostics.as_slice(),
        [Diagnostic::UnresolvedSchema { .. }]
    ));
    let result = outcome.result.unwrap();
    assert_eq!(result.external_id, "s2-abc");

    let entities = &result.localized_entities;
    assert_eq!(entities.len(), 3);

    // entities-abbreviations.csv sorts first and is read generically.
    assert!(matches!(entities[0].entity, DetectedEntity::Generic(_)));
    assert_eq!(entities[0].entity.source_path(), "appendix.tex");
    assert_eq!(entities[0].locations.len(), 1);
    assert_eq!(entities[0].locations[0].page, 5);

    assert_eq!(entities[1].entity.id(), "term-0");
    let pages: Vec<u32> = entities[1].locations.iter().map(|l| l.page).collect();
    assert_eq!(pages, vec![0, 1]);
    let right = entities[1].locations[0].bounding_box().right();
    assert!((right - 0.15).abs() < 1e-9);

    assert!(entities[2].locations.is_empty());
}

#[test]
fn paper_without_external_id_is_skipped() {
    let dir = fixture();
    let assembler = PaperAssembler::new(DirectoryStore::new(dir.path(), "terms"));
    let outcome = assembler.assemble("hep-th/9901001").unwrap();
    assert!(outcome.is_skipped());
}

#[test]
fn malformed_csv_is_an_error() {
    let dir = fixture();
    write(
        &dir.path().join("terms-locations/2101.00001/entity_locations.csv"),
        "tex_path,entity_id,page,left,top,width,height\nmain.tex,term-0,not-a-page,0,0,0,0\n",
    );
    let assembler = PaperAssembler::new(DirectoryStore::new(dir.path(), "terms"))
        .with_schemas(Some(SchemaMapping::Single(EntitySchema::Generic)));
    let err = assembler.assemble("2101.00001").unwrap_err();
    assert!(matches!(err, IngestError::Csv { .. }));
    assert!(err.to_string().contains("entity_locations.csv"));
}
