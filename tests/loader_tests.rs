//! Integration tests for source loading

use difschema::{load_xml, Error, Limits, Loader, Schema, SchemaConfig};
use std::io::Write;
use tempfile::NamedTempFile;

const VALID_RECORD: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/dif_record.xml");
const INVALID_RECORDS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/invalid_dif.xml");

#[test]
fn test_load_fixture_record() {
    let document = load_xml(VALID_RECORD, false).unwrap().unwrap();
    let root = document.root().unwrap();

    assert_eq!(root.local_name(), "DIF");
    assert_eq!(root.find_child("Entry_ID").unwrap().text(), "NPI_sea-ice_thickness_2011");
    // Whitespace-only text between elements is dropped
    assert_eq!(root.text(), "");
}

#[test]
fn test_concatenated_records_are_kept() {
    let document = load_xml(INVALID_RECORDS, false).unwrap().unwrap();
    assert_eq!(document.elements.len(), 2);
    assert_eq!(document.records("DIF").len(), 2);
}

#[test]
fn test_empty_source_is_a_no_op() {
    assert!(load_xml("", false).unwrap().is_none());
    assert!(load_xml("  \n", false).unwrap().is_none());
}

#[test]
fn test_unusable_sources_are_invalid() {
    for source in ["<DIF><Entry_ID></DIF>", "no/such/file.xml", "just text"] {
        assert!(
            matches!(load_xml(source, false), Err(Error::InvalidSource)),
            "accepted {:?}",
            source
        );
    }
    assert!(matches!(load_xml("<DIF/>", true), Err(Error::InvalidSource)));
}

#[test]
fn test_invalid_source_has_fixed_message() {
    let err = load_xml("<broken", false).unwrap_err();
    assert_eq!(err.to_string(), "Invalid Source");
}

#[test]
fn test_loader_limits() {
    let loader = Loader::new().with_limits(Limits {
        max_xml_size: 64,
        ..Limits::default()
    });
    assert!(matches!(
        loader.load_xml(VALID_RECORD, false),
        Err(Error::InvalidSource)
    ));
}

#[test]
fn test_schema_from_temp_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="Note" type="xs:string"/>
           </xs:schema>"#
    )
    .unwrap();

    let schema = Schema::from_source(file.path().to_str().unwrap()).unwrap();
    assert_eq!(schema.root().unwrap(), "Note");
    assert_eq!(schema.schema_location(), None);
}

#[test]
fn test_schema_source_errors() {
    assert!(matches!(
        Schema::from_source("<xs:schema"),
        Err(Error::InvalidSource)
    ));
    assert!(matches!(Schema::from_source(""), Err(Error::InvalidSource)));
    assert!(matches!(
        Schema::new(
            SchemaConfig::new("http://gcmd.gsfc.nasa.gov/Aboutus/xml/dif/dif_v9.8.4.xsd")
                .with_allow_remote(false)
        ),
        Err(Error::InvalidSource)
    ));
}
