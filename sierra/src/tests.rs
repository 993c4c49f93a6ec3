use crate::client::Catalog;
use crate::common::batch::{Reclassifier, UnitOutcome};
use crate::common::callnumber;
use crate::common::reclass;
use crate::common::worklist::{WorkList, WorkUnit};
use crate::conf::Credentials;
use crate::csvlog::{self, AuditEntry, CsvSink, ReclassSink};
use crate::record::{Bib, Item};
use crate::result::{SierraError, SierraResult};
use crate::varfield::{self, VarField};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

const LPA_LOCATION: &str = "pam11";
const OFFSITE_LOCATION: &str = "rcmb8";
const ITEM_LINK_PREFIX: &str = "https://example.org/iii/sierra-api/v6/items/";

const BIB_JSON: &str = r#"{
    "varFields": [
        {
            "fieldTag": "c",
            "marcTag": "852",
            "ind1": "8",
            "ind2": " ",
            "subfields": [
                {"tag": "h", "content": "FOO, BAR"},
                {"tag": "m", "content": "SPAM"}
            ]
        },
        {
            "fieldTag": "q",
            "marcTag": "852",
            "ind1": "8",
            "ind2": " ",
            "subfields": [
                {"tag": "h", "content": "BAZ."},
                {"tag": "z", "content": "QUX"}
            ]
        },
        {"fieldTag": "y", "marcTag": "008", "content": "740221s1973    enk"}
    ],
    "items": [
        "https://example.org/iii/sierra-api/v6/items/14381985",
        "https://example.org/iii/sierra-api/v6/items/14381986"
    ]
}"#;

const ITEMS_JSON: &str = r#"{
    "total": 2,
    "entries": [
        {
            "id": "14381985",
            "location": {"code": "pam11", "name": "Performing Arts - Music Reference"},
            "varFields": [
                {"fieldTag": "b", "content": "33433099346542"},
                {
                    "fieldTag": "c",
                    "marcTag": "852",
                    "ind1": "8",
                    "ind2": " ",
                    "subfields": [{"tag": "h", "content": "FOO, BAR"}]
                }
            ]
        },
        {
            "id": "14381986",
            "location": {"code": "rcmb8", "name": "Offsite"},
            "varFields": [
                {
                    "fieldTag": "c",
                    "marcTag": "852",
                    "ind1": "8",
                    "ind2": " ",
                    "subfields": [{"tag": "h", "content": "BAZ"}]
                }
            ]
        }
    ]
}"#;

fn call_number(field_tag: &str, ind1: &str, subfields: &[(&str, &str)]) -> VarField {
    let mut field = VarField::new(field_tag, "852").unwrap();
    field.set_ind1(ind1).unwrap();
    for (code, content) in subfields {
        field.add_subfield(*code, *content).unwrap();
    }
    field
}

fn legacy_call_number(field_tag: &str, value: &str) -> VarField {
    call_number(field_tag, "8", &[("h", value)])
}

fn barcode(value: &str) -> VarField {
    VarField::new_content("b", value).unwrap()
}

fn item(id: &str, location: &str, var_fields: Vec<VarField>) -> Item {
    Item::new(id, Some(location), var_fields)
}

fn bib(id: &str, var_fields: Vec<VarField>, items: &[Item]) -> Bib {
    let links = items
        .iter()
        .map(|i| format!("{ITEM_LINK_PREFIX}{}", i.id()))
        .collect();
    Bib::new(id, var_fields, links)
}

fn unit(bib_id: &str, classification: &str) -> WorkUnit {
    WorkUnit {
        bib_id: bib_id.to_string(),
        special_cutter: false,
        classification: classification.to_string(),
    }
}

fn temp_file(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("sierra-test-{}-{name}", std::process::id()));
    let _ = fs::remove_file(&path);
    path
}

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Default)]
struct MockCatalog {
    bibs: HashMap<String, Bib>,
    items: HashMap<String, Item>,
    broken_bibs: HashSet<String>,
    broken_items: HashSet<String>,
    rejected_items: HashSet<String>,
    malformed_bibs: HashSet<String>,
    malformed_items: HashSet<String>,
    reject_bib_updates: bool,
    item_requests: Vec<Vec<String>>,
    item_updates: Vec<(String, Vec<VarField>)>,
    bib_updates: Vec<(String, Vec<VarField>)>,
}

impl MockCatalog {
    fn add_bib(&mut self, bib: Bib, items: Vec<Item>) {
        for item in items {
            self.items.insert(item.id().to_string(), item);
        }
        self.bibs.insert(bib.id().to_string(), bib);
    }

    fn updated_item(&self, item_id: &str) -> Option<&[VarField]> {
        self.item_updates
            .iter()
            .find(|(id, _)| id == item_id)
            .map(|(_, fields)| fields.as_slice())
    }
}

impl Catalog for MockCatalog {
    fn get_bib(&mut self, bib_id: &str) -> SierraResult<Bib> {
        if self.broken_bibs.contains(bib_id) {
            return Err(SierraError::remote(Some(500), "Internal Server Error"));
        }
        if self.malformed_bibs.contains(bib_id) {
            return Err(SierraError::invalid("varField requires exactly one of subfields or content"));
        }
        self.bibs
            .get(bib_id)
            .cloned()
            .ok_or_else(|| SierraError::BibNotFound(bib_id.to_string()))
    }

    fn get_items(&mut self, item_ids: &[String]) -> SierraResult<Vec<Item>> {
        self.item_requests.push(item_ids.to_vec());

        if item_ids.iter().any(|id| self.broken_items.contains(id)) {
            return Err(SierraError::remote(None, "operation timed out"));
        }

        Ok(item_ids
            .iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect())
    }

    fn update_item(&mut self, item_id: &str, var_fields: &[VarField]) -> SierraResult<()> {
        if self.rejected_items.contains(item_id) {
            return Err(SierraError::remote(Some(400), "Bad Request"));
        }
        if self.malformed_items.contains(item_id) {
            return Err(SierraError::invalid("Invalid byte count for string s=cc"));
        }
        self.item_updates
            .push((item_id.to_string(), var_fields.to_vec()));
        Ok(())
    }

    fn update_bib(&mut self, bib_id: &str, var_fields: &[VarField]) -> SierraResult<()> {
        if self.reject_bib_updates {
            return Err(SierraError::remote(Some(500), "Internal Server Error"));
        }
        self.bib_updates.push((bib_id.to_string(), var_fields.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
struct MemorySink {
    audit: Vec<AuditEntry>,
    failed: Vec<(String, String)>,
}

impl ReclassSink for MemorySink {
    fn audit(&mut self, entry: &AuditEntry) -> SierraResult<()> {
        self.audit.push(entry.clone());
        Ok(())
    }

    fn item_failed(&mut self, bib_id: &str, item_id: &str) -> SierraResult<()> {
        self.failed.push((bib_id.to_string(), item_id.to_string()));
        Ok(())
    }
}

/// One LPA reference item and one offsite item, each with their own
/// call number, and a bib carrying both.
fn standard_catalog() -> MockCatalog {
    let items = vec![
        item(
            "1",
            LPA_LOCATION,
            vec![barcode("33433000000001"), legacy_call_number("c", "FOO, BAR")],
        ),
        item("2", OFFSITE_LOCATION, vec![legacy_call_number("c", "BAZ")]),
    ];

    let bib = bib(
        "1000001",
        vec![
            legacy_call_number("q", "FOO, BAR"),
            legacy_call_number("q", "BAZ."),
        ],
        &items,
    );

    let mut catalog = MockCatalog::default();
    catalog.add_bib(bib, items);
    catalog
}

fn new_reclassifier(catalog: MockCatalog) -> Reclassifier<MockCatalog, MemorySink> {
    Reclassifier::new(catalog, MemorySink::default())
}

#[test]
fn extract_call_number_skips_notes() {
    let field = call_number(
        "c",
        "8",
        &[("h", " FOO, "), ("i", "BAR "), ("m", "SPAM"), ("z", "QUX")],
    );
    assert_eq!(callnumber::extract_call_number(&field), "FOO, BAR");
}

#[test]
fn normalize_is_idempotent() {
    for value in ["FOO, BAR", " *ZP-*PYO+ n.c. 2, no. 7 ", "(\"quoted\")", ""] {
        let once = callnumber::normalize(value);
        assert_eq!(callnumber::normalize(&once), once);
    }
}

#[test]
fn split_classification_fallbacks() {
    assert_eq!(
        callnumber::split_classification("ML 100", false).unwrap(),
        ("ML".to_string(), "100".to_string())
    );

    let err = callnumber::split_classification("ML100", false).unwrap_err();
    assert!(matches!(err, SierraError::InvalidArgument(_)));

    assert!(callnumber::split_classification("ML101.G7", true).is_err());
}

#[test]
fn call_number_field_requires_known_tag() {
    let field = callnumber::call_number_field("ML100", ".G13 2019", "c").unwrap();
    assert_eq!(field.ind1(), "0");
    assert_eq!(field.ind2(), "1");
    assert_eq!(field.subfields()[0].code(), "h");
    assert_eq!(field.subfields()[1].content(), ".G13 2019");

    assert!(callnumber::call_number_field("ML100", ".G13 2019", "x").is_err());
}

#[test]
fn salvage_note_shape() {
    let field = callnumber::salvage_note_field("FOO, BAR").unwrap();
    assert_eq!(field.field_tag(), "l");
    assert_eq!(field.marc_tag(), Some("947"));
    assert_eq!(field.ind1(), " ");
    assert_eq!(field.ind2(), " ");
    assert_eq!(field.subfields()[0].code(), "a");
    assert_eq!(field.subfields()[0].content(), "FOO, BAR");
}

#[test]
fn safe_to_delete_excludes_shared_call_numbers() {
    let items = vec![
        item("1", LPA_LOCATION, vec![legacy_call_number("c", "FOO, BAR")]),
        item("2", OFFSITE_LOCATION, vec![legacy_call_number("c", "BAZ")]),
    ];
    assert_eq!(reclass::safe_to_delete_call_numbers(&items), set(&["FOO BAR"]));

    // Same call number punctuated differently in another location.
    let items = vec![
        item("1", LPA_LOCATION, vec![legacy_call_number("c", "FOO, BAR")]),
        item("2", OFFSITE_LOCATION, vec![legacy_call_number("c", "FOO BAR.")]),
    ];
    assert!(reclass::safe_to_delete_call_numbers(&items).is_empty());
    assert_eq!(reclass::other_location_call_numbers(&items), set(&["FOO BAR"]));
}

#[test]
fn safe_to_delete_ignores_items_without_location() {
    let items = vec![
        item("1", LPA_LOCATION, vec![legacy_call_number("c", "FOO")]),
        Item::new("2", None, vec![legacy_call_number("c", "FOO")]),
    ];

    // No location means not a reference item.
    assert!(reclass::safe_to_delete_call_numbers(&items).is_empty());
}

#[test]
fn updated_items_are_skipped() {
    let done = item(
        "1",
        LPA_LOCATION,
        vec![call_number("c", "0", &[("h", "ML100"), ("i", ".G13")])],
    );
    let todo = item("2", LPA_LOCATION, vec![legacy_call_number("c", "FOO")]);
    let offsite = item("3", OFFSITE_LOCATION, vec![legacy_call_number("c", "FOO")]);

    assert!(!reclass::item_needs_reclass(&done));
    assert!(reclass::item_needs_reclass(&todo));
    assert!(!reclass::item_needs_reclass(&offsite));
}

#[test]
fn change_item_call_number_replaces_field() {
    let item = item(
        "1",
        LPA_LOCATION,
        vec![barcode("33433000000001"), legacy_call_number("c", "FOO, BAR")],
    );
    let new_field = callnumber::call_number_field("ML100", ".G13 2019", "c").unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

    let fields = reclass::change_item_call_number_on(&item, &new_field, date).unwrap();

    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0].content(), Some("33433000000001"));
    assert_eq!(fields[1], new_field);
    assert_eq!(
        fields[2].content(),
        Some("Reclassified by CAT/mus, 2024-03-09 (former classmark: FOO, BAR)")
    );

    // Input untouched.
    assert_eq!(item.var_fields().len(), 2);
}

#[test]
fn change_item_call_number_without_call_number() {
    let item = item("1", LPA_LOCATION, vec![barcode("33433000000001")]);
    let new_field = callnumber::call_number_field("ML100", ".G13", "c").unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

    let fields = reclass::change_item_call_number_on(&item, &new_field, date).unwrap();

    assert_eq!(
        fields[2].content(),
        Some("Reclassified by CAT/mus, 2024-03-09 (former classmark: MISSING on item)")
    );
}

#[test]
fn change_item_call_number_multiple_call_numbers() {
    let item = item(
        "14381985",
        LPA_LOCATION,
        vec![
            legacy_call_number("c", "FOO"),
            legacy_call_number("c", "BAR"),
        ],
    );
    let new_field = callnumber::call_number_field("ML100", ".G13", "c").unwrap();

    let err = reclass::change_item_call_number(&item, &new_field).unwrap_err();
    assert!(err.is_multi_call_num());
    assert_eq!(err.to_string(), "Item 14381985 has multiple call number fields");
}

#[test]
fn dedup_orphans_by_normalized_value() {
    let orphans = set(&["FOO, BAR", "FOO BAR", "BAZ"]);
    assert_eq!(reclass::dedup_orphan_call_numbers(&orphans), set(&["BAZ", "FOO BAR"]));
}

#[test]
fn rewrite_bib_fields_salvages_deleted_call_numbers() {
    let title = VarField::new_content("t", "Symphonies").unwrap();
    let fields = vec![
        title.clone(),
        legacy_call_number("q", "FOO, BAR"),
        legacy_call_number("c", "FOO BAR"),
        legacy_call_number("q", "BAZ."),
    ];

    let rewritten =
        reclass::rewrite_bib_fields(&fields, &set(&["FOO BAR"]), &set(&["BAZ"])).unwrap();

    assert_eq!(rewritten.len(), 3);
    assert_eq!(rewritten[0], title);
    assert_eq!(callnumber::extract_call_number(&rewritten[1]), "BAZ.");

    // Two originals, one salvage note.
    assert_eq!(rewritten[2].marc_tag(), Some("947"));
    assert_eq!(rewritten[2].subfields()[0].content(), "FOO BAR");
}

#[test]
fn unconfirmed_call_numbers_are_reported() {
    let fields = vec![
        legacy_call_number("q", "FOO, BAR"),
        legacy_call_number("q", "BAZ"),
        legacy_call_number("q", "MYSTERY"),
    ];

    let unconfirmed =
        reclass::unconfirmed_call_numbers(&fields, &set(&["FOO BAR"]), &set(&["BAZ"]));

    assert_eq!(unconfirmed, vec!["MYSTERY".to_string()]);
}

#[test]
fn parse_bib_and_items() {
    let value = json::parse(BIB_JSON).unwrap();
    let bib = Bib::from_json_value("1000001", &value).unwrap();

    assert_eq!(bib.id(), "1000001");
    assert_eq!(bib.var_fields().len(), 3);
    assert_eq!(bib.item_ids(), vec!["14381985", "14381986"]);
    assert_eq!(
        callnumber::call_numbers(bib.var_fields()),
        set(&["BAZ", "FOO BAR"])
    );

    let value = json::parse(ITEMS_JSON).unwrap();
    let items: Vec<Item> = value["entries"]
        .members()
        .map(|v| Item::from_json_value(v).unwrap())
        .collect();

    assert_eq!(items[0].id(), "14381985");
    assert_eq!(items[0].location_code(), Some("pam11"));
    assert!(callnumber::is_lpa_ref_location(&items[0]));
    assert!(!callnumber::is_lpa_ref_location(&items[1]));
    assert_eq!(reclass::safe_to_delete_call_numbers(&items), set(&["FOO BAR"]));
}

#[test]
fn parse_bad_var_fields() {
    let both = json::object! {
        "fieldTag": "c",
        "content": "FOO",
        "subfields": []
    };
    assert!(VarField::from_json_value(&both).is_err());

    let neither = json::object! { "fieldTag": "c", "marcTag": "852" };
    assert!(VarField::from_json_value(&neither).is_err());

    let bad_tag = json::object! { "fieldTag": "cc", "content": "FOO" };
    assert!(VarField::from_json_value(&bad_tag).is_err());

    assert!(varfield::var_fields_from_json(&json::object! {"fieldTag": "c"}).is_err());
    assert!(varfield::var_fields_from_json(&json::JsonValue::Null)
        .unwrap()
        .is_empty());
}

#[test]
fn update_body_shape() {
    let note = VarField::new_content("x", "Hello").unwrap();
    let body = varfield::var_fields_update_body(&[note]);

    assert_eq!(body["varFields"][0]["fieldTag"], "x");
    assert_eq!(body["varFields"][0]["content"], "Hello");
    assert!(body["varFields"][0]["marcTag"].is_null());
}

#[test]
fn reclass_one_bib() {
    let mut reclassifier = new_reclassifier(standard_catalog());

    let report = reclassifier
        .process_unit(&unit("1000001", "ML100.G13 2019"))
        .unwrap();

    assert_eq!(report.outcome, UnitOutcome::Updated);
    assert_eq!(report.items_updated, vec!["1".to_string()]);
    assert_eq!(report.items_failed, 0);

    // bib read, item read, item update, bib update
    assert_eq!(report.requests, 4);

    let catalog = reclassifier.catalog();

    // Only the reference item changes.
    assert_eq!(catalog.item_updates.len(), 1);
    let fields = catalog.updated_item("1").unwrap();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0].content(), Some("33433000000001"));
    assert_eq!(fields[1].ind1(), "0");
    assert_eq!(callnumber::extract_call_number(&fields[1]), "ML100 .G13 2019");
    let note = fields[2].content().unwrap();
    assert!(note.starts_with("Reclassified by CAT/mus, "));
    assert!(note.ends_with("(former classmark: FOO, BAR)"));

    let (bib_id, fields) = &catalog.bib_updates[0];
    assert_eq!(bib_id, "1000001");
    assert_eq!(fields.len(), 3);
    assert_eq!(callnumber::extract_call_number(&fields[0]), "BAZ.");
    assert_eq!(fields[1].marc_tag(), Some("947"));
    assert_eq!(fields[1].subfields()[0].content(), "FOO, BAR");
    assert_eq!(fields[2].field_tag(), "q");
    assert_eq!(fields[2].ind1(), "0");

    match &reclassifier.sink().audit[0] {
        AuditEntry::Completed {
            bib_id,
            item_ids,
            requests,
            ..
        } => {
            assert_eq!(bib_id, "1000001");
            assert_eq!(item_ids, &vec!["1".to_string()]);
            assert_eq!(*requests, 4);
        }
        e => panic!("Unexpected audit entry: {e:?}"),
    }
}

#[test]
fn reclass_without_orphans() {
    let items = vec![
        item("1", LPA_LOCATION, vec![legacy_call_number("c", "FOO BAR")]),
        item("2", OFFSITE_LOCATION, vec![legacy_call_number("c", "BAZ")]),
    ];

    let mut catalog = MockCatalog::default();
    catalog.add_bib(bib("1000001", vec![legacy_call_number("q", "BAZ")], &items), items);

    let mut reclassifier = new_reclassifier(catalog);
    reclassifier
        .process_unit(&unit("1000001", "ML200.X5"))
        .unwrap();

    let catalog = reclassifier.catalog();

    let fields = catalog.updated_item("1").unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].subfields()[0].content(), "ML200");
    assert_eq!(fields[0].subfields()[1].content(), ".X5");
    assert!(fields[1].content().unwrap().contains("(former classmark: FOO BAR)"));

    let (_, fields) = &catalog.bib_updates[0];
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0], legacy_call_number("q", "BAZ"));
    assert_eq!(fields[1].field_tag(), "q");
    assert!(fields.iter().all(|f| f.marc_tag() != Some("947")));
}

#[test]
fn items_fetched_in_batches() {
    let items: Vec<Item> = (1..=7)
        .map(|n| item(&n.to_string(), OFFSITE_LOCATION, vec![]))
        .collect();

    let mut catalog = MockCatalog::default();
    catalog.add_bib(bib("1000001", vec![], &items), items);

    let mut reclassifier = new_reclassifier(catalog);
    let report = reclassifier
        .process_unit(&unit("1000001", "ML100.G13"))
        .unwrap();

    let requests = &reclassifier.catalog().item_requests;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], vec!["1", "2", "3", "4", "5"]);
    assert_eq!(requests[1], vec!["6", "7"]);

    // Nothing to update; no bib update either.
    assert_eq!(report.outcome, UnitOutcome::NothingToUpdate);
    assert_eq!(report.requests, 3);
    assert!(reclassifier.catalog().bib_updates.is_empty());
    assert_eq!(reclassifier.sink().audit[0].to_row()[3], "0");
}

#[test]
fn bib_not_found_is_logged() {
    let mut reclassifier = new_reclassifier(standard_catalog());

    let summary = reclassifier
        .run(vec![Ok(unit("999", "ML100.G13")), Ok(unit("1000001", "ML100.G13"))])
        .unwrap();

    assert_eq!(summary.units_processed, 2);
    assert_eq!(summary.bibs_not_found, 1);
    assert_eq!(summary.bibs_updated, 1);

    let row = reclassifier.sink().audit[0].to_row();
    assert_eq!(row[1], "999");
    assert_eq!(row[3], csvlog::BIB_NOT_FOUND_MARKER);
}

#[test]
fn unreadable_bib_and_items_skip_the_unit() {
    let mut catalog = standard_catalog();
    catalog.broken_bibs.insert("1000001".to_string());

    let mut reclassifier = new_reclassifier(catalog);
    let report = reclassifier
        .process_unit(&unit("1000001", "ML100.G13"))
        .unwrap();

    assert_eq!(report.outcome, UnitOutcome::BibNotRetrieved);
    assert_eq!(
        reclassifier.sink().audit[0].to_row()[3],
        csvlog::BIB_NOT_RETRIEVED_MARKER
    );

    let mut catalog = standard_catalog();
    catalog.broken_items.insert("2".to_string());

    let mut reclassifier = new_reclassifier(catalog);
    let report = reclassifier
        .process_unit(&unit("1000001", "ML100.G13"))
        .unwrap();

    assert_eq!(report.outcome, UnitOutcome::ItemsNotRetrieved);
    assert!(reclassifier.catalog().item_updates.is_empty());
    assert_eq!(
        reclassifier.sink().audit[0].to_row()[3],
        csvlog::ITEMS_NOT_RETRIEVED_MARKER
    );
}

#[test]
fn failed_items_do_not_block_the_bib() {
    let items = vec![
        item("1", LPA_LOCATION, vec![legacy_call_number("c", "FOO")]),
        item(
            "2",
            LPA_LOCATION,
            vec![legacy_call_number("c", "FOO"), legacy_call_number("c", "BAR")],
        ),
        item("3", LPA_LOCATION, vec![legacy_call_number("c", "FOO")]),
    ];

    let mut catalog = MockCatalog::default();
    catalog.add_bib(bib("1000001", vec![legacy_call_number("q", "FOO")], &items), items);
    catalog.rejected_items.insert("3".to_string());

    let mut reclassifier = new_reclassifier(catalog);
    let report = reclassifier
        .process_unit(&unit("1000001", "ML100.G13"))
        .unwrap();

    assert_eq!(report.outcome, UnitOutcome::Updated);
    assert_eq!(report.items_updated, vec!["1".to_string()]);
    assert_eq!(report.items_failed, 2);

    assert_eq!(
        reclassifier.sink().failed,
        vec![
            ("1000001".to_string(), "2".to_string()),
            ("1000001".to_string(), "3".to_string()),
        ]
    );

    assert_eq!(reclassifier.catalog().bib_updates.len(), 1);
}

#[test]
fn no_updated_items_leaves_bib_alone() {
    let items = vec![item(
        "1",
        LPA_LOCATION,
        vec![legacy_call_number("c", "FOO"), legacy_call_number("c", "BAR")],
    )];

    let mut catalog = MockCatalog::default();
    catalog.add_bib(bib("1000001", vec![], &items), items);

    let mut reclassifier = new_reclassifier(catalog);
    let report = reclassifier
        .process_unit(&unit("1000001", "ML100.G13"))
        .unwrap();

    assert_eq!(report.outcome, UnitOutcome::NothingToUpdate);
    assert!(reclassifier.catalog().bib_updates.is_empty());
    assert_eq!(reclassifier.sink().failed.len(), 1);
}

#[test]
fn already_updated_items_are_not_touched() {
    let items = vec![item(
        "1",
        LPA_LOCATION,
        vec![call_number("c", "0", &[("h", "ML100"), ("i", ".G13")])],
    )];

    let mut catalog = MockCatalog::default();
    catalog.add_bib(bib("1000001", vec![], &items), items);

    let mut reclassifier = new_reclassifier(catalog);
    let report = reclassifier
        .process_unit(&unit("1000001", "ML100.G13"))
        .unwrap();

    assert_eq!(report.outcome, UnitOutcome::NothingToUpdate);
    assert!(reclassifier.catalog().item_updates.is_empty());
}

#[test]
fn dry_run_sends_no_updates() {
    let mut reclassifier = new_reclassifier(standard_catalog());
    reclassifier.set_dry_run(true);

    let summary = reclassifier
        .run(vec![Ok(unit("1000001", "ML100.G13"))])
        .unwrap();

    assert_eq!(summary.items_updated, 1);
    assert_eq!(summary.bibs_updated, 1);
    assert_eq!(summary.requests, 2);
    assert!(reclassifier.dry_run());
    assert!(reclassifier.catalog().item_updates.is_empty());
    assert!(reclassifier.catalog().bib_updates.is_empty());
}

#[test]
fn bib_update_failure_stops_the_run() {
    let mut catalog = standard_catalog();
    catalog.reject_bib_updates = true;

    let mut reclassifier = new_reclassifier(catalog);
    let err = reclassifier
        .run(vec![Ok(unit("1000001", "ML100.G13"))])
        .unwrap_err();

    assert!(err.is_remote());
    assert!(reclassifier.sink().audit.is_empty());
}

#[test]
fn invalid_bib_data_stops_the_run() {
    let mut catalog = standard_catalog();
    catalog.malformed_bibs.insert("1000001".to_string());

    let mut reclassifier = new_reclassifier(catalog);
    let err = reclassifier
        .run(vec![Ok(unit("1000001", "ML100.G13"))])
        .unwrap_err();

    assert!(matches!(err, SierraError::InvalidArgument(_)));
    assert!(reclassifier.sink().audit.is_empty());
    assert!(reclassifier.catalog().item_requests.is_empty());
}

#[test]
fn invalid_item_update_stops_the_run() {
    let mut catalog = standard_catalog();
    catalog.malformed_items.insert("1".to_string());

    let mut reclassifier = new_reclassifier(catalog);
    let err = reclassifier
        .run(vec![Ok(unit("1000001", "ML100.G13"))])
        .unwrap_err();

    assert!(matches!(err, SierraError::InvalidArgument(_)));

    // Not mistaken for a refused update.
    assert!(reclassifier.sink().failed.is_empty());
    assert!(reclassifier.catalog().bib_updates.is_empty());
}

#[test]
fn bad_classification_stops_before_any_request() {
    let mut reclassifier = new_reclassifier(standard_catalog());

    let err = reclassifier
        .process_unit(&unit("1000001", "ML100"))
        .unwrap_err();

    assert!(matches!(err, SierraError::InvalidArgument(_)));
    assert!(reclassifier.catalog().item_requests.is_empty());
    assert!(reclassifier.sink().audit.is_empty());
}

#[test]
fn malformed_row_stops_the_run() {
    let mut reclassifier = new_reclassifier(standard_catalog());

    let rows = vec![
        Err(SierraError::MalformedRow {
            line: 2,
            message: "short".to_string(),
        }),
        Ok(unit("1000001", "ML100.G13")),
    ];

    assert!(reclassifier.run(rows).is_err());
    assert!(reclassifier.catalog().bib_updates.is_empty());
}

#[test]
fn read_worklist() {
    let path = temp_file("worklist.csv");
    fs::write(
        &path,
        "row,bibNo,specialCutter,lcc\n\
        1,b1000001a,,ML100.G13 2019\n\
        2,\"b1000002a\",Yes - keep,ML101.G7 S64 1984\n\
        3,b1000003a\n",
    )
    .unwrap();

    let mut worklist = WorkList::open(&path).unwrap();

    assert_eq!(
        worklist.next().unwrap().unwrap(),
        WorkUnit {
            bib_id: "1000001".to_string(),
            special_cutter: false,
            classification: "ML100.G13 2019".to_string(),
        }
    );

    let unit = worklist.next().unwrap().unwrap();
    assert_eq!(unit.bib_id, "1000002");
    assert!(unit.special_cutter);

    let err = worklist.next().unwrap().unwrap_err();
    assert!(matches!(err, SierraError::MalformedRow { line: 4, .. }));

    assert!(worklist.next().is_none());

    // Reopening starts over.
    assert_eq!(WorkList::open(&path).unwrap().count(), 3);

    fs::remove_file(&path).unwrap();
}

#[test]
fn csv_sink_appends_rows() {
    let audit_path = temp_file("audit.csv");
    let error_path = temp_file("errors.csv");

    let entry = AuditEntry::Failed {
        timestamp: "2024-03-09 10:00:00.000000".to_string(),
        bib_id: "999".to_string(),
        classification: "ML100.G13".to_string(),
        marker: csvlog::BIB_NOT_FOUND_MARKER,
    };

    let mut sink = CsvSink::new(&audit_path, &error_path).unwrap();
    assert_eq!(sink.audit_path(), audit_path.as_path());
    assert_eq!(sink.error_path(), error_path.as_path());
    sink.audit(&entry).unwrap();
    sink.item_failed("1000001", "14381985").unwrap();

    // Header is not repeated for an existing log.
    let mut sink = CsvSink::new(&audit_path, &error_path).unwrap();
    sink.audit(&entry).unwrap();

    let audit = fs::read_to_string(&audit_path).unwrap();
    let lines: Vec<&str> = audit.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "timestamp,bibNo,lcc,items_updated,requests_made,elapsed_time,item_ids"
    );
    assert_eq!(
        lines[1],
        "2024-03-09 10:00:00.000000,999,ML100.G13,ERROR-BIB NOT FOUND"
    );

    assert_eq!(fs::read_to_string(&error_path).unwrap(), "1000001,14381985\n");

    fs::remove_file(&audit_path).unwrap();
    fs::remove_file(&error_path).unwrap();
}

#[test]
fn credentials_from_file() {
    let path = temp_file("creds.json");
    fs::write(
        &path,
        r#"{"client_id": "me", "client_secret": "shh", "host": "https://example.org/api", "timeout": 10}"#,
    )
    .unwrap();

    let located = Credentials::locate(path.to_str()).unwrap();
    assert_eq!(located, path);

    let creds = Credentials::from_json_file(&located).unwrap();
    assert_eq!(creds.client_id, "me");
    assert_eq!(creds.timeout, 10);

    fs::remove_file(&path).unwrap();

    assert!(Credentials::from_json_file(&path).is_err());
}
