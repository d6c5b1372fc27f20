//! Architecture contract tests.

mod support;

use support::architecture::{find_lines_containing, path_exists};

#[test]
fn domain_has_no_driver_or_outer_layer_imports() {
    let hits = find_lines_containing(
        "src/domain",
        &[
            "crate::adapter",
            "crate::infrastructure",
            "diesel::",
            "mongodb::",
            "tokio::",
        ],
    );

    assert!(
        hits.is_empty(),
        "found forbidden imports in domain layer: {hits:#?}"
    );
}

#[test]
fn ports_depend_only_on_domain() {
    let hits = find_lines_containing(
        "src/port",
        &["crate::adapter", "crate::infrastructure", "diesel::", "mongodb::"],
    );

    assert!(
        hits.is_empty(),
        "found forbidden imports in port layer: {hits:#?}"
    );
}

#[test]
fn backends_do_not_import_each_other() {
    let sql_hits = find_lines_containing("src/adapter/outbound/sqlite", &["outbound::mongo", "mongodb::"]);
    let doc_hits = find_lines_containing("src/adapter/outbound/mongo", &["outbound::sqlite", "diesel::"]);

    assert!(sql_hits.is_empty(), "sqlite backend imports mongo: {sql_hits:#?}");
    assert!(doc_hits.is_empty(), "mongo backend imports sqlite: {doc_hits:#?}");
}

#[test]
fn storage_contract_lives_in_outbound_port() {
    assert!(path_exists("src/port/outbound/store.rs"));
    assert!(path_exists("src/port/outbound/filter.rs"));
}

#[test]
fn backends_are_registered_only_in_the_factory() {
    let hits = find_lines_containing(
        "src/adapter/inbound",
        &["MongoStorage::connect", "SqlStorage::new"],
    );

    assert!(
        hits.is_empty(),
        "inbound adapters should build storage through StorageFactory: {hits:#?}"
    );
}
