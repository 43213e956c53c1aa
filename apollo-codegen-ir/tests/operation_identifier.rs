use pretty_assertions::assert_eq;
use pretty_assertions::assert_ne;
use sha2::Digest;
use sha2::Sha256;

use crate::support::build_ir;

fn identifier(document: &str, operation: &str) -> String {
    build_ir(document)
        .build_operation_named(Some(operation))
        .unwrap()
        .operation_identifier()
        .to_string()
}

#[test]
fn identifier_is_deterministic_lowercase_hex() {
    let document = r#"
        query Hero {
            hero {
                ...HeroName
            }
        }

        fragment HeroName on Character {
            name
        }
    "#;
    let first = identifier(document, "Hero");
    let second = identifier(document, "Hero");
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);
    assert!(
        first
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    );
}

#[test]
fn identifier_hashes_single_line_sources_in_reference_order() {
    let document = r#"
        query Hero {
            hero {
                ...B
                ...A
            }
        }

        fragment A on Character {
            name
        }

        fragment B on Character {
            id
        }
    "#;
    let mut ir = build_ir(document);
    let operation = ir.build_operation_named(Some("Hero")).unwrap();

    let mut hasher = Sha256::new();
    hasher.update("query Hero { hero { ...B ...A } }");
    hasher.update("\n");
    hasher.update("fragment B on Character { id }");
    hasher.update("\n");
    hasher.update("fragment A on Character { name }");
    assert_eq!(
        operation.operation_identifier().as_bytes(),
        hasher.finalize().as_slice()
    );
}

#[test]
fn identifier_depends_on_fragment_source() {
    let with_name = identifier(
        "query Hero { hero { ...Details } } fragment Details on Character { name }",
        "Hero",
    );
    let with_id = identifier(
        "query Hero { hero { ...Details } } fragment Details on Character { id }",
        "Hero",
    );
    assert_ne!(with_name, with_id);
}

#[test]
fn identifier_ignores_line_layout() {
    let compact = identifier("query Hero { hero { name } }", "Hero");
    let spread = identifier(
        r#"
        query Hero {
            hero {

                name
            }
        }
        "#,
        "Hero",
    );
    assert_eq!(compact, spread);
}

#[test]
fn identifier_is_computed_once() {
    let mut ir = build_ir("query Hero { hero { name } }");
    let operation = ir.build_operation_named(Some("Hero")).unwrap();
    let first = operation.operation_identifier();
    let second = operation.operation_identifier();
    assert!(std::ptr::eq(first, second));
    assert_eq!(operation.source(), "query Hero { hero { name } }");
}
