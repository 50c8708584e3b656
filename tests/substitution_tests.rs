//! End-to-end substitution passes over whole documents, through the public API only.

use gloss::ast::{
    AttrValue, Attributes, DocumentAuthor, DraftDocument, Element, FootnoteReference, FrontMatter,
    Line, RawDocument, Section,
};
use gloss::{apply_substitutions, Configuration, InlineGrammar, Warning};

fn paragraph(text: &str) -> Element {
    Element::paragraph(vec![vec![Element::text(text)]])
}

fn declaration(name: &str, value: &str) -> Element {
    Element::AttributeDeclaration {
        name: name.to_string(),
        value: AttrValue::String(value.to_string()),
    }
}

fn run(doc: RawDocument, config: &Configuration) -> DraftDocument {
    apply_substitutions(doc, config, &InlineGrammar).unwrap()
}

fn lines_of(element: &Element) -> &[Line] {
    match element {
        Element::Paragraph(p) => &p.lines,
        other => panic!("expected a paragraph, got {other:?}"),
    }
}

#[test]
fn declared_attributes_apply_in_document_order() {
    let draft = run(
        RawDocument::new(vec![
            declaration("product", "Gloss"),
            paragraph("Welcome to {product}"),
            paragraph("{late} arrives"),
            declaration("late", "now"),
            paragraph("{late} it is"),
        ]),
        &Configuration::new(),
    );

    assert_eq!(lines_of(&draft.elements[1]), &[vec![Element::text("Welcome to Gloss")]]);
    assert_eq!(lines_of(&draft.elements[2]), &[vec![Element::text("{late} arrives")]]);
    assert_eq!(lines_of(&draft.elements[4]), &[vec![Element::text("now it is")]]);
    assert_eq!(
        draft.warnings,
        vec![Warning::MissingAttribute {
            name: "late".to_string()
        }]
    );
    // declarations stay in the tree
    assert_eq!(draft.elements[0], declaration("product", "Gloss"));
}

#[test]
fn overrides_win_over_declarations() {
    let draft = run(
        RawDocument::new(vec![
            declaration("product", "Gloss"),
            paragraph("Welcome to {product}"),
        ]),
        &Configuration::new().with_attribute_override("product", "Override"),
    );
    assert_eq!(lines_of(&draft.elements[1]), &[vec![Element::text("Welcome to Override")]]);
    assert_eq!(
        draft.attributes.get("product"),
        Some(&AttrValue::String("Override".to_string()))
    );
}

#[test]
fn counters_continue_across_paragraphs() {
    let draft = run(
        RawDocument::new(vec![
            paragraph("{counter:step} {counter:other}"),
            paragraph("{counter:step}"),
        ]),
        &Configuration::new(),
    );
    assert_eq!(lines_of(&draft.elements[0]), &[vec![Element::text("1 1")]]);
    assert_eq!(lines_of(&draft.elements[1]), &[vec![Element::text("2")]]);
}

#[test]
fn front_matter_seeds_attributes() {
    let doc = RawDocument {
        front_matter: Some(FrontMatter::from_yaml("title: Hello\ndraft: true\n").unwrap()),
        elements: vec![paragraph("{title}")],
    };
    let draft = run(doc, &Configuration::new());
    assert_eq!(lines_of(&draft.elements[0]), &[vec![Element::text("Hello")]]);
    assert!(draft.front_matter.is_some());
}

#[test]
fn header_authors_become_attributes() {
    let header = Element::Section(Section {
        level: 0,
        attributes: Attributes::new().with(
            "authors",
            AttrValue::Authors(vec![DocumentAuthor {
                full_name: "Jane Ann Doe".to_string(),
                email: Some("jane@example.com".to_string()),
            }]),
        ),
        title: vec![Element::text("Guide")],
        elements: vec![],
    });
    let draft = run(
        RawDocument::new(vec![header, paragraph("by {author}, {authorinitials}")]),
        &Configuration::new(),
    );
    assert_eq!(lines_of(&draft.elements[1]), &[vec![Element::text("by Jane Ann Doe, JAD")]]);
    assert_eq!(
        draft.attributes.get("lastname"),
        Some(&AttrValue::String("Doe".to_string()))
    );
}

#[test]
fn links_are_recognized_after_attribute_substitution() {
    let draft = run(
        RawDocument::new(vec![paragraph("visit {site} today")]),
        &Configuration::new().with_attribute_override("site", "https://example.com"),
    );
    let line = &lines_of(&draft.elements[0])[0];
    let link = line
        .iter()
        .find_map(|e| match e {
            Element::InlineLink(link) => Some(link),
            _ => None,
        })
        .expect("a link");
    assert_eq!(link.location.to_url(), "https://example.com");
    assert_eq!(line[0], Element::text("visit "));
}

#[test]
fn footnotes_are_collected_and_referenced() {
    let draft = run(
        RawDocument::new(vec![
            paragraph("first footnote:disclaimer[the fine print] then"),
            paragraph("again footnote:disclaimer[]"),
        ]),
        &Configuration::new(),
    );

    assert_eq!(draft.footnotes.len(), 1);
    assert_eq!(draft.footnotes[0].reference.as_deref(), Some("disclaimer"));

    let references: Vec<&FootnoteReference> = draft
        .elements
        .iter()
        .flat_map(|e| lines_of(e).iter().flatten())
        .filter_map(|e| match e {
            Element::FootnoteReference(r) => Some(r),
            _ => None,
        })
        .collect();
    assert_eq!(references.len(), 2);
    assert!(references.iter().all(|r| r.id == 1));
    assert!(!references[0].duplicate);
    assert!(references[1].duplicate);
}

#[test]
fn draft_serializes_to_json() {
    let draft = run(
        RawDocument::new(vec![paragraph("plain")]),
        &Configuration::new(),
    );
    let json = serde_json::to_value(&draft).unwrap();
    assert_eq!(json["elements"][0]["paragraph"]["lines"][0][0]["text"], "plain");
}
