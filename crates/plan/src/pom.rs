//! `pom.xml` metadata extraction.

use roxmltree::Document;

const FALLBACK_ARTIFACT: &str = "app";

/// Artifact id of the project itself. Only direct children of `<project>`
/// are inspected, so a `<parent>` coordinate never wins. Unparseable or
/// incomplete documents fall back to a generic name.
pub fn artifact_id(pom: &str) -> String {
    let doc = match Document::parse(pom) {
        Ok(doc) => doc,
        Err(_) => return FALLBACK_ARTIFACT.to_string(),
    };

    doc.root_element()
        .children()
        .find(|child| child.has_tag_name("artifactId"))
        .and_then(|node| node.text())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map_or_else(|| FALLBACK_ARTIFACT.to_string(), str::to_string)
}
