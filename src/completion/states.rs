//! Declared view states of a skin document.
//!
//! States come from a `<states>` child block (`<State name="..."/>`
//! children); when no block exists, the root skin tag's comma-separated
//! `states` attribute is the fallback.

use crate::sax::XmlDocument;

/// All state names declared in the document, in declaration order.
pub fn document_states(doc: &XmlDocument) -> Vec<String> {
    let from_block = states_from_block(doc);
    if !from_block.is_empty() {
        return from_block;
    }
    states_from_attribute(doc)
}

fn states_from_block(doc: &XmlDocument) -> Vec<String> {
    let mut states = Vec::new();
    for (_, node) in doc.nodes() {
        if node.local_name != "states" {
            continue;
        }
        for child_id in &node.children {
            let child = doc.node(*child_id);
            if child.local_name == "State" {
                if let Some(name) = child.attribute("name") {
                    states.push(name.to_string());
                }
            }
        }
    }
    states
}

fn states_from_attribute(doc: &XmlDocument) -> Vec<String> {
    let Some(root) = doc.root() else {
        return Vec::new();
    };
    let Some(value) = doc.node(root).attribute("states") else {
        return Vec::new();
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sax;
    use indoc::indoc;

    #[test]
    fn test_states_from_block() {
        let doc = sax::parse(indoc! {r#"
            <e:Skin xmlns:e="http://ns.egret.com/eui">
                <e:states>
                    <e:State name="normal"/>
                    <e:State name="disabled"/>
                </e:states>
            </e:Skin>
        "#});
        assert_eq!(document_states(&doc), ["normal", "disabled"]);
    }

    #[test]
    fn test_states_attribute_fallback() {
        let doc = sax::parse(
            r#"<e:Skin states="up, down ,over" xmlns:e="http://ns.egret.com/eui"/>"#,
        );
        assert_eq!(document_states(&doc), ["up", "down", "over"]);
    }

    #[test]
    fn test_block_wins_over_attribute() {
        let doc = sax::parse(indoc! {r#"
            <e:Skin states="ignored" xmlns:e="http://ns.egret.com/eui">
                <e:states><e:State name="only"/></e:states>
            </e:Skin>
        "#});
        assert_eq!(document_states(&doc), ["only"]);
    }

    #[test]
    fn test_no_states_declared() {
        let doc = sax::parse(r#"<e:Skin xmlns:e="http://ns.egret.com/eui"/>"#);
        assert!(document_states(&doc).is_empty());
    }
}
