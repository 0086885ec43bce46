//! End-to-end completion scenarios: text + offset through the parser, the
//! cursor classifier and the generator against a fixture class graph.

use std::fs;
use std::path::Path;

use indoc::indoc;
use tower_lsp::lsp_types::{CompletionItem, CompletionTextEdit, Position, Range, Url};

use exml_language_server::completion::ContentAssistProcessor;
use exml_language_server::document::Document;
use exml_language_server::exml::graph::Prop;
use exml_language_server::exml::{
    ChangeBatch, ClassFacts, FactMap, JsonFactScanner, ProjectModel, StaticFactScanner,
};

fn fixture_facts() -> FactMap {
    let mut map = FactMap::default();
    map.insert(
        "eui.Component".to_string(),
        ClassFacts {
            props: vec![Prop {
                name: "enabled".into(),
                type_name: "boolean".into(),
                value: "false".into(),
                available: Vec::new(),
            }],
            in_engine: true,
            ..Default::default()
        },
    );
    map.insert(
        "pkg.Widget".to_string(),
        ClassFacts {
            base_names: vec!["eui.Component".into()],
            props: vec![Prop {
                name: "mode".into(),
                type_name: "string".into(),
                value: "\"\"".into(),
                available: Vec::new(),
            }],
            ..Default::default()
        },
    );
    map.insert(
        "com.game.Panel".to_string(),
        ClassFacts {
            base_names: vec!["eui.Component".into()],
            ..Default::default()
        },
    );
    map
}

fn processor_at(root: &Path) -> ContentAssistProcessor {
    let project = ProjectModel::with_settings(root, Default::default());
    ContentAssistProcessor::new(project, Box::new(StaticFactScanner::new(fixture_facts())))
        .expect("processor")
}

fn processor() -> ContentAssistProcessor {
    // The workspace scan happens inside the constructor; the directory can
    // go away afterwards.
    let dir = tempfile::tempdir().unwrap();
    processor_at(dir.path())
}

fn document(text: &str) -> Document {
    Document::new(Url::parse("file:///test.exml").unwrap(), text.to_string(), 0)
}

fn complete(text: &str, offset: usize) -> Vec<CompletionItem> {
    let mut doc = document(text);
    processor().compute_completion(&mut doc, offset)
}

fn edit_range(item: &CompletionItem) -> Option<Range> {
    match item.text_edit.as_ref()? {
        CompletionTextEdit::Edit(edit) => Some(edit.range),
        CompletionTextEdit::InsertAndReplace(_) => None,
    }
}

const WIDGET_DOC: &str =
    r#"<?xml version="1.0"?><a:Widget xmlns:a="pkg.*"><a:Widget/></a:Widget>"#;

#[test]
fn element_completion_inside_child_tag() {
    // Cursor right after `<a:` inside the child tag.
    let child_name_start = WIDGET_DOC.find("<a:Widget/>").unwrap() + 1;
    let offset = child_name_start + 2;
    let items = complete(WIDGET_DOC, offset);

    let widget = items
        .iter()
        .find(|item| item.label == "a:Widget")
        .expect("candidate resolvable under pkg.*");
    assert_eq!(widget.insert_text.as_deref(), Some("a:Widget"));
    assert_eq!(widget.detail.as_deref(), Some("pkg"));
    // The replacement range covers exactly the child's name token.
    let range = edit_range(widget).expect("text edit");
    assert_eq!(
        range,
        Range::new(
            Position::new(0, child_name_start as u32),
            Position::new(0, (child_name_start + 8) as u32),
        )
    );
    // The declared namespace is reused; no follow-up command needed.
    assert!(widget.command.is_none());
}

#[test]
fn element_completion_synthesizes_missing_namespace() {
    let child_name_start = WIDGET_DOC.find("<a:Widget/>").unwrap() + 1;
    let items = complete(WIDGET_DOC, child_name_start + 2);

    let panel = items
        .iter()
        .find(|item| item.insert_text.as_deref() == Some("game:Panel"))
        .expect("candidate in undeclared namespace");
    let command = panel.command.as_ref().expect("insert-namespace command");
    assert_eq!(command.command, "exml.insertNamespace");
    let arg = &command.arguments.as_ref().unwrap()[0];
    assert_eq!(
        arg["text"].as_str().unwrap(),
        " xmlns:game=\"com.game.*\""
    );
    // The insertion anchors just past the last xmlns declaration.
    let anchor = WIDGET_DOC.find("\"pkg.*\"").unwrap() + "\"pkg.*\"".len();
    assert_eq!(arg["offset"].as_u64().unwrap() as usize, anchor);
}

#[test]
fn node_end_completion_sorts_first() {
    let text = r#"<a:Widget xmlns:a="pkg.*"></a:Widget>"#;
    let close = text.find("</a:Widget>").unwrap();
    let items = complete(text, close + 3);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "/a:Widget");
    assert_eq!(items[0].sort_text.as_deref(), Some("!"));
    let range = edit_range(&items[0]).unwrap();
    assert_eq!(range.start, Position::new(0, (close + 1) as u32));
    assert_eq!(range.end, Position::new(0, (close + 10) as u32));
}

#[test]
fn attribute_name_completion_lists_inherited_props() {
    let text = r#"<a:Widget xmlns:a="pkg.*" mo/>"#;
    let offset = text.find(" mo").unwrap() + 3;
    let items = complete(text, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, ["mode", "enabled"]);
    assert_eq!(items[0].insert_text.as_deref(), Some("mode=\"\""));
    assert_eq!(items[1].detail.as_deref(), Some("eui.Component"));
    assert_eq!(
        items[0].command.as_ref().unwrap().command,
        "exml.cursorBack"
    );
}

#[test]
fn attribute_value_completion_for_boolean_prop() {
    let text = r#"<a:Widget xmlns:a="pkg.*" enabled="t"/>"#;
    let value_offset = text.find("\"t\"").unwrap() + 2;
    let items = complete(text, value_offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, ["true", "false"]);
    // Inside the quotes the insertion re-closes the value.
    assert_eq!(items[0].insert_text.as_deref(), Some("true\""));
}

#[test]
fn attribute_value_left_quote_prepends_quote() {
    let text = r#"<a:Widget xmlns:a="pkg.*" enabled="t"/>"#;
    let quote_offset = text.find("\"t\"").unwrap();
    let items = complete(text, quote_offset);
    assert_eq!(items[0].insert_text.as_deref(), Some("\"true\""));
}

#[test]
fn state_suffix_completion_from_states_block() {
    let text = indoc! {r#"
        <e:Skin xmlns:e="http://ns.egret.com/eui">
            <e:states>
                <e:State name="normal"/>
                <e:State name="disabled"/>
            </e:states>
            <e:Button label. />
        </e:Skin>
    "#};
    let offset = text.find("label.").unwrap() + "label.".len();
    let items = complete(text, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, ["normal", "disabled"]);
}

#[test]
fn include_in_lists_states() {
    let text = indoc! {r#"
        <e:Skin states="up,down" xmlns:e="http://ns.egret.com/eui">
            <e:Button includeIn="u"/>
        </e:Skin>
    "#};
    let offset = text.find("\"u\"").unwrap() + 1;
    let items = complete(text, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, ["up", "down"]);
}

#[test]
fn undefined_positions_yield_no_candidates() {
    assert!(complete(WIDGET_DOC, 5).is_empty());
    assert!(complete(WIDGET_DOC, WIDGET_DOC.len()).is_empty());
}

#[test]
fn deleted_fact_file_drops_types_from_graph() {
    let dir = tempfile::tempdir().unwrap();
    let fact_path = dir.path().join("libs/game.facts.json");
    fs::create_dir_all(fact_path.parent().unwrap()).unwrap();
    fs::write(
        &fact_path,
        r#"{"game.Panel": {"baseNames": ["eui.Group"]}}"#,
    )
    .unwrap();

    let project = ProjectModel::with_settings(dir.path(), Default::default());
    let mut processor =
        ContentAssistProcessor::new(project, Box::new(JsonFactScanner)).expect("processor");
    assert!(processor.index().graph().contains("game.Panel"));

    fs::remove_file(&fact_path).unwrap();
    processor.file_changed(&ChangeBatch {
        deleted: vec![fact_path],
        ..Default::default()
    });
    assert!(!processor.index().graph().contains("game.Panel"));
    assert!(!processor
        .index()
        .graph()
        .is_instance_of("anything", "game.Panel"));
}

#[test]
fn skin_name_completion_lists_markup_skins() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(
        dir.path().join("src/MainSkin.exml"),
        r#"<e:Skin class="skins.MainSkin" xmlns:e="http://ns.egret.com/eui"/>"#,
    )
    .unwrap();
    let processor = processor_at(dir.path());

    // A skin is only a skin if its root resolves to eui.Skin; the fixture
    // graph does not declare it, but resolution is structural.
    let text = r#"<a:Widget xmlns:a="pkg.*" skinName="s"/>"#;
    let offset = text.find("\"s\"").unwrap() + 1;
    let mut doc = document(text);
    let items = processor.compute_completion(&mut doc, offset);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(labels, ["skins.MainSkin"]);
}
