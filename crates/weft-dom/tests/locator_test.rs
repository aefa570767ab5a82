use weft_common::protocol::DomNode;
use weft_dom::locator::candidates;
use weft_dom::tree::DomSnapshot;

fn login_page() -> DomSnapshot {
    let wire: DomNode = serde_json::from_str(
        r#"{"tag": "html", "children": [
            {"tag": "head"},
            {"tag": "body", "children": [
                {"tag": "div", "attrs": {"id": "app", "class": "shell"}, "children": [
                    {"tag": "form", "attrs": {"name": "signin"}, "children": [
                        {"tag": "input", "attrs": {"type": "text", "name": "user"}},
                        {"tag": "input", "attrs": {"type": "password", "name": "pass"}},
                        {"tag": "button", "attrs": {"type": "submit"}}
                    ]}
                ]},
                {"tag": "div", "attrs": {"class": "banner"}}
            ]}
        ]}"#,
    )
    .unwrap();
    DomSnapshot::from_wire(&wire)
}

#[test]
fn button_gets_all_three_strategies_in_priority_order() {
    let doc = login_page();
    let button = doc.resolve(&[1, 0, 0, 2]).unwrap();
    assert_eq!(
        candidates(&doc, button),
        vec![
            "//div[@id='app']/form/button".to_string(),
            "/html/body/div[@id='app' and @class='shell']/form[@name='signin']/button[@type='submit']"
                .to_string(),
            "/html/body/div[1]/form/button".to_string(),
        ]
    );
}

#[test]
fn sibling_inputs_get_positional_indexes() {
    let doc = login_page();
    let user = doc.resolve(&[1, 0, 0, 0]).unwrap();
    assert_eq!(
        candidates(&doc, user),
        vec![
            "//div[@id='app']/form/input[1]".to_string(),
            "/html/body/div[@id='app' and @class='shell']/form[@name='signin']/input[@name='user' and @type='text']"
                .to_string(),
            "/html/body/div[1]/form/input[1]".to_string(),
        ]
    );

    let pass = doc.resolve(&[1, 0, 0, 1]).unwrap();
    let found = candidates(&doc, pass);
    assert_eq!(found[0], "//div[@id='app']/form/input[2]");
    assert_eq!(found[2], "/html/body/div[1]/form/input[2]");
}

#[test]
fn element_with_id_yields_both_id_forms() {
    let doc = login_page();
    let app = doc.resolve(&[1, 0]).unwrap();
    let found = candidates(&doc, app);
    assert_eq!(found[0], "//div[@id='app']");
    assert_eq!(*found.last().unwrap(), r#"//*[@id="app"]"#.to_string());
    assert_eq!(found.len(), 3);
}

#[test]
fn every_candidate_resolves_uniquely() {
    let doc = login_page();
    for node in doc.iter() {
        for candidate in candidates(&doc, node) {
            assert_eq!(
                weft_dom::path::match_count(&doc, &candidate).unwrap(),
                1,
                "candidate {candidate} for a {} node",
                doc.tag(node)
            );
        }
    }
}
