use element_builder::Document;
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;

const FIXTURE_HTML: &str = "\
<div id='top' class='panel wide'>\
  <nav id='nav' class='nav' data-kind='side-nav' lang='en-US'>\
    <a id='home' href='/home' class='link active'>home</a>\
    <a id='docs' href='/docs' class='link'>docs</a>\
  </nav>\
  <section id='content' class='panel'>\
    <p id='p1' class='note'>one</p>\
    <p id='p2'>two</p>\
    <div id='deep'><p id='p3' class='note deep'>three</p></div>\
  </section>\
</div>\
<footer id='footer' data-kind='footer'></footer>";

fn fixture() -> Document {
    match Document::from_html(FIXTURE_HTML) {
        Ok(doc) => doc,
        Err(err) => panic!("fixture must parse: {err}"),
    }
}

fn ident_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("top"),
        Just("nav"),
        Just("content"),
        Just("p1"),
        Just("deep"),
        Just("panel"),
        Just("link"),
        Just("note"),
        Just("active"),
        Just("side-nav"),
        Just("missing_name"),
    ]
    .prop_map(str::to_string)
    .boxed()
}

fn tag_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("div"),
        Just("nav"),
        Just("a"),
        Just("p"),
        Just("section"),
        Just("footer"),
        Just("span"),
    ]
    .prop_map(str::to_string)
    .boxed()
}

fn attr_op_strategy() -> BoxedStrategy<&'static str> {
    prop_oneof![
        Just("="),
        Just("^="),
        Just("$="),
        Just("*="),
        Just("~="),
        Just("|="),
    ]
    .boxed()
}

fn attr_suffix_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        (Just("data-kind"), attr_op_strategy(), ident_strategy())
            .prop_map(|(key, op, value)| format!("[{key}{op}'{value}']")),
        Just("[href]".to_string()),
    ]
    .boxed()
}

// At most one piece of each kind, so every generated compound is
// grammatical (duplicate ids or universals are parse errors).
fn compound_strategy() -> BoxedStrategy<String> {
    (
        proptest::option::of(prop_oneof![tag_strategy(), Just("*".to_string())]),
        proptest::option::of(ident_strategy().prop_map(|id| format!("#{id}"))),
        proptest::option::of(ident_strategy().prop_map(|class| format!(".{class}"))),
        proptest::option::of(attr_suffix_strategy()),
    )
        .prop_map(|(base, id, class, attr)| {
            let mut out = base.unwrap_or_default();
            for piece in [id, class, attr].into_iter().flatten() {
                out.push_str(&piece);
            }
            if out.is_empty() { "*".to_string() } else { out }
        })
        .boxed()
}

fn combinator_strategy() -> BoxedStrategy<&'static str> {
    prop_oneof![Just(" "), Just(" > "), Just(" + "), Just(" ~ ")].boxed()
}

fn complex_selector_strategy() -> BoxedStrategy<String> {
    (
        compound_strategy(),
        vec((combinator_strategy(), compound_strategy()), 0..3),
    )
        .prop_map(|(head, tail)| {
            let mut out = head;
            for (combinator, compound) in tail {
                out.push_str(combinator);
                out.push_str(&compound);
            }
            out
        })
        .boxed()
}

fn selector_list_strategy() -> BoxedStrategy<String> {
    vec(complex_selector_strategy(), 1..4)
        .prop_map(|groups| groups.join(", "))
        .boxed()
}

fn assert_query_path_never_panics(selector: &str) -> TestCaseResult {
    let outcome = std::panic::catch_unwind(|| {
        let doc = fixture();
        let _ = doc.query_all(selector);
        let _ = doc.query_first(selector);
    });
    prop_assert!(outcome.is_ok(), "query panicked for selector: {selector:?}");
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn arbitrary_ascii_selectors_never_panic(selector in "[ -~]{0,40}") {
        assert_query_path_never_panics(&selector)?;
    }

    #[test]
    fn generated_selectors_parse_and_results_match_themselves(
        selector in selector_list_strategy()
    ) {
        let doc = fixture();
        let matched = doc.query_all(&selector);
        prop_assert!(matched.is_ok(), "generated selector rejected: {selector:?}");
        for element in matched.unwrap_or_default() {
            prop_assert!(
                element.matches(&selector).unwrap_or(false),
                "query result does not match its own selector {selector:?}: {element:?}"
            );
        }
    }

    #[test]
    fn id_fast_path_agrees_with_attribute_scan(id in ident_strategy()) {
        let doc = fixture();
        let by_id = doc.query_all(&format!("#{id}"));
        let by_attr = doc.query_all(&format!("[id='{id}']"));
        prop_assert!(by_id.is_ok() && by_attr.is_ok());
        prop_assert_eq!(by_id.unwrap_or_default(), by_attr.unwrap_or_default());
    }
}
