use crate::document::Document;
use crate::{Error, Result};

fn inner_of(html: &str, selector: &str) -> Result<String> {
    let doc = Document::from_html(html)?;
    let element = doc
        .query_first(selector)?
        .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))?;
    Ok(element.inner_html())
}

#[test]
fn nested_elements_keep_document_order() -> Result<()> {
    let html = "<ul id='list'><li>a</li><li>b</li></ul>";
    assert_eq!(inner_of(html, "#list")?, "<li>a</li><li>b</li>");
    Ok(())
}

#[test]
fn tag_and_attribute_names_are_lowercased() -> Result<()> {
    let doc = Document::from_html("<DIV ID='box' Data-X='1'></DIV>")?;
    let div = doc
        .query_first("div")?
        .ok_or_else(|| Error::SelectorNotFound("div".into()))?;
    assert_eq!(div.tag_name(), "div");
    assert_eq!(div.attribute("data-x").as_deref(), Some("1"));
    assert_eq!(div.id(), "box");
    Ok(())
}

#[test]
fn attribute_value_quoting_styles_parse_alike() -> Result<()> {
    let doc = Document::from_html(
        "<div id='box' a=\"double\" b='single' c=unquoted disabled></div>",
    )?;
    let div = doc
        .get_element_by_id("box")
        .ok_or_else(|| Error::SelectorNotFound("#box".into()))?;
    assert_eq!(div.attribute("a").as_deref(), Some("double"));
    assert_eq!(div.attribute("b").as_deref(), Some("single"));
    assert_eq!(div.attribute("c").as_deref(), Some("unquoted"));
    // Valueless attributes normalize to "true".
    assert_eq!(div.attribute("disabled").as_deref(), Some("true"));
    Ok(())
}

#[test]
fn void_and_self_closing_tags_take_no_children() -> Result<()> {
    let html = "<div id='box'><img src='x.png'><span/>after<p>inside</p></div>";
    let doc = Document::from_html(html)?;
    let div = doc
        .get_element_by_id("box")
        .ok_or_else(|| Error::SelectorNotFound("#box".into()))?;
    let tags = div
        .children()
        .iter()
        .map(|child| child.tag_name())
        .collect::<Vec<_>>();
    assert_eq!(tags, vec!["img", "span", "p"]);
    assert_eq!(div.query_all("span")?[0].text(), "");
    Ok(())
}

#[test]
fn comments_and_doctype_are_skipped() -> Result<()> {
    let html = "<!DOCTYPE html><!-- note --><div id='box'>x<!-- gone -->y</div>";
    assert_eq!(inner_of(html, "#box")?, "xy");
    Ok(())
}

#[test]
fn character_references_decode_in_text_and_attributes() -> Result<()> {
    let doc = Document::from_html(
        "<div id='box' title='&quot;A&quot; &amp; B'>&lt;p&gt; &#65; &#x42; &copy;</div>",
    )?;
    let div = doc
        .get_element_by_id("box")
        .ok_or_else(|| Error::SelectorNotFound("#box".into()))?;
    assert_eq!(div.attribute("title").as_deref(), Some("\"A\" & B"));
    assert_eq!(div.text(), "<p> A B ©");
    Ok(())
}

#[test]
fn unknown_references_pass_through_verbatim() -> Result<()> {
    let doc = Document::from_html("<div id='box'>a &bogus; b && c</div>")?;
    let div = doc
        .get_element_by_id("box")
        .ok_or_else(|| Error::SelectorNotFound("#box".into()))?;
    assert_eq!(div.text(), "a &bogus; b && c");
    Ok(())
}

#[test]
fn script_and_style_bodies_are_raw_text() -> Result<()> {
    let html = "<div id='box'><script>if (a < b) { x = '</div>'; }</script></div>";
    let doc = Document::from_html(html)?;
    let script = doc
        .query_first("script")?
        .ok_or_else(|| Error::SelectorNotFound("script".into()))?;
    assert_eq!(script.text(), "if (a < b) { x = '</div>'; }");
    assert!(script.children().is_empty());

    let styled = Document::from_html("<style>p > a { color: red; }</style>")?;
    let style = styled
        .query_first("style")?
        .ok_or_else(|| Error::SelectorNotFound("style".into()))?;
    assert_eq!(style.text(), "p > a { color: red; }");
    Ok(())
}

#[test]
fn unclosed_tags_recover_by_implicit_close() -> Result<()> {
    let doc = Document::from_html("<div id='box'><p>one<p>two")?;
    let div = doc
        .get_element_by_id("box")
        .ok_or_else(|| Error::SelectorNotFound("#box".into()))?;
    // No auto-close rules in this subset: the second p nests inside the
    // first, and everything still open is closed at end of input.
    let paragraphs = div.query_all("p")?;
    assert_eq!(paragraphs.len(), 2);
    assert_eq!(paragraphs[0].text(), "onetwo");
    assert_eq!(paragraphs[0].query_all("p")?.len(), 1);
    Ok(())
}

#[test]
fn mismatched_end_tag_pops_to_nearest_match() -> Result<()> {
    let doc = Document::from_html("<div id='a'><span>inner</div>after")?;
    let div = doc
        .get_element_by_id("a")
        .ok_or_else(|| Error::SelectorNotFound("#a".into()))?;
    assert_eq!(div.text(), "inner");
    assert_eq!(doc.body().text(), "innerafter");
    Ok(())
}

#[test]
fn malformed_markup_reports_parse_errors() {
    for html in [
        "<!-- never closed",
        "<div",
        "<div a='unclosed>",
        "<script>never closed",
        "<>",
    ] {
        let err = Document::from_html(html).unwrap_err();
        assert!(matches!(err, Error::HtmlParse(_)), "input: {html}");
    }
}

#[test]
fn fragment_without_html_wrapper_is_normalized_into_body() -> Result<()> {
    let doc = Document::from_html("<p>loose</p>")?;
    assert_eq!(doc.document_element().tag_name(), "html");
    assert_eq!(doc.body().text(), "loose");
    Ok(())
}

#[test]
fn existing_html_wrapper_gains_a_body_when_missing() -> Result<()> {
    let doc = Document::from_html("<html><p>loose</p></html>")?;
    assert_eq!(doc.body().tag_name(), "body");
    assert_eq!(doc.body().text(), "loose");
    Ok(())
}

#[test]
fn serialize_then_reparse_is_stable() -> Result<()> {
    let html = "<div class='a b' id='box'><img src='x.png'>text &amp; more<p>tail</p></div>";
    let once = Document::from_html(html)?.to_html();
    let twice = Document::from_html(&once)?.to_html();
    assert_eq!(once, twice);
    Ok(())
}
