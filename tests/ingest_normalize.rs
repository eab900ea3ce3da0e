// tests/ingest_normalize.rs
use events_hub_scraper::ingest::sanitize;

#[test]
fn absent_and_empty_are_absent() {
    assert_eq!(sanitize(None), None);
    assert_eq!(sanitize(Some("")), None);
}

#[test]
fn strips_html_and_unescapes() {
    let s = "<p>Hello&nbsp;<b>world</b> &ldquo;ok&rdquo;</p>";
    assert_eq!(sanitize(Some(s)).as_deref(), Some("Hello world \u{201C}ok\u{201D}"));
}

#[test]
fn folds_whitespace_and_nbsp() {
    let s = "A\u{00A0}\n\tB   C";
    assert_eq!(sanitize(Some(s)).as_deref(), Some("A B C"));
}

#[test]
fn all_markup_is_absent_not_empty() {
    assert_eq!(sanitize(Some("<div>\n  <br/>  </div>")), None);
}
