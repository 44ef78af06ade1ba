//! Markup stripping. Walks a parsed HTML tree and writes it back out as
//! XHTML-safe markup that can be embedded directly in an EPUB chapter.

use scraper::{ElementRef, Html};

/// Elements removed together with everything inside them.
const DROPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "form", "img"];

/// Elements serialized as `<name/>`.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "input", "link", "meta", "source", "track", "wbr",
];

/// Attributes that survive cleaning. Everything else (class, style, id, on*) is presentational or unsafe.
const KEPT_ATTRIBUTES: &[&str] = &["href", "title", "lang", "dir", "colspan", "rowspan"];

/// Serialize a chapter container as a bare `<div>` holding its cleaned children.
/// Nested divs (share buttons, ads, navigation) are removed with their content.
pub fn clean_post_content(container: ElementRef<'_>) -> String {
    let mut out = String::from("<div>");
    write_children(container, true, &mut out);
    out.push_str("</div>");
    out
}

/// Re-serialize a stored HTML fragment through the same rules, keeping divs.
pub fn normalize_fragment(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    write_children(fragment.root_element(), false, &mut out);
    out.trim().to_string()
}

fn write_children(parent: ElementRef<'_>, drop_divs: bool, out: &mut String) {
    for child in parent.children() {
        if let Some(element) = ElementRef::wrap(child) {
            write_element(element, drop_divs, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(&escape_text(text));
        }
    }
}

fn write_element(element: ElementRef<'_>, drop_divs: bool, out: &mut String) {
    let name = element.value().name();
    if DROPPED_ELEMENTS.contains(&name) || (drop_divs && name == "div") {
        return;
    }
    // Prefixed names (Word's `o:p`) would need an undeclared namespace.
    if name.contains(':') {
        write_children(element, drop_divs, out);
        return;
    }
    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        if KEPT_ATTRIBUTES.contains(&attr) {
            out.push_str(&format!(" {}=\"{}\"", attr, escape_attr(value)));
        }
    }
    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    write_children(element, drop_divs, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// XML 1.0 `Char` production; `char` already excludes surrogates.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

pub(crate) fn escape_text(s: &str) -> String {
    s.chars()
        .filter(|c| is_xml_char(*c))
        .collect::<String>()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    fn container(html: &str) -> String {
        let doc = Html::parse_document(html);
        let sel = Selector::parse("div.post-content").unwrap();
        let el = doc.select(&sel).next().unwrap();
        clean_post_content(el)
    }

    #[test]
    fn nested_divs_removed_with_content() {
        let out = container(
            r#"<div class="post-content"><p>Uno</p><div class="sharedaddy"><p>Condividi</p></div><p>Due</p></div>"#,
        );
        assert_eq!(out, "<div><p>Uno</p><p>Due</p></div>");
    }

    #[test]
    fn presentational_attributes_dropped() {
        let out = container(
            r#"<div class="post-content"><p class="x" style="color:red" id="p1"><a href="/a" target="_blank">link</a></p></div>"#,
        );
        assert_eq!(out, r#"<div><p><a href="/a">link</a></p></div>"#);
    }

    #[test]
    fn void_elements_self_closed_and_text_escaped() {
        let out = container(r#"<div class="post-content"><p>a &amp; b<br>c &lt; d</p><hr></div>"#);
        assert_eq!(out, "<div><p>a &amp; b<br/>c &lt; d</p><hr/></div>");
    }

    #[test]
    fn scripts_images_and_comments_dropped() {
        let out = container(
            r#"<div class="post-content"><!-- ad --><script>var x = 1;</script><p>Testo<img src="x.png"></p></div>"#,
        );
        assert_eq!(out, "<div><p>Testo</p></div>");
    }

    #[test]
    fn normalize_fragment_keeps_divs_and_closes_voids() {
        let out = normalize_fragment("<div><p>Riga<br>nuova</p></div>\n");
        assert_eq!(out, "<div><p>Riga<br/>nuova</p></div>");
    }

    #[test]
    fn prefixed_elements_unwrapped() {
        let out = normalize_fragment(
            "<div><p>Testo<o:p></o:p></p><p><st1:place>Roma</st1:place></p></div>",
        );
        assert!(!out.contains("o:p"));
        assert_eq!(out, "<div><p>Testo</p><p>Roma</p></div>");
    }

    #[test]
    fn characters_outside_xml_range_dropped() {
        let out = normalize_fragment("<div><p>a\u{000C}b\u{0001}c\td</p></div>");
        assert_eq!(out, "<div><p>abc\td</p></div>");
        assert_eq!(escape_attr("x\u{FFFF}\u{0B}y"), "xy");
    }

    #[test]
    fn normalize_fragment_is_stable_on_clean_markup() {
        let clean = "<div><p>a &amp; b</p><p><em>c</em></p></div>";
        assert_eq!(normalize_fragment(clean), clean);
    }
}
