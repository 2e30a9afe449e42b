use std::borrow::Cow;
use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{Html, Node, Selector};

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static TRAILING_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Unwrap every `<a>` in `fragment`, keeping its children in place.
/// A fragment without links is returned untouched.
pub fn strip_links(fragment: &str) -> Cow<'_, str> {
    let html = Html::parse_fragment(fragment);
    if html.select(&LINK_SEL).next().is_none() {
        return Cow::Borrowed(fragment);
    }

    let mut out = String::with_capacity(fragment.len());
    for child in html.root_element().children() {
        write_node(child, &mut out);
    }
    Cow::Owned(out)
}

fn write_node(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&html_escape::encode_text(&**text)),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::Element(el) if el.name() == "a" => {
            for child in node.children() {
                write_node(child, out);
            }
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(el.name());
            for (name, value) in el.attrs() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.name()) {
                return;
            }
            for child in node.children() {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(el.name());
            out.push('>');
        }
        _ => {}
    }
}

/// Convert a sanitized fragment to markdown with normalized blank lines.
pub fn to_markdown(fragment: &str) -> std::io::Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style"])
        .build();
    let raw = converter.convert(fragment)?;
    Ok(normalize_markdown(&raw))
}

fn normalize_markdown(md: &str) -> String {
    let md = md.replace("\r\n", "\n");
    let trimmed = TRAILING_WS_RE.replace_all(&md, "\n");
    BLANK_LINES_RE
        .replace_all(&trimmed, "\n\n")
        .trim()
        .to_string()
}

// ── Tests ──
