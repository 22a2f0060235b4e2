//! Minimal HTML document builder.
//!
//! Text and attribute values are always escaped. `Node::Raw` is reserved for
//! markup we produce or already sanitized (styles, scripts, message content).

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &["meta", "link", "br", "hr", "img", "input"];

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
    Raw(String),
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<Node>,
    multiline: bool,
}

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
            multiline: false,
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn raw(mut self, markup: impl Into<String>) -> Self {
        self.children.push(Node::Raw(markup.into()));
        self
    }

    /// Put every child on its own line.
    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag)
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');

        if self.is_void() {
            return;
        }

        for child in &self.children {
            if self.multiline {
                out.push('\n');
            }
            child.write_to(out);
        }
        if self.multiline && !self.children.is_empty() {
            out.push('\n');
        }

        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }
}

impl Node {
    fn write_to(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.write_to(out),
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Raw(markup) => out.push_str(markup),
        }
    }
}

/// A full HTML document: `<!DOCTYPE html>` plus `<html>` with head and body.
#[derive(Debug, Clone)]
pub struct Document {
    lang: String,
    head: Element,
    body: Element,
}

impl Document {
    pub fn new(lang: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            head: Element::new("head").multiline(),
            body: Element::new("body").multiline(),
        }
    }

    pub fn head(mut self, node: impl Into<Node>) -> Self {
        self.head = self.head.child(node);
        self
    }

    pub fn body(mut self, node: impl Into<Node>) -> Self {
        self.body = self.body.child(node);
        self
    }

    pub fn render(self) -> String {
        let html = Element::new("html")
            .attr("lang", self.lang)
            .multiline()
            .child(self.head)
            .child(self.body);

        let mut out = String::from("<!DOCTYPE html>\n");
        html.write_to(&mut out);
        out.push('\n');
        out
    }
}

/// Escape text content.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value (double-quoted).
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_attrs_are_escaped() {
        let el = Element::new("a")
            .attr("href", "https://x.test/?a=1&b=\"2\"")
            .text("<script>alert(1)</script>");
        assert_eq!(
            el.render(),
            "<a href=\"https://x.test/?a=1&amp;b=&quot;2&quot;\">&lt;script&gt;alert(1)&lt;/script&gt;</a>"
        );
    }

    #[test]
    fn test_raw_is_untouched() {
        let el = Element::new("div").raw("<p>ok</p>");
        assert_eq!(el.render(), "<div><p>ok</p></div>");
    }

    #[test]
    fn test_void_elements() {
        let el = Element::new("meta").attr("charset", "UTF-8");
        assert_eq!(el.render(), "<meta charset=\"UTF-8\">");
    }

    #[test]
    fn test_document_shell() {
        let html = Document::new("en")
            .head(Element::new("title").text("T & C"))
            .body(Element::new("h1").text("Hi"))
            .render();
        assert!(html.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(html.contains("<title>T &amp; C</title>"));
        assert!(html.contains("<body>\n<h1>Hi</h1>\n</body>"));
    }
}
