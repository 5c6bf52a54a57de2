//! Rendering documents to formatted UTF-8 text

use std::fmt::Write;

use tracing::{debug, error, instrument};

use crate::document::assemble_document;
use crate::error::{Error, ErrorKind, Result};
use crate::tree::{Content, Document, Element, Namespace};

/// Output layout options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerializeConfig {
    /// Spaces per nesting level
    pub indent: usize,
    /// Emit the `<?xml ...?>` declaration
    pub declaration: bool,
}

impl Default for SerializeConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            declaration: true,
        }
    }
}

impl SerializeConfig {
    pub const fn new(indent: usize, declaration: bool) -> Self {
        Self {
            indent,
            declaration,
        }
    }
}

/// Wrap `fragment` in a VOTable document and render it
///
/// The document is dropped once rendered; the returned string belongs to
/// the caller. An empty rendering counts as a failure.
///
/// ```
/// use votable::{build_resource_node, serialize_to_string};
/// # fn main() -> votable::Result<()> {
/// let xml = serialize_to_string(build_resource_node("x", "y", Vec::new())?)?;
/// assert!(xml.contains(r#"<RESOURCE utype="x" name="y"/>"#));
/// # Ok(())
/// # }
/// ```
#[instrument(level = "debug", skip_all)]
pub fn serialize_to_string(fragment: Element) -> Result<String> {
    const OP: &str = "serialize_to_string";

    let document = assemble_document(fragment).map_err(|err| {
        Error::construction(OP, format!("VOTable document construction failed: {err}"))
    })?;
    let rendered = render_document(&document, &SerializeConfig::default()).map_err(|err| err.within(OP));
    drop(document);

    match rendered {
        Ok(text) if !text.is_empty() => {
            debug!(operation = OP, size = text.len(), "document serialized");
            Ok(text)
        }
        Ok(_) => {
            error!(operation = OP, "VOTable document dump failed");
            Err(Error::construction(OP, "VOTable document dump produced no output"))
        }
        Err(err) => {
            error!(operation = OP, %err, "VOTable document dump failed");
            Err(err)
        }
    }
}

/// Render any document without consuming it
pub fn render_document(document: &Document, config: &SerializeConfig) -> Result<String> {
    let mut writer = XmlWriter {
        out: String::new(),
        config: *config,
        scope: Vec::new(),
    };
    writer.document(document).map_err(|_| {
        Error::new(
            ErrorKind::FormattingFailed,
            "render_document",
            "failed to write xml",
        )
    })?;
    Ok(writer.out)
}

impl Document {
    /// Render with [`SerializeConfig::default`]
    pub fn to_xml_string(&self) -> Result<String> {
        render_document(self, &SerializeConfig::default())
    }
}

struct XmlWriter {
    out: String,
    config: SerializeConfig,
    /// Namespaces declared by open ancestors, innermost last
    scope: Vec<Namespace>,
}

impl XmlWriter {
    fn document(&mut self, document: &Document) -> std::fmt::Result {
        if self.config.declaration {
            self.out
                .write_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        }
        self.element(document.root(), 0)?;
        self.out.write_char('\n')
    }

    fn element(&mut self, element: &Element, depth: usize) -> std::fmt::Result {
        let tag = element.qualified_name();
        let scope_mark = self.scope.len();

        self.pad(depth)?;
        write!(self.out, "<{tag}")?;

        for ns in element.namespace_decls() {
            self.declaration(ns)?;
            self.scope.push(ns.clone());
        }
        // bound on the element but declared nowhere above it
        match element.namespace() {
            Some(ns) if !self.in_scope(ns) => {
                self.declaration(ns)?;
                self.scope.push(ns.clone());
            }
            Some(_) => {}
            None if self.default_uri().is_some_and(|uri| !uri.is_empty()) => {
                self.out.write_str(" xmlns=\"\"")?;
                self.scope.push(Namespace::default_ns(""));
            }
            None => {}
        }

        for (key, value) in element.attributes() {
            write!(self.out, " {key}=\"{}\"", escape_attribute(value))?;
        }

        let result = self.content(element, &tag, depth);
        self.scope.truncate(scope_mark);
        result
    }

    fn content(&mut self, element: &Element, tag: &str, depth: usize) -> std::fmt::Result {
        let children = element.children();
        if children.is_empty() {
            return self.out.write_str("/>");
        }

        let text_only = children.iter().all(|c| matches!(c, Content::Text(_)));
        if text_only {
            self.out.write_char('>')?;
            for child in children {
                if let Content::Text(text) = child {
                    self.out.write_str(&escape_text(text))?;
                }
            }
            return write!(self.out, "</{tag}>");
        }

        self.out.write_char('>')?;
        for child in children {
            self.out.write_char('\n')?;
            match child {
                Content::Element(child) => self.element(child, depth + 1)?,
                Content::Text(text) => {
                    self.pad(depth + 1)?;
                    self.out.write_str(&escape_text(text))?;
                }
            }
        }
        self.out.write_char('\n')?;
        self.pad(depth)?;
        write!(self.out, "</{tag}>")
    }

    fn declaration(&mut self, ns: &Namespace) -> std::fmt::Result {
        match ns.prefix() {
            Some(prefix) => write!(self.out, " xmlns:{prefix}=\"{}\"", escape_attribute(ns.uri())),
            None => write!(self.out, " xmlns=\"{}\"", escape_attribute(ns.uri())),
        }
    }

    /// True if the innermost binding of this prefix is `ns`
    fn in_scope(&self, ns: &Namespace) -> bool {
        self.scope
            .iter()
            .rev()
            .find(|bound| bound.prefix() == ns.prefix())
            .is_some_and(|bound| bound.uri() == ns.uri())
    }

    fn default_uri(&self) -> Option<&str> {
        self.scope
            .iter()
            .rev()
            .find(|bound| bound.is_default())
            .map(Namespace::uri)
    }

    fn pad(&mut self, depth: usize) -> std::fmt::Result {
        for _ in 0..depth * self.config.indent {
            self.out.write_char(' ')?;
        }
        Ok(())
    }
}

fn escape_text(input: &str) -> String {
    escape(input, false)
}

/// Attribute values also escape quotes and the whitespace a parser would
/// otherwise normalize to spaces
fn escape_attribute(input: &str) -> String {
    escape(input, true)
}

fn escape(input: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            '"' if attribute => out.push_str("&quot;"),
            '\'' if attribute => out.push_str("&apos;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\t' if attribute => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}
