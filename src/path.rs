//! Namespace-aware structural paths over a [`Document`]
//!
//! Supports the subset needed to locate elements and attributes:
//!
//! ```text
//! path      := ( "/" | "//" ) step ( ( "/" | "//" ) step )* ( ( "/" | "//" ) "@" qname )?
//! step      := ( qname | "*" ) predicate*
//! predicate := "[" test ( "and" test )* "]"
//! test      := "@" qname "=" literal
//! ```
//!
//! Literals are quoted with `'` or `"` and have no escapes.

use std::collections::HashSet;
use std::ptr;

use indexmap::IndexMap;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::tree::{is_name_char, is_name_start, Content, Document, Element, Namespace};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct QName {
    prefix: Option<String>,
    local: String,
}

impl QName {
    fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NameTest {
    Any,
    Name(QName),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct AttrTest {
    name: QName,
    value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NameTest,
    /// Conjunction of all predicates on the step
    conditions: Vec<AttrTest>,
}

/// Prefix to namespace URI bindings used when evaluating a [`Path`]
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    map: IndexMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, prefix: &str, uri: &str) -> Self {
        self.map.insert(prefix.to_string(), uri.to_string());
        self
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.map.get(prefix).map(String::as_str)
    }
}

/// One result of [`Path::select`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection<'d> {
    Element(&'d Element),
    Attribute(&'d str),
}

impl<'d> Selection<'d> {
    pub fn as_element(&self) -> Option<&'d Element> {
        match *self {
            Self::Element(element) => Some(element),
            Self::Attribute(_) => None,
        }
    }

    /// Attribute value, or the text content of a selected element
    pub fn string_value(&self) -> String {
        match *self {
            Self::Attribute(value) => value.to_string(),
            Self::Element(element) => element.text().unwrap_or_default(),
        }
    }
}

/// Compiled location path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    steps: Vec<Step>,
    attribute: Option<QName>,
}

impl Path {
    pub fn parse(input: &str) -> Result<Self> {
        PathParser {
            cursor: Cursor::new(input.as_bytes()),
            source: input,
        }
        .parse()
    }

    /// Evaluate against `document`, in document order without duplicates
    pub fn select<'d>(&self, document: &'d Document, bindings: &Bindings) -> Result<Vec<Selection<'d>>> {
        const OP: &str = "Path::select";

        let tests = self
            .steps
            .iter()
            .map(|step| resolve(&step.test, bindings))
            .collect::<Result<Vec<_>>>()
            .map_err(|err| err.within(OP))?;

        // `None` stands for the document node the path starts from
        let mut context: Option<Vec<&'d Element>> = None;
        for (step, test) in self.steps.iter().zip(&tests) {
            let selected = apply_step(document.root(), context.as_deref(), step, test);
            if selected.is_empty() {
                return Ok(Vec::new());
            }
            context = Some(selected);
        }

        let elements = context.unwrap_or_default();
        let selections = match &self.attribute {
            None => elements.into_iter().map(Selection::Element).collect(),
            Some(name) => {
                let key = name.qualified();
                elements
                    .into_iter()
                    .filter_map(|element| element.attribute(&key))
                    .map(Selection::Attribute)
                    .collect()
            }
        };
        Ok(selections)
    }
}

/// Element test with its prefix resolved to a namespace URI
enum Resolved<'p> {
    Any,
    Name { uri: Option<&'p str>, local: &'p str },
}

fn resolve<'p>(test: &'p NameTest, bindings: &'p Bindings) -> Result<Resolved<'p>> {
    match test {
        NameTest::Any => Ok(Resolved::Any),
        NameTest::Name(name) => {
            let uri = match &name.prefix {
                None => None,
                Some(prefix) => Some(bindings.get(prefix).ok_or_else(|| {
                    Error::invalid_argument(
                        "Path::select",
                        format!("namespace prefix '{prefix}' is not bound"),
                    )
                })?),
            };
            Ok(Resolved::Name {
                uri,
                local: &name.local,
            })
        }
    }
}

fn matches(element: &Element, step: &Step, test: &Resolved<'_>) -> bool {
    let name_ok = match *test {
        Resolved::Any => true,
        Resolved::Name { uri, local } => {
            element.name() == local && element.namespace().map(Namespace::uri) == uri
        }
    };
    name_ok
        && step
            .conditions
            .iter()
            .all(|cond| element.attribute(&cond.name.qualified()) == Some(cond.value.as_str()))
}

/// Walk the whole tree once in document order and keep the elements reached
/// by `step` from `context`, which yields ordered, duplicate-free output.
///
/// Context membership is looked up once per element and carried down the
/// traversal stack, so a step costs one pass over the tree.
fn apply_step<'d>(
    root: &'d Element,
    context: Option<&[&'d Element]>,
    step: &Step,
    test: &Resolved<'_>,
) -> Vec<&'d Element> {
    let members: Option<HashSet<*const Element>> =
        context.map(|ctx| ctx.iter().map(|el| ptr::from_ref(*el)).collect());

    let mut selected = Vec::new();
    // (element, parent in context, some ancestor in context)
    let mut stack: Vec<(&'d Element, bool, bool)> = vec![(root, false, false)];

    while let Some((element, parent_in, ancestor_in)) = stack.pop() {
        let reached = match (step.axis, &members) {
            (Axis::Child, None) => ptr::eq(element, root),
            (Axis::Descendant, None) => true,
            (Axis::Child, Some(_)) => parent_in,
            (Axis::Descendant, Some(_)) => ancestor_in,
        };
        if reached && matches(element, step, test) {
            selected.push(element);
        }

        let is_member = members
            .as_ref()
            .is_some_and(|set| set.contains(&ptr::from_ref(element)));
        for child in element.children().iter().rev() {
            if let Content::Element(child) = child {
                stack.push((child, is_member, ancestor_in || is_member));
            }
        }
    }
    selected
}

struct PathParser<'a> {
    cursor: Cursor<'a>,
    source: &'a str,
}

impl PathParser<'_> {
    fn parse(mut self) -> Result<Path> {
        let mut steps = Vec::new();
        let mut attribute = None;

        if self.cursor.is_eof() {
            return Err(self.error("empty path"));
        }

        while !self.cursor.is_eof() {
            let axis = self.axis()?;
            self.cursor.skip_whitespace();
            if self.cursor.consume(b'@') {
                let name = self.qname()?;
                self.cursor.skip_whitespace();
                if !self.cursor.is_eof() {
                    return Err(self.error("attribute step must be last"));
                }
                if axis == Axis::Descendant {
                    return Err(self.error("attribute step must use '/'"));
                }
                attribute = Some(name);
                break;
            }

            let test = if self.cursor.consume(b'*') {
                NameTest::Any
            } else {
                NameTest::Name(self.qname()?)
            };
            let mut conditions = Vec::new();
            self.cursor.skip_whitespace();
            while self.cursor.consume(b'[') {
                self.predicate(&mut conditions)?;
                self.cursor.skip_whitespace();
            }
            steps.push(Step {
                axis,
                test,
                conditions,
            });
        }

        if steps.is_empty() {
            return Err(self.error("path selects no element step"));
        }
        Ok(Path { steps, attribute })
    }

    fn axis(&mut self) -> Result<Axis> {
        if self.cursor.consume_bytes(b"//") {
            Ok(Axis::Descendant)
        } else if self.cursor.consume(b'/') {
            Ok(Axis::Child)
        } else {
            Err(self.error("expected '/' or '//'"))
        }
    }

    fn predicate(&mut self, conditions: &mut Vec<AttrTest>) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if !self.cursor.consume(b'@') {
                return Err(self.error("predicates only support @attribute tests"));
            }
            let name = self.qname()?;
            self.cursor.skip_whitespace();
            if !self.cursor.consume(b'=') {
                return Err(self.error("expected '='"));
            }
            self.cursor.skip_whitespace();
            let value = self.literal()?;
            conditions.push(AttrTest { name, value });

            self.cursor.skip_whitespace();
            if self.cursor.consume(b']') {
                return Ok(());
            }
            if !self.keyword(b"and") {
                return Err(self.error("expected 'and' or ']'"));
            }
        }
    }

    /// Consume `word` only when it is not the start of a longer name
    fn keyword(&mut self, word: &[u8]) -> bool {
        let boundary = self
            .cursor
            .peek(word.len())
            .is_none_or(|b| !is_name_char(b));
        boundary && self.cursor.consume_bytes(word)
    }

    fn literal(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(self.error("expected quoted literal")),
        };
        self.cursor.advance();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let value = self.text_from(start);
                self.cursor.advance();
                return Ok(value);
            }
            self.cursor.advance();
        }
        Err(self.error("unterminated literal"))
    }

    fn qname(&mut self) -> Result<QName> {
        let first = self.ncname()?;
        if self.cursor.current() == Some(b':') && self.cursor.peek(1).is_some_and(is_name_start) {
            self.cursor.advance();
            let local = self.ncname()?;
            return Ok(QName {
                prefix: Some(first),
                local,
            });
        }
        Ok(QName {
            prefix: None,
            local: first,
        })
    }

    fn ncname(&mut self) -> Result<String> {
        let start = self.cursor.pos();
        match self.cursor.current() {
            Some(b) if is_name_start(b) => self.cursor.advance(),
            _ => return Err(self.error("expected a name")),
        }
        while self.cursor.current().is_some_and(is_name_char) {
            self.cursor.advance();
        }
        Ok(self.text_from(start))
    }

    fn text_from(&self, start: usize) -> String {
        String::from_utf8_lossy(self.cursor.slice_from(start)).into_owned()
    }

    fn error(&self, message: &str) -> Error {
        Error::invalid_argument(
            "Path::parse",
            format!("{message} at {} in '{}'", self.cursor.position(), self.source),
        )
    }
}
