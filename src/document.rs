//! Wrapping a fragment into a VOTable document

use tracing::{debug, error, instrument, warn};

use crate::error::{Error, Result};
use crate::tree::{Content, Document, Element, Namespace};

pub const VOTABLE_VERSION: &str = "1.1";
pub const VOTABLE_NS_URI: &str = "http://www.ivoa.net/xml/VOTable/v1.1";
pub const VOTABLE_SCHEMA: &str = "http://www.ivoa.net/xml/VOTable/v1.1";
pub const XSI_PREFIX: &str = "xsi";
pub const XSI_NS_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Elements the schema allows directly under `VOTABLE`
pub const ROOT_CHILDREN: [&str; 5] = ["DESCRIPTION", "COOSYS", "PARAM", "INFO", "RESOURCE"];

const OP: &str = "assemble_document";

/// Optional decorations: a failure is logged and construction continues
pub trait BestEffort {
    fn or_warn(self, what: &str);
}

impl<T> BestEffort for Result<T> {
    fn or_warn(self, what: &str) {
        if let Err(err) = self {
            warn!(operation = OP, %err, "VOTABLE decoration failed: {what}");
        }
    }
}

/// Wrap `fragment` as the single child of a `VOTABLE` root
///
/// The version and schema-location annotations are best-effort; the default
/// namespace, attaching the fragment and namespace reconciliation are
/// mandatory. On any mandatory failure the whole document, fragment
/// included, is dropped.
///
/// The fragment's root should be one of [`ROOT_CHILDREN`]; anything else is
/// logged but still wrapped since no schema validation happens here.
#[instrument(level = "debug", skip_all, fields(fragment = fragment.name()))]
pub fn assemble_document(fragment: Element) -> Result<Document> {
    let document = assemble(fragment);
    if let Err(err) = &document {
        error!(operation = OP, %err, "VOTable document construction failed");
    }
    document
}

fn assemble(fragment: Element) -> Result<Document> {
    if !ROOT_CHILDREN.contains(&fragment.name()) {
        warn!(
            operation = OP,
            tag = fragment.name(),
            "fragment root is not a permitted VOTABLE child"
        );
    }

    let mut root = Element::new("VOTABLE").map_err(|err| err.within(OP))?;

    root.set_attribute("version", VOTABLE_VERSION)
        .or_warn("version");

    let default_ns = root
        .declare_namespace(None, VOTABLE_NS_URI)
        .map_err(|err| err.within(OP))?;

    match root.declare_namespace(Some(XSI_PREFIX), XSI_NS_URI) {
        Ok(xsi) => root
            .set_attribute(&schema_location_key(&xsi), VOTABLE_SCHEMA)
            .or_warn("xsi:noNamespaceSchemaLocation"),
        Err(err) => Err::<(), _>(err).or_warn("xsi namespace"),
    }

    root.append_child(fragment).map_err(|err| {
        Error::construction(
            OP,
            format!("couldn't append fragment to VOTABLE root: {}", err.message()),
        )
    })?;

    let mut document = Document::new(root);
    let reconciled = reconcile_default_namespace(document.root_mut(), &default_ns)?;
    debug!(operation = OP, reconciled, "default namespace reconciled");

    Ok(document)
}

fn schema_location_key(xsi: &Namespace) -> String {
    format!(
        "{}:noNamespaceSchemaLocation",
        xsi.prefix().unwrap_or(XSI_PREFIX)
    )
}

/// Give every element under `root` without a namespace the default one
///
/// `default_ns` must be declared on `root` itself. Elements that already
/// carry a namespace are left alone, but their descendants are still
/// visited. Returns the number of elements updated.
pub fn reconcile_default_namespace(root: &mut Element, default_ns: &Namespace) -> Result<usize> {
    const RECONCILE: &str = "reconcile_default_namespace";

    if !default_ns.is_default() {
        return Err(Error::invalid_argument(
            RECONCILE,
            format!("namespace with prefix '{}' is not a default namespace", default_ns.prefix().unwrap_or("")),
        ));
    }
    if !root.namespace_decls().contains(default_ns) {
        return Err(Error::construction(
            RECONCILE,
            format!("default namespace {} is not declared on {}", default_ns.uri(), root.name()),
        ));
    }

    let mut updated = 0usize;
    let mut stack: Vec<&mut Element> = vec![root];
    while let Some(element) = stack.pop() {
        if element.namespace().is_none() {
            element.set_namespace(Some(default_ns.clone()));
            updated += 1;
        }
        // reversed so children are visited in document order
        for child in element.children_mut().iter_mut().rev() {
            if let Content::Element(child) = child {
                stack.push(child);
            }
        }
    }

    Ok(updated)
}
