//! Typed VOTable node builders
//!
//! Every builder checks its mandatory inputs before creating anything. Once
//! a node exists, the first failure drops it (and whatever was already
//! moved under it) and returns the error, so a caller never receives a
//! half-built node.

pub mod table;

use tracing::{debug, error, instrument};

use crate::error::{Error, Result};
use crate::symbols::{Datatype, IntoDatatype};
use crate::tree::Element;

pub use table::{build_table_node, Column, Serialization};

/// Build a `PARAM` node
///
/// `name` must be non-empty and `datatype` must resolve through the
/// registry. `value` is mandatory but may be empty. `unit` and `arraysize`
/// are only written when present and non-empty.
///
/// ```
/// use votable::{build_param_node, Datatype};
/// # fn main() -> votable::Result<()> {
/// let param = build_param_node("Freq", Some("Hz"), Datatype::Double, None, "100.5")?;
/// assert_eq!(param.attribute("datatype"), Some("double"));
/// # Ok(())
/// # }
/// ```
#[instrument(level = "debug", skip_all, fields(name = %name))]
pub fn build_param_node(
    name: &str,
    unit: Option<&str>,
    datatype: impl IntoDatatype,
    arraysize: Option<&str>,
    value: &str,
) -> Result<Element> {
    const OP: &str = "build_param_node";

    let datatype = validate_typed(OP, name, datatype)?;
    let node = typed_node(OP, "PARAM", name, unit, datatype, arraysize).and_then(|mut node| {
        node.set_attribute("value", value)
            .map_err(|err| err.within(OP))?;
        Ok(node)
    });
    log_outcome(OP, node)
}

/// Build a `FIELD` node; same rules as [`build_param_node`] without a value
#[instrument(level = "debug", skip_all, fields(name = %name))]
pub fn build_field_node(
    name: &str,
    unit: Option<&str>,
    datatype: impl IntoDatatype,
    arraysize: Option<&str>,
) -> Result<Element> {
    const OP: &str = "build_field_node";

    let datatype = validate_typed(OP, name, datatype)?;
    log_outcome(OP, typed_node(OP, "FIELD", name, unit, datatype, arraysize))
}

/// Build a `RESOURCE` node and move `children` under it in order
///
/// `resource_type` becomes the `utype` attribute and `identifier` the
/// `name` attribute.
#[instrument(level = "debug", skip_all, fields(utype = %resource_type, name = %identifier))]
pub fn build_resource_node(
    resource_type: &str,
    identifier: &str,
    children: impl IntoIterator<Item = Element>,
) -> Result<Element> {
    log_outcome(
        "build_resource_node",
        resource_node(resource_type, identifier, children),
    )
}

fn resource_node(
    resource_type: &str,
    identifier: &str,
    children: impl IntoIterator<Item = Element>,
) -> Result<Element> {
    const OP: &str = "build_resource_node";

    let mut resource = Element::new("RESOURCE").map_err(|err| err.within(OP))?;
    resource
        .set_attribute("utype", resource_type)
        .map_err(|err| err.within(OP))?;
    resource
        .set_attribute("name", identifier)
        .map_err(|err| err.within(OP))?;

    for child in children {
        let tag = child.name().to_string();
        resource.append_child(child).map_err(|err| {
            Error::new(
                err.kind(),
                OP,
                format!("couldn't add {tag} child to RESOURCE: {}", err.message()),
            )
        })?;
    }
    Ok(resource)
}

/// Mandatory-input checks shared by PARAM and FIELD
fn validate_typed(op: &'static str, name: &str, datatype: impl IntoDatatype) -> Result<Datatype> {
    if name.is_empty() {
        error!(operation = op, "missing mandatory attribute: name");
        return Err(Error::invalid_argument(op, "missing mandatory attribute: name"));
    }
    datatype.into_datatype().map_err(|err| {
        error!(operation = op, %err, "datatype lookup failed");
        err.within(op)
    })
}

fn typed_node(
    op: &'static str,
    tag: &str,
    name: &str,
    unit: Option<&str>,
    datatype: Datatype,
    arraysize: Option<&str>,
) -> Result<Element> {
    let mut node = Element::new(tag).map_err(|err| err.within(op))?;

    node.set_attribute("name", name).map_err(|err| err.within(op))?;
    if let Some(unit) = non_empty(unit) {
        node.set_attribute("unit", unit).map_err(|err| err.within(op))?;
    }
    node.set_attribute("datatype", datatype.as_str())
        .map_err(|err| err.within(op))?;
    if let Some(arraysize) = non_empty(arraysize) {
        node.set_attribute("arraysize", arraysize)
            .map_err(|err| err.within(op))?;
    }

    Ok(node)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn log_outcome(op: &'static str, node: Result<Element>) -> Result<Element> {
    match &node {
        Ok(element) => debug!(operation = op, tag = element.name(), "node built"),
        Err(err) => error!(operation = op, %err, "node construction failed"),
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tree::Content;

    #[test]
    fn test_param_attributes_in_order() {
        let param =
            build_param_node("Tspan", Some("s"), Datatype::Double, Some("1"), "3600").unwrap();
        assert_eq!(param.name(), "PARAM");
        let attrs: Vec<_> = param.attributes().collect();
        assert_eq!(
            attrs,
            vec![
                ("name", "Tspan"),
                ("unit", "s"),
                ("datatype", "double"),
                ("arraysize", "1"),
                ("value", "3600"),
            ]
        );
    }

    #[test]
    fn test_param_empty_value_allowed() {
        let param = build_param_node("note", None, Datatype::Char, Some("*"), "").unwrap();
        assert_eq!(param.attribute("value"), Some(""));
        assert_eq!(param.attribute("unit"), None);
    }

    #[test]
    fn test_param_optional_empty_strings_skipped() {
        let param = build_param_node("x", Some(""), Datatype::Int, Some(""), "1").unwrap();
        assert_eq!(param.attribute("unit"), None);
        assert_eq!(param.attribute("arraysize"), None);
    }

    #[test]
    fn test_param_missing_name() {
        let err = build_param_node("", None, Datatype::Int, None, "1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.operation(), "build_param_node");
    }

    #[test]
    fn test_unknown_datatypes() {
        let err = build_param_node("x", None, 0u8, None, "1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSymbol);
        assert_eq!(err.operation(), "build_param_node");

        let err = build_field_node("x", None, 13u8, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSymbol);

        let err = build_field_node("x", None, "real8", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSymbol);
        assert_eq!(err.operation(), "build_field_node");
    }

    #[test]
    fn test_field_has_no_value() {
        let field = build_field_node("freq", Some("Hz"), "double", None).unwrap();
        assert_eq!(field.name(), "FIELD");
        assert_eq!(field.attribute("value"), None);
        assert_eq!(field.attribute("datatype"), Some("double"));
    }

    #[test]
    fn test_resource_children_in_order() {
        let f1 = build_field_node("a", None, Datatype::Int, None).unwrap();
        let f2 = build_field_node("b", None, Datatype::Int, None).unwrap();
        let resource = build_resource_node("T", "N", vec![f1, f2]).unwrap();

        assert_eq!(resource.attribute("utype"), Some("T"));
        assert_eq!(resource.attribute("name"), Some("N"));
        let names: Vec<_> = resource
            .child_elements()
            .filter_map(|child| child.attribute("name"))
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(resource
            .children()
            .iter()
            .all(|c| matches!(c, Content::Element(_))));
    }

    #[test]
    fn test_resource_nesting() {
        let inner = build_resource_node("inner", "i", Vec::new()).unwrap();
        let outer = build_resource_node("outer", "o", [inner]).unwrap();
        assert_eq!(outer.element_count(), 2);
    }
}
