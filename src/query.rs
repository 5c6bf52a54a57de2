//! Attribute lookups on assembled VOTable documents

use tracing::{debug, error, instrument};

use crate::document::VOTABLE_NS_URI;
use crate::error::{Error, Result};
use crate::path::{Bindings, Path, Selection};
use crate::symbols::Attribute;
use crate::tree::Document;

/// Size of the path buffer in bytes; expressions must be strictly shorter
pub const XPATH_MAX_LEN: usize = 500;

/// Prefix bound to the VOTable namespace inside query paths
pub const QUERY_PREFIX: &str = "vot";

const OP: &str = "get_resource_param_attribute";

/// Find `attribute` on the PARAM named `param_name` inside the RESOURCE
/// with the given `utype` and `name`
///
/// Returns the first match in document order, or `None` when there is no
/// such RESOURCE, PARAM or attribute.
///
/// ```
/// use votable::{build_param_node, build_resource_node, serialize_to_string};
/// use votable::{get_resource_param_attribute, Attribute, Datatype, Document};
/// # fn main() -> votable::Result<()> {
/// let param = build_param_node("Tspan", Some("s"), Datatype::Double, None, "3600")?;
/// let xml = serialize_to_string(build_resource_node("Run", "r1", [param])?)?;
/// let doc = Document::parse(&xml)?;
///
/// let unit = get_resource_param_attribute(&doc, "Run", "r1", "Tspan", Attribute::Unit)?;
/// assert_eq!(unit.as_deref(), Some("s"));
/// # Ok(())
/// # }
/// ```
#[instrument(level = "debug", skip_all, fields(utype = %resource_type, name = %resource_name, param = %param_name, attribute = %attribute))]
pub fn get_resource_param_attribute(
    document: &Document,
    resource_type: &str,
    resource_name: &str,
    param_name: &str,
    attribute: Attribute,
) -> Result<Option<String>> {
    let expression = param_attribute_path(resource_type, resource_name, param_name, attribute)?;

    let path = Path::parse(&expression).map_err(|err| {
        error!(operation = OP, %err, "XPath compilation failed");
        err.within(OP)
    })?;
    let bindings = Bindings::new().bind(QUERY_PREFIX, VOTABLE_NS_URI);
    let found = path.select(document, &bindings).map_err(|err| {
        error!(operation = OP, %err, "XPath evaluation failed");
        err.within(OP)
    })?;

    let value = found.first().map(Selection::string_value);
    debug!(operation = OP, matches = found.len(), found = value.is_some(), "query evaluated");
    Ok(value)
}

/// `//vot:RESOURCE[@utype='T' and @name='N']/vot:PARAM[@name='P']/@A`
fn param_attribute_path(
    resource_type: &str,
    resource_name: &str,
    param_name: &str,
    attribute: Attribute,
) -> Result<String> {
    for value in [resource_type, resource_name, param_name] {
        if value.contains('\'') {
            return Err(Error::invalid_argument(
                OP,
                format!("value {value:?} cannot be quoted in a path literal"),
            ));
        }
    }

    let expression = format!(
        "//{p}:RESOURCE[@utype='{resource_type}' and @name='{resource_name}']/{p}:PARAM[@name='{param_name}']/@{attribute}",
        p = QUERY_PREFIX,
    );
    if expression.len() >= XPATH_MAX_LEN {
        error!(operation = OP, len = expression.len(), "XPath statement construction failed");
        return Err(Error::construction(
            OP,
            format!(
                "path expression is {} bytes, must be under {XPATH_MAX_LEN}",
                expression.len()
            ),
        ));
    }
    Ok(expression)
}
