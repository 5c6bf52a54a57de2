//! `TABLE` assembly with inline `TABLEDATA`

use std::fmt::{self, Write};

use tracing::{debug, error, instrument};

use crate::error::{Error, ErrorKind, Result};
use crate::symbols::Datatype;
use crate::tree::Element;

const OP: &str = "build_table_node";

/// Significant digits for `float` cells
pub const FLOAT_DIGITS: usize = 8;
/// Significant digits for `double` cells
pub const DOUBLE_DIGITS: usize = 16;

/// How table rows are serialized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Serialization {
    /// Rows inline as `TABLEDATA`; the only supported mode
    TableData,
    /// `BINARY` stream
    Binary,
    /// `FITS` stream
    Fits,
}

/// Typed handle on one column of table data
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Column<'a> {
    Boolean(&'a [bool]),
    Bit(&'a [bool]),
    Char(&'a [&'a str]),
    UnicodeChar(&'a [&'a str]),
    UnsignedByte(&'a [u8]),
    Short(&'a [i16]),
    Int(&'a [i32]),
    Long(&'a [i64]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    /// `[real, imaginary]` pairs
    FloatComplex(&'a [[f32; 2]]),
    DoubleComplex(&'a [[f64; 2]]),
}

impl Column<'_> {
    pub const fn datatype(&self) -> Datatype {
        match self {
            Self::Boolean(_) => Datatype::Boolean,
            Self::Bit(_) => Datatype::Bit,
            Self::Char(_) => Datatype::Char,
            Self::UnicodeChar(_) => Datatype::UnicodeChar,
            Self::UnsignedByte(_) => Datatype::UnsignedByte,
            Self::Short(_) => Datatype::Short,
            Self::Int(_) => Datatype::Int,
            Self::Long(_) => Datatype::Long,
            Self::Float(_) => Datatype::Float,
            Self::Double(_) => Datatype::Double,
            Self::FloatComplex(_) => Datatype::FloatComplex,
            Self::DoubleComplex(_) => Datatype::DoubleComplex,
        }
    }

    pub const fn len(&self) -> usize {
        match self {
            Self::Boolean(v) | Self::Bit(v) => v.len(),
            Self::Char(v) | Self::UnicodeChar(v) => v.len(),
            Self::UnsignedByte(v) => v.len(),
            Self::Short(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::FloatComplex(v) => v.len(),
            Self::DoubleComplex(v) => v.len(),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the TABLEDATA text of one cell
    pub fn write_cell<W: Write>(&self, row: usize, out: &mut W) -> fmt::Result {
        match *self {
            Self::Boolean(v) => out.write_str(if *cell(v, row)? { "T" } else { "F" }),
            Self::Bit(v) => out.write_str(if *cell(v, row)? { "1" } else { "0" }),
            Self::Char(v) | Self::UnicodeChar(v) => out.write_str(cell(v, row)?),
            Self::UnsignedByte(v) => write!(out, "{}", cell(v, row)?),
            Self::Short(v) => write!(out, "{}", cell(v, row)?),
            Self::Int(v) => write!(out, "{}", cell(v, row)?),
            Self::Long(v) => write!(out, "{}", cell(v, row)?),
            Self::Float(v) => write_general(out, f64::from(*cell(v, row)?), FLOAT_DIGITS),
            Self::Double(v) => write_general(out, *cell(v, row)?, DOUBLE_DIGITS),
            Self::FloatComplex(v) => {
                let [re, im] = *cell(v, row)?;
                write_general(out, f64::from(re), FLOAT_DIGITS)?;
                out.write_char(' ')?;
                write_general(out, f64::from(im), FLOAT_DIGITS)
            }
            Self::DoubleComplex(v) => {
                let [re, im] = *cell(v, row)?;
                write_general(out, re, DOUBLE_DIGITS)?;
                out.write_char(' ')?;
                write_general(out, im, DOUBLE_DIGITS)
            }
        }
    }
}

fn cell<T>(values: &[T], row: usize) -> std::result::Result<&T, fmt::Error> {
    values.get(row).ok_or(fmt::Error)
}

/// Write `value` the way C's `%.{digits}g` does
///
/// Non-finite values use the VOTable spellings `NaN`, `+Inf` and `-Inf`.
pub fn write_general<W: Write>(out: &mut W, value: f64, digits: usize) -> fmt::Result {
    if value.is_nan() {
        return out.write_str("NaN");
    }
    if value.is_infinite() {
        return out.write_str(if value > 0.0 { "+Inf" } else { "-Inf" });
    }
    if value == 0.0 {
        return out.write_str(if value.is_sign_negative() { "-0" } else { "0" });
    }

    let precision = digits.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').ok_or(fmt::Error)?;
    let exponent: i32 = exponent.parse().map_err(|_| fmt::Error)?;
    let precision_exp = i32::try_from(precision).map_err(|_| fmt::Error)?;

    if exponent < -4 || exponent >= precision_exp {
        let sign = if exponent < 0 { '-' } else { '+' };
        write!(
            out,
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = usize::try_from(precision_exp - 1 - exponent).map_err(|_| fmt::Error)?;
        let fixed = format!("{value:.decimals$}");
        out.write_str(trim_fraction(&fixed))
    }
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

/// Build a `TABLE` node holding `fields` and `row_count` rows of data
///
/// Column types are read back from the `datatype` attribute of each FIELD
/// after it has been moved under the table, so `columns` must match
/// `fields` in order, count and type. Every column needs at least
/// `row_count` values. Only [`Serialization::TableData`] is accepted, and it
/// takes no external stream.
#[instrument(level = "debug", skip_all, fields(fields = fields.len(), rows = row_count))]
pub fn build_table_node(
    name: Option<&str>,
    fields: Vec<Element>,
    serialization: Serialization,
    external_stream: Option<&str>,
    row_count: usize,
    columns: &[Column<'_>],
) -> Result<Element> {
    let table = validate(&fields, serialization, external_stream, columns.len())
        .and_then(|()| assemble(name, fields, row_count, columns));
    match &table {
        Ok(_) => debug!(operation = OP, row_count, "table built"),
        Err(err) => error!(operation = OP, %err, "table construction failed"),
    }
    table
}

fn validate(
    fields: &[Element],
    serialization: Serialization,
    external_stream: Option<&str>,
    column_count: usize,
) -> Result<()> {
    if serialization != Serialization::TableData {
        return Err(Error::invalid_argument(
            OP,
            format!("only TABLEDATA serialization is implemented, got {serialization:?}"),
        ));
    }
    if fields.is_empty() {
        return Err(Error::invalid_argument(OP, "empty field list"));
    }
    if let Some(stream) = external_stream {
        return Err(Error::invalid_argument(
            OP,
            format!("TABLEDATA serialization doesn't allow an external stream, got '{stream}'"),
        ));
    }
    if let Some(other) = fields.iter().find(|f| f.name() != "FIELD") {
        return Err(Error::invalid_argument(
            OP,
            format!("expected FIELD node, got {}", other.name()),
        ));
    }
    if column_count != fields.len() {
        return Err(Error::invalid_argument(
            OP,
            format!("{} fields but {column_count} data columns", fields.len()),
        ));
    }
    Ok(())
}

fn assemble(
    name: Option<&str>,
    fields: Vec<Element>,
    row_count: usize,
    columns: &[Column<'_>],
) -> Result<Element> {
    let mut table = Element::new("TABLE").map_err(|err| err.within(OP))?;
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        table.set_attribute("name", name).map_err(|err| err.within(OP))?;
    }

    let mut field_count = 0usize;
    for field in fields {
        table.append_child(field).map_err(|err| {
            Error::new(
                err.kind(),
                OP,
                format!("couldn't add FIELD {field_count} to TABLE: {}", err.message()),
            )
        })?;
        field_count += 1;
    }

    let mut column_types: Vec<Datatype> = Vec::new();
    column_types
        .try_reserve_exact(field_count)
        .map_err(|_| Error::exhausted(OP, format!("column type list of {field_count}")))?;
    for (col, field) in table.child_elements().enumerate() {
        column_types.push(field_datatype(col, field)?);
    }

    for (col, (datatype, column)) in column_types.iter().zip(columns).enumerate() {
        if column.datatype() != *datatype {
            return Err(Error::invalid_argument(
                OP,
                format!(
                    "column {col} holds {} data but its FIELD is {datatype}",
                    column.datatype()
                ),
            ));
        }
        if column.len() < row_count {
            return Err(Error::invalid_argument(
                OP,
                format!("column {col} has {} values, need {row_count}", column.len()),
            ));
        }
    }

    let data = build_data(row_count, columns)?;
    table.append_child(data).map_err(|err| err.within(OP))?;
    Ok(table)
}

fn field_datatype(col: usize, field: &Element) -> Result<Datatype> {
    let token = field.attribute("datatype").ok_or_else(|| {
        Error::invalid_argument(OP, format!("FIELD {col} has no datatype attribute"))
    })?;
    Datatype::from_token(token).ok_or_else(|| {
        Error::unknown_symbol(
            OP,
            format!("invalid datatype '{token}' in FIELD {col}"),
        )
    })
}

/// `DATA` holding one `TABLEDATA` with `TR`/`TD` rows
fn build_data(row_count: usize, columns: &[Column<'_>]) -> Result<Element> {
    let mut tabledata = Element::new("TABLEDATA").map_err(|err| err.within(OP))?;

    for row in 0..row_count {
        let mut tr = Element::new("TR").map_err(|err| err.within(OP))?;
        for (col, column) in columns.iter().enumerate() {
            let mut text = String::new();
            column.write_cell(row, &mut text).map_err(|_| {
                Error::new(
                    ErrorKind::FormattingFailed,
                    OP,
                    format!("failed to format row {row}, column {col}"),
                )
            })?;

            let mut td = Element::new("TD").map_err(|err| err.within(OP))?;
            td.append_text(text).map_err(|err| err.within(OP))?;
            tr.append_child(td).map_err(|err| err.within(OP))?;
        }
        tabledata.append_child(tr).map_err(|err| err.within(OP))?;
    }

    let mut data = Element::new("DATA").map_err(|err| err.within(OP))?;
    data.append_child(tabledata).map_err(|err| err.within(OP))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_field_node;

    fn general(value: f64, digits: usize) -> String {
        let mut out = String::new();
        write_general(&mut out, value, digits).unwrap();
        out
    }

    fn two_fields() -> Vec<Element> {
        vec![
            build_field_node("freq", Some("Hz"), Datatype::Double, None).unwrap(),
            build_field_node("count", None, Datatype::Int, None).unwrap(),
        ]
    }

    fn cell_texts(table: &Element) -> Vec<Vec<String>> {
        let data = table.child_elements().find(|e| e.name() == "DATA").unwrap();
        let tabledata = data.child_elements().next().unwrap();
        tabledata
            .child_elements()
            .map(|tr| tr.child_elements().filter_map(Element::text).collect())
            .collect()
    }

    #[test]
    fn test_general_format_matches_c() {
        assert_eq!(general(9.99999, 6), "9.99999");
        assert_eq!(general(100.0, 16), "100");
        assert_eq!(general(0.1, 16), "0.1");
        assert_eq!(general(1e20, 16), "1e+20");
        assert_eq!(general(1.5e-5, 6), "1.5e-05");
        assert_eq!(general(0.0001, 6), "0.0001");
        assert_eq!(general(123456.0, 6), "123456");
        assert_eq!(general(1234567.0, 6), "1.23457e+06");
        assert_eq!(general(-2.5, 6), "-2.5");
        assert_eq!(general(0.0, 6), "0");
        assert_eq!(general(f64::NAN, 6), "NaN");
        assert_eq!(general(f64::NEG_INFINITY, 6), "-Inf");
    }

    #[test]
    fn test_cells_hold_column_values() {
        let freqs = [100.5, 200.0, 0.25];
        let counts = [1, 2, 3];
        let table = build_table_node(
            Some("spectrum"),
            two_fields(),
            Serialization::TableData,
            None,
            3,
            &[Column::Double(&freqs), Column::Int(&counts)],
        )
        .unwrap();

        assert_eq!(table.attribute("name"), Some("spectrum"));
        assert_eq!(
            cell_texts(&table),
            vec![
                vec!["100.5".to_string(), "1".to_string()],
                vec!["200".to_string(), "2".to_string()],
                vec!["0.25".to_string(), "3".to_string()],
            ]
        );
    }

    #[test]
    fn test_shape() {
        let table = build_table_node(
            None,
            two_fields(),
            Serialization::TableData,
            None,
            3,
            &[Column::Double(&[1.0; 4]), Column::Int(&[7; 3])],
        )
        .unwrap();

        let names: Vec<_> = table.child_elements().map(Element::name).collect();
        assert_eq!(names, vec!["FIELD", "FIELD", "DATA"]);
        assert_eq!(table.attribute("name"), None);
        let rows = cell_texts(&table);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn test_non_tabledata_always_rejected() {
        for mode in [Serialization::Binary, Serialization::Fits] {
            let err = build_table_node(None, Vec::new(), mode, Some("out.bin"), 0, &[]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);

            let err = build_table_node(None, two_fields(), mode, None, 0, &[]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_input_validation() {
        let err = build_table_node(None, Vec::new(), Serialization::TableData, None, 0, &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = build_table_node(
            None,
            two_fields(),
            Serialization::TableData,
            Some("stream"),
            0,
            &[Column::Double(&[]), Column::Int(&[])],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = build_table_node(
            None,
            two_fields(),
            Serialization::TableData,
            None,
            0,
            &[Column::Double(&[])],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_column_mismatches() {
        let err = build_table_node(
            None,
            two_fields(),
            Serialization::TableData,
            None,
            1,
            &[Column::Int(&[1]), Column::Double(&[1.0])],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("column 0"));

        let err = build_table_node(
            None,
            two_fields(),
            Serialization::TableData,
            None,
            2,
            &[Column::Double(&[1.0, 2.0]), Column::Int(&[1])],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("column 1"));
    }

    #[test]
    fn test_field_datatype_read_back() {
        let mut field = Element::new("FIELD").unwrap();
        field.set_attribute("name", "x").unwrap();
        field.set_attribute("datatype", "quad").unwrap();
        let err = build_table_node(
            None,
            vec![field],
            Serialization::TableData,
            None,
            0,
            &[Column::Double(&[])],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSymbol);

        let mut field = Element::new("FIELD").unwrap();
        field.set_attribute("name", "x").unwrap();
        let err = build_table_node(
            None,
            vec![field],
            Serialization::TableData,
            None,
            0,
            &[Column::Double(&[])],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_non_field_children_rejected() {
        let param = Element::new("PARAM").unwrap();
        let err = build_table_node(
            None,
            vec![param],
            Serialization::TableData,
            None,
            0,
            &[Column::Int(&[])],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_every_column_type_formats() {
        let fields: Vec<_> = Datatype::ALL
            .iter()
            .map(|dt| build_field_node(dt.as_str(), None, *dt, None).unwrap())
            .collect();
        let columns = [
            Column::Boolean(&[true]),
            Column::Bit(&[false]),
            Column::Char(&["abc"]),
            Column::UnicodeChar(&["\u{3b1}"]),
            Column::UnsignedByte(&[255]),
            Column::Short(&[-3]),
            Column::Int(&[42]),
            Column::Long(&[-9_000_000_000]),
            Column::Float(&[0.5]),
            Column::Double(&[2.25]),
            Column::FloatComplex(&[[1.0, -1.0]]),
            Column::DoubleComplex(&[[0.5, 1e-7]]),
        ];
        let table =
            build_table_node(None, fields, Serialization::TableData, None, 1, &columns).unwrap();

        assert_eq!(
            cell_texts(&table),
            vec![vec![
                "T", "0", "abc", "\u{3b1}", "255", "-3", "42", "-9000000000", "0.5", "2.25",
                "1 -1", "0.5 1e-07",
            ]
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()]
        );
    }

    #[test]
    fn test_zero_rows() {
        let table = build_table_node(
            None,
            two_fields(),
            Serialization::TableData,
            None,
            0,
            &[Column::Double(&[]), Column::Int(&[])],
        )
        .unwrap();
        assert!(cell_texts(&table).is_empty());
    }
}
