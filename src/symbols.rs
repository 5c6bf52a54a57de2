//! Closed symbol tables for VOTable datatypes and element attributes
//!
//! Both tables map every enum member to exactly one schema token. The
//! reverse lookups return `None` for anything outside the set; the `FromStr`
//! impls turn that into an [`ErrorKind::UnknownSymbol`] error.
//!
//! [`ErrorKind::UnknownSymbol`]: crate::ErrorKind::UnknownSymbol

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// VOTable 1.1 primitive datatype
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Datatype {
    Boolean,
    Bit,
    Char,
    UnicodeChar,
    UnsignedByte,
    Short,
    Int,
    Long,
    Float,
    Double,
    FloatComplex,
    DoubleComplex,
}

impl Datatype {
    pub const ALL: [Self; 12] = [
        Self::Boolean,
        Self::Bit,
        Self::Char,
        Self::UnicodeChar,
        Self::UnsignedByte,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::FloatComplex,
        Self::DoubleComplex,
    ];

    /// Schema token written into `datatype` attributes
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Bit => "bit",
            Self::Char => "char",
            Self::UnicodeChar => "unicodeChar",
            Self::UnsignedByte => "unsignedByte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::FloatComplex => "floatComplex",
            Self::DoubleComplex => "doubleComplex",
        }
    }

    /// Look up a schema token; `None` if it is not one of the twelve
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|dt| dt.as_str() == token)
    }

    /// Numeric code, starting at 1 for `Boolean`
    pub const fn code(self) -> u8 {
        match self {
            Self::Boolean => 1,
            Self::Bit => 2,
            Self::Char => 3,
            Self::UnicodeChar => 4,
            Self::UnsignedByte => 5,
            Self::Short => 6,
            Self::Int => 7,
            Self::Long => 8,
            Self::Float => 9,
            Self::Double => 10,
            Self::FloatComplex => 11,
            Self::DoubleComplex => 12,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|dt| dt.code() == code)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_token(s)
            .ok_or_else(|| Error::unknown_symbol("Datatype::from_str", format!("invalid datatype '{s}'")))
    }
}

impl TryFrom<u8> for Datatype {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::from_code(code).ok_or_else(|| {
            Error::unknown_symbol(
                "Datatype::try_from",
                format!("invalid datatype code {code}, has to be within [1, 12]"),
            )
        })
    }
}

/// Anything a builder accepts as a datatype
///
/// A [`Datatype`] always resolves; tokens and raw codes go through the
/// registry and fail with `UnknownSymbol`.
pub trait IntoDatatype {
    fn into_datatype(self) -> Result<Datatype>;
}

impl IntoDatatype for Datatype {
    fn into_datatype(self) -> Result<Datatype> {
        Ok(self)
    }
}

impl IntoDatatype for &str {
    fn into_datatype(self) -> Result<Datatype> {
        self.parse()
    }
}

impl IntoDatatype for u8 {
    fn into_datatype(self) -> Result<Datatype> {
        Datatype::try_from(self)
    }
}

/// Attribute keys that may be queried on VOTable elements
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    Id,
    Unit,
    Datatype,
    Precision,
    Width,
    Ref,
    Name,
    Ucd,
    Utype,
    Arraysize,
    Value,
}

impl Attribute {
    pub const ALL: [Self; 11] = [
        Self::Id,
        Self::Unit,
        Self::Datatype,
        Self::Precision,
        Self::Width,
        Self::Ref,
        Self::Name,
        Self::Ucd,
        Self::Utype,
        Self::Arraysize,
        Self::Value,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Unit => "unit",
            Self::Datatype => "datatype",
            Self::Precision => "precision",
            Self::Width => "width",
            Self::Ref => "ref",
            Self::Name => "name",
            Self::Ucd => "ucd",
            Self::Utype => "utype",
            Self::Arraysize => "arraysize",
            Self::Value => "value",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.as_str() == token)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_token(s)
            .ok_or_else(|| Error::unknown_symbol("Attribute::from_str", format!("invalid attribute '{s}'")))
    }
}
