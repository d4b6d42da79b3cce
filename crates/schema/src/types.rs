use core::fmt;

use xqbridge_store::QName;

pub const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
pub const XS_PREFIX: &str = "xs";

/// Built-in simple types a runtime scalar can be classified as.
///
/// Only the built-ins a bridge ever produces are listed; anything else is
/// reported as [`BuiltinSimpleType::AnySimpleType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinSimpleType {
    AnySimpleType,
    String,
    Boolean,
    Decimal,
    Integer,
    Long,
    Int,
    Short,
    Byte,
    Float,
    Double,
    Duration,
    DateTime,
    Date,
    Time,
    GYear,
    GYearMonth,
    GMonthDay,
    GDay,
    GMonth,
    AnyUri,
    QName,
    Base64Binary,
    HexBinary,
}

impl BuiltinSimpleType {
    pub const ALL: [BuiltinSimpleType; 24] = [
        Self::AnySimpleType,
        Self::String,
        Self::Boolean,
        Self::Decimal,
        Self::Integer,
        Self::Long,
        Self::Int,
        Self::Short,
        Self::Byte,
        Self::Float,
        Self::Double,
        Self::Duration,
        Self::DateTime,
        Self::Date,
        Self::Time,
        Self::GYear,
        Self::GYearMonth,
        Self::GMonthDay,
        Self::GDay,
        Self::GMonth,
        Self::AnyUri,
        Self::QName,
        Self::Base64Binary,
        Self::HexBinary,
    ];

    /// Local part of the type name in the XML Schema namespace.
    pub fn local_name(self) -> &'static str {
        match self {
            Self::AnySimpleType => "anySimpleType",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Int => "int",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::Float => "float",
            Self::Double => "double",
            Self::Duration => "duration",
            Self::DateTime => "dateTime",
            Self::Date => "date",
            Self::Time => "time",
            Self::GYear => "gYear",
            Self::GYearMonth => "gYearMonth",
            Self::GMonthDay => "gMonthDay",
            Self::GDay => "gDay",
            Self::GMonth => "gMonth",
            Self::AnyUri => "anyURI",
            Self::QName => "QName",
            Self::Base64Binary => "base64Binary",
            Self::HexBinary => "hexBinary",
        }
    }

    pub fn qname(self) -> QName {
        QName::new(XS_NAMESPACE, self.local_name()).with_prefix(XS_PREFIX)
    }

    pub fn from_qname(name: &QName) -> Option<Self> {
        if name.ns_uri.as_deref() != Some(XS_NAMESPACE) {
            return None;
        }
        Self::ALL.into_iter().find(|ty| ty.local_name() == name.local)
    }

    /// Integer family, including the fixed-width derivations.
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Integer | Self::Long | Self::Int | Self::Short | Self::Byte)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, Self::Decimal | Self::Float | Self::Double)
    }

    pub fn is_calendar(self) -> bool {
        matches!(
            self,
            Self::DateTime
                | Self::Date
                | Self::Time
                | Self::GYear
                | Self::GYearMonth
                | Self::GMonthDay
                | Self::GDay
                | Self::GMonth
        )
    }

    /// Types whose lexical space keeps whitespace as written.
    pub fn preserves_whitespace(self) -> bool {
        matches!(self, Self::String | Self::AnySimpleType)
    }
}

impl fmt::Display for BuiltinSimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{XS_PREFIX}:{}", self.local_name())
    }
}
