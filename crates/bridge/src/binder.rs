use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use url::Url;
use xqbridge_engine::{DynamicContext, QueryEngine, StoreNode, XdmValue};
use xqbridge_schema::{AtomicValue, BigInt, BuiltinSimpleType, Decimal, Duration, parse_lexical};
use xqbridge_store::{Cursor, Document, QName};

use crate::error::BindError;

/// Duration as a host supplies it.
#[derive(Debug, Clone, PartialEq)]
pub enum DurationValue {
    /// Already in schema form; bound as is.
    Native(Duration),
    /// Field-wise duration with a separate sub-second part.
    Generic(GenericDuration),
}

/// Duration given field by field, as calendar libraries usually expose one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericDuration {
    pub negative: bool,
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    /// Sub-second part in `[0, 1)`. Not carried over when bound.
    pub fraction: Decimal,
}

impl GenericDuration {
    fn to_duration(&self) -> Duration {
        Duration {
            negative: self.negative,
            years: self.years,
            months: self.months,
            days: self.days,
            hours: self.hours,
            minutes: self.minutes,
            seconds: Decimal::from(self.seconds),
        }
    }
}

/// Which calendar type a [`CalendarValue`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarShape {
    DateTime,
    Date,
    Time,
    GYear,
    GYearMonth,
    GMonthDay,
    GDay,
    GMonth,
}

impl CalendarShape {
    pub fn simple_type(self) -> BuiltinSimpleType {
        match self {
            CalendarShape::DateTime => BuiltinSimpleType::DateTime,
            CalendarShape::Date => BuiltinSimpleType::Date,
            CalendarShape::Time => BuiltinSimpleType::Time,
            CalendarShape::GYear => BuiltinSimpleType::GYear,
            CalendarShape::GYearMonth => BuiltinSimpleType::GYearMonth,
            CalendarShape::GMonthDay => BuiltinSimpleType::GMonthDay,
            CalendarShape::GDay => BuiltinSimpleType::GDay,
            CalendarShape::GMonth => BuiltinSimpleType::GMonth,
        }
    }
}

/// Calendar moment in lexical form, tagged with its shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarValue {
    pub shape: CalendarShape,
    pub lexical: String,
}

impl CalendarValue {
    pub fn new(shape: CalendarShape, lexical: impl Into<String>) -> Self {
        Self { shape, lexical: lexical.into() }
    }

    /// Lexical text with the `--MM--` form of a month reduced to `--MM`.
    fn normalized_lexical(&self) -> String {
        let mut text = self.lexical.trim().to_owned();
        if self.shape == CalendarShape::GMonth && text.starts_with("--") && text.get(4..6) == Some("--") {
            text.replace_range(4..6, "");
        }
        text
    }
}

/// External variable value supplied by the host.
#[derive(Debug, Clone)]
pub enum VariableValue {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    BigInteger(BigInt),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    Text(String),
    Duration(DurationValue),
    Calendar(CalendarValue),
    QName(QName),
    Uri(Url),
    Map(IndexMap<String, VariableValue>),
    /// Reference to a node of the execution's store.
    Node(Cursor),
    /// Anything else; handed to the engine untouched.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Boolean(value)
    }
}

impl From<i32> for VariableValue {
    fn from(value: i32) -> Self {
        VariableValue::Int(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Long(value)
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Double(value)
    }
}

impl From<Decimal> for VariableValue {
    fn from(value: Decimal) -> Self {
        VariableValue::Decimal(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Text(value.to_owned())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::Text(value)
    }
}

impl From<&Cursor> for VariableValue {
    fn from(value: &Cursor) -> Self {
        VariableValue::Node(value.duplicate())
    }
}

/// Ordered external variable bindings for one execution.
#[derive(Debug, Clone, Default)]
pub struct VariableBindings(IndexMap<String, VariableValue>);

impl VariableBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<VariableValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, VariableValue> {
        self.0.iter()
    }
}

impl FromIterator<(String, VariableValue)> for VariableBindings {
    fn from_iter<T: IntoIterator<Item = (String, VariableValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Converts every binding and hands it to the engine.
pub fn bind_variables<E: QueryEngine>(
    engine: &E,
    ctx: &mut DynamicContext<E::Node>,
    target: &Document,
    bindings: &VariableBindings,
) -> Result<(), BindError> {
    for (name, value) in bindings.iter() {
        let value = coerce::<E>(name, value, target)?;
        engine
            .bind_variable(ctx, name, value)
            .map_err(|source| BindError::Engine { name: name.clone(), source })?;
    }
    if !bindings.is_empty() {
        tracing::debug!(count = bindings.len(), "bound external variables");
    }
    Ok(())
}

fn coerce<E: QueryEngine>(name: &str, value: &VariableValue, target: &Document) -> Result<XdmValue<E::Node>, BindError> {
    let atomic = match value {
        VariableValue::Boolean(b) => AtomicValue::Boolean(*b),
        VariableValue::Byte(v) => AtomicValue::Byte(*v),
        VariableValue::Short(v) => AtomicValue::Short(*v),
        VariableValue::Int(v) => AtomicValue::Int(*v),
        VariableValue::Long(v) => AtomicValue::Long(*v),
        VariableValue::BigInteger(v) => AtomicValue::Integer(v.clone()),
        VariableValue::Decimal(v) => AtomicValue::Decimal(*v),
        VariableValue::Float(v) => AtomicValue::Float(*v),
        VariableValue::Double(v) => AtomicValue::Double(*v),
        VariableValue::Bytes(bytes) => AtomicValue::Base64Binary(bytes.clone()),
        VariableValue::Text(text) => AtomicValue::String(text.clone()),
        VariableValue::Duration(DurationValue::Native(d)) => AtomicValue::Duration(d.clone()),
        VariableValue::Duration(DurationValue::Generic(d)) => AtomicValue::Duration(d.to_duration()),
        VariableValue::Calendar(calendar) => {
            parse_lexical(calendar.shape.simple_type(), &calendar.normalized_lexical()).map_err(|source| {
                BindError::MalformedValue { name: name.to_owned(), kind: calendar.shape.simple_type().local_name(), source }
            })?
        }
        VariableValue::QName(qname) => AtomicValue::QName(qname.clone()),
        VariableValue::Uri(url) => AtomicValue::AnyUri(url.as_str().to_owned()),
        VariableValue::Map(entries) => {
            let mut map = IndexMap::with_capacity(entries.len());
            for (key, entry) in entries {
                map.insert(key.clone(), coerce::<E>(&format!("{name}.{key}"), entry, target)?);
            }
            return Ok(XdmValue::Map(map));
        }
        VariableValue::Node(cursor) => {
            if !cursor.document().same_store(target) {
                return Err(BindError::ForeignStore { name: name.to_owned() });
            }
            if !cursor.is_attached() {
                return Err(BindError::DetachedNode { name: name.to_owned() });
            }
            return Ok(XdmValue::Node(E::Node::from(StoreNode::from_cursor(cursor))));
        }
        VariableValue::Opaque(object) => return Ok(XdmValue::Opaque(Arc::clone(object))),
    };
    Ok(XdmValue::Atomic(atomic))
}
