use core::fmt;
use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use xqbridge_schema::AtomicValue;

pub type XdmSequence<N> = Vec<XdmItem<N>>;

/// One item of an evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub enum XdmItem<N> {
    Node(N),
    Atomic(AtomicValue),
}

impl<N> XdmItem<N> {
    pub fn as_node(&self) -> Option<&N> {
        match self {
            XdmItem::Node(n) => Some(n),
            XdmItem::Atomic(_) => None,
        }
    }

    pub fn as_atomic(&self) -> Option<&AtomicValue> {
        match self {
            XdmItem::Atomic(a) => Some(a),
            XdmItem::Node(_) => None,
        }
    }
}

impl<N> From<AtomicValue> for XdmItem<N> {
    fn from(value: AtomicValue) -> Self {
        XdmItem::Atomic(value)
    }
}

/// Value bound to an external variable.
#[derive(Clone)]
pub enum XdmValue<N> {
    Atomic(AtomicValue),
    /// Reference to an existing node. Never a copy.
    Node(N),
    /// Ordered string-keyed map.
    Map(IndexMap<String, XdmValue<N>>),
    /// Host object the engine may pass through but cannot inspect.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl<N> XdmValue<N> {
    pub fn as_node(&self) -> Option<&N> {
        match self {
            XdmValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_atomic(&self) -> Option<&AtomicValue> {
        match self {
            XdmValue::Atomic(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, XdmValue<N>>> {
        match self {
            XdmValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The value as a result sequence. Maps and opaque values have no item form.
    pub fn to_sequence(&self) -> Option<XdmSequence<N>>
    where
        N: Clone,
    {
        match self {
            XdmValue::Atomic(a) => Some(vec![XdmItem::Atomic(a.clone())]),
            XdmValue::Node(n) => Some(vec![XdmItem::Node(n.clone())]),
            XdmValue::Map(_) | XdmValue::Opaque(_) => None,
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for XdmValue<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdmValue::Atomic(a) => f.debug_tuple("Atomic").field(a).finish(),
            XdmValue::Node(n) => f.debug_tuple("Node").field(n).finish(),
            XdmValue::Map(m) => f.debug_tuple("Map").field(m).finish(),
            XdmValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}
