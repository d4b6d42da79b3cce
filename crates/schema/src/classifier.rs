use xqbridge_store::Cursor;

use crate::error::ClassificationError;
use crate::lexical::parse_lexical;
use crate::types::BuiltinSimpleType;
use crate::value::AtomicValue;

/// Maps runtime scalars onto the schema type system.
pub trait ValueClassifier: Send + Sync {
    /// Nearest built-in simple type for `value`.
    fn classify(&self, value: &AtomicValue) -> BuiltinSimpleType;

    /// Validates the text held by the fragment under `fragment` against `hint`
    /// and records `hint` as the fragment's type.
    ///
    /// Must run inside the fragment document's locale.
    fn auto_type(&self, fragment: &Cursor, hint: BuiltinSimpleType) -> Result<(), ClassificationError>;
}

/// Classifier over the built-in simple types only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinClassifier;

impl ValueClassifier for BuiltinClassifier {
    fn classify(&self, value: &AtomicValue) -> BuiltinSimpleType {
        match value {
            AtomicValue::Boolean(_) => BuiltinSimpleType::Boolean,
            AtomicValue::Byte(_) => BuiltinSimpleType::Byte,
            AtomicValue::Short(_) => BuiltinSimpleType::Short,
            AtomicValue::Int(_) => BuiltinSimpleType::Int,
            AtomicValue::Long(_) => BuiltinSimpleType::Long,
            AtomicValue::Integer(_) => BuiltinSimpleType::Integer,
            AtomicValue::Decimal(_) => BuiltinSimpleType::Decimal,
            AtomicValue::Float(_) => BuiltinSimpleType::Float,
            AtomicValue::Double(_) => BuiltinSimpleType::Double,
            AtomicValue::String(_) => BuiltinSimpleType::String,
            AtomicValue::AnyUri(_) => BuiltinSimpleType::AnyUri,
            AtomicValue::QName(_) => BuiltinSimpleType::QName,
            AtomicValue::Base64Binary(_) => BuiltinSimpleType::Base64Binary,
            AtomicValue::HexBinary(_) => BuiltinSimpleType::HexBinary,
            AtomicValue::Duration(_) => BuiltinSimpleType::Duration,
            AtomicValue::DateTime { .. } => BuiltinSimpleType::DateTime,
            AtomicValue::Date { .. } => BuiltinSimpleType::Date,
            AtomicValue::Time { .. } => BuiltinSimpleType::Time,
            AtomicValue::GYear { .. } => BuiltinSimpleType::GYear,
            AtomicValue::GYearMonth { .. } => BuiltinSimpleType::GYearMonth,
            AtomicValue::GMonthDay { .. } => BuiltinSimpleType::GMonthDay,
            AtomicValue::GDay { .. } => BuiltinSimpleType::GDay,
            AtomicValue::GMonth { .. } => BuiltinSimpleType::GMonth,
            AtomicValue::UntypedAtomic(_) => BuiltinSimpleType::AnySimpleType,
        }
    }

    fn auto_type(&self, fragment: &Cursor, hint: BuiltinSimpleType) -> Result<(), ClassificationError> {
        let locale = fragment.document().locale();
        if !locale.is_entered() {
            return Err(ClassificationError::LocaleNotEntered { locale: locale.name().to_owned() });
        }
        let lexical = fragment.text();
        parse_lexical(hint, &lexical)
            .map_err(|source| ClassificationError::InvalidLexical { ty: hint, lexical: lexical.clone(), source })?;
        fragment.set_type_annotation(hint.qname())?;
        tracing::trace!(ty = %hint, %lexical, "auto-typed fragment");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use xqbridge_store::Store;

    fn fragment_with(text: &str) -> (xqbridge_store::Document, Cursor) {
        let store = Store::new();
        let fragment = store.new_document().new_empty_fragment();
        let cursor = fragment.new_temp_cursor();
        cursor.set_text(text).unwrap();
        (fragment, cursor)
    }

    #[rstest]
    #[case(AtomicValue::Long(1), BuiltinSimpleType::Long)]
    #[case(AtomicValue::UntypedAtomic("x".into()), BuiltinSimpleType::AnySimpleType)]
    #[case(AtomicValue::GMonth { month: 1, tz: None }, BuiltinSimpleType::GMonth)]
    fn classifies_by_value_kind(#[case] value: AtomicValue, #[case] expected: BuiltinSimpleType) {
        assert_eq!(BuiltinClassifier.classify(&value), expected);
    }

    #[rstest]
    fn annotates_valid_fragment() {
        let (fragment, cursor) = fragment_with("2004-09-12");
        let _guard = fragment.locale().enter();
        BuiltinClassifier.auto_type(&cursor, BuiltinSimpleType::Date).unwrap();
        assert_eq!(cursor.type_annotation(), Some(BuiltinSimpleType::Date.qname()));
    }

    #[rstest]
    fn rejects_text_outside_lexical_space() {
        let (fragment, cursor) = fragment_with("twelve");
        let _guard = fragment.locale().enter();
        let err = BuiltinClassifier.auto_type(&cursor, BuiltinSimpleType::Int).unwrap_err();
        assert!(matches!(err, ClassificationError::InvalidLexical { ty: BuiltinSimpleType::Int, .. }));
        assert_eq!(cursor.type_annotation(), None);
    }

    #[rstest]
    fn requires_entered_locale() {
        let (_fragment, cursor) = fragment_with("1");
        let err = BuiltinClassifier.auto_type(&cursor, BuiltinSimpleType::Int).unwrap_err();
        assert!(matches!(err, ClassificationError::LocaleNotEntered { .. }));
    }
}
