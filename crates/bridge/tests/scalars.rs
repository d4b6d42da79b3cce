use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rstest::rstest;
use xqbridge::{
    BindError, BridgeError, BridgeOptions, CalendarShape, CalendarValue, DurationValue, ExecError, GenericDuration,
    MaterializationError, QueryBridge, VariableBindings, VariableValue,
};
use xqbridge_engine_mock::{ScriptedEngine, scripts};
use xqbridge_schema::{
    AtomicValue, BuiltinClassifier, BuiltinSimpleType, ClassificationError, Decimal, ValueClassifier, parse_lexical,
};
use xqbridge_store::{Cursor, Document, NodeKind, QName, Store};

fn single(value: AtomicValue) -> Cursor {
    let doc = Store::new().parse_document("<r/>").unwrap();
    let bridge = QueryBridge::new(ScriptedEngine::new().with_script("value()", scripts::atomics(vec![value])));
    let selection = bridge.select(&doc.new_cursor(), "value()", &VariableBindings::new()).unwrap();
    assert_eq!(selection.len(), 1);
    selection.get(0).unwrap().duplicate()
}

#[rstest]
#[case(AtomicValue::Int(42), BuiltinSimpleType::Int, "42")]
#[case(AtomicValue::Decimal(Decimal::from_str("12.34").unwrap()), BuiltinSimpleType::Decimal, "12.34")]
#[case(AtomicValue::Boolean(true), BuiltinSimpleType::Boolean, "true")]
#[case(AtomicValue::from(NaiveDate::from_ymd_opt(2004, 9, 12).unwrap()), BuiltinSimpleType::Date, "2004-09-12")]
#[case(AtomicValue::Long(-9_000_000_000), BuiltinSimpleType::Long, "-9000000000")]
#[case(AtomicValue::Double(2.5), BuiltinSimpleType::Double, "2.5")]
#[case(AtomicValue::Float(0.1), BuiltinSimpleType::Float, "0.1")]
#[case(AtomicValue::Double(1e300), BuiltinSimpleType::Double, "1.0E300")]
#[case(AtomicValue::Double(-4.2e-9), BuiltinSimpleType::Double, "-4.2E-9")]
#[case(AtomicValue::Decimal(Decimal::new(12_340, 3)), BuiltinSimpleType::Decimal, "12.340")]
#[case(AtomicValue::HexBinary(vec![0xca, 0xfe]), BuiltinSimpleType::HexBinary, "CAFE")]
fn scalar_round_trip(#[case] value: AtomicValue, #[case] ty: BuiltinSimpleType, #[case] lexical: &str) {
    let cursor = single(value.clone());
    assert_eq!(cursor.node_kind(), NodeKind::Text);
    assert_eq!(cursor.text(), lexical);
    assert_eq!(cursor.type_annotation(), Some(ty.qname()));

    let reparsed = parse_lexical(ty, &cursor.text()).unwrap();
    assert_eq!(reparsed, value);
    assert_eq!(reparsed.lexical(), lexical);
}

#[rstest]
fn namespaced_qname_result_needs_a_prefix() {
    let doc = Store::new().parse_document("<r/>").unwrap();
    let values = vec![
        AtomicValue::QName(QName::new("urn:p", "a").with_prefix("p")),
        AtomicValue::QName(QName::new("urn:p", "b")),
    ];
    let bridge = QueryBridge::new(ScriptedEngine::new().with_script("names()", scripts::atomics(values)));
    let compiled = bridge.compile_path("names()").unwrap();
    let mut execution = bridge.execute(&compiled, &doc.new_cursor(), &VariableBindings::new()).unwrap();

    let mut selection = xqbridge_store::Selection::new();
    let err = execution.materialize_into(&mut selection).unwrap_err();
    assert!(matches!(
        err,
        ExecError::Materialization { index: 1, source: MaterializationError::UnprefixedQName { .. } }
    ));
    assert_eq!(selection.texts(), ["p:a"]);
}

#[rstest]
fn scalars_do_not_touch_the_context_document() {
    let doc = Store::new().parse_document("<r/>").unwrap();
    let before = doc.current_version();
    let bridge = QueryBridge::new(ScriptedEngine::new().with_script("1", scripts::atomics(vec![AtomicValue::Int(1)])));
    let selection = bridge.select(&doc.new_cursor(), "1", &VariableBindings::new()).unwrap();
    assert_eq!(doc.current_version(), before);
    assert!(selection.get(0).unwrap().document().same_store(&doc));
}

#[rstest]
fn engine_built_nodes_become_untyped_values() {
    let doc = Store::new().parse_document("<r/>").unwrap();
    let bridge = QueryBridge::new(ScriptedEngine::new().with_script("made()", scripts::synthetic("made", "42")));
    let selection = bridge.select(&doc.new_cursor(), "made()", &VariableBindings::new()).unwrap();
    let cursor = selection.get(0).unwrap();
    assert_eq!(cursor.text(), "42");
    assert_eq!(cursor.type_annotation(), Some(BuiltinSimpleType::AnySimpleType.qname()));
}

#[rstest]
fn wrapped_nodes_resolve_to_store_nodes() {
    let doc = Store::new().parse_document("<r><a/><a/></r>").unwrap();
    let bridge =
        QueryBridge::new(ScriptedEngine::new().with_script("//a", scripts::layered(scripts::descendants_named("a"), 4)));
    let selection = bridge.select(&doc.new_cursor(), "//a", &VariableBindings::new()).unwrap();
    assert_eq!(selection.len(), 2);
    for cursor in &selection {
        assert!(cursor.document().ptr_eq(&doc));
        assert_eq!(cursor.node_kind(), NodeKind::Element);
    }
}

#[derive(Debug)]
struct AlwaysInt;

impl ValueClassifier for AlwaysInt {
    fn classify(&self, _: &AtomicValue) -> BuiltinSimpleType {
        BuiltinSimpleType::Int
    }

    fn auto_type(&self, fragment: &Cursor, hint: BuiltinSimpleType) -> Result<(), ClassificationError> {
        BuiltinClassifier.auto_type(fragment, hint)
    }
}

#[rstest]
fn failed_typing_leaves_locale_and_keeps_earlier_results() {
    let doc: Document = Store::new().parse_document("<r/>").unwrap();
    let engine = ScriptedEngine::new()
        .with_script("mixed()", scripts::atomics(vec![AtomicValue::Int(7), AtomicValue::from("seven")]));
    let bridge = QueryBridge::with_options(engine, BridgeOptions::new().with_classifier(Arc::new(AlwaysInt)));
    let compiled = bridge.compile_path("mixed()").unwrap();
    let mut execution = bridge.execute(&compiled, &doc.new_cursor(), &VariableBindings::new()).unwrap();

    let mut selection = xqbridge_store::Selection::new();
    let err = execution.materialize_into(&mut selection).unwrap_err();
    assert!(matches!(
        err,
        ExecError::Materialization { index: 1, source: MaterializationError::Classification(_) }
    ));
    assert_eq!(selection.texts(), ["7"]);
    assert_eq!(doc.locale().depth(), 0);
}

fn echo(name: &str, value: VariableValue) -> Result<Cursor, BridgeError> {
    let doc = Store::new().parse_document("<r/>").unwrap();
    let body = format!("${name}");
    let engine = ScriptedEngine::new().with_script(body.as_str(), scripts::variable(name));
    let bridge = QueryBridge::with_options(engine, BridgeOptions::new().with_external_variable(name));
    let selection = bridge.select(&doc.new_cursor(), &body, &VariableBindings::new().with(name, value))?;
    Ok(selection.get(0).unwrap().duplicate())
}

#[rstest]
fn generic_duration_drops_sub_second_precision() {
    let generic =
        GenericDuration { minutes: 1, seconds: 30, fraction: Decimal::from_str("0.75").unwrap(), ..Default::default() };
    let cursor = echo("d", VariableValue::Duration(DurationValue::Generic(generic))).unwrap();
    assert_eq!(cursor.text(), "PT1M30S");
    assert_eq!(cursor.type_annotation(), Some(BuiltinSimpleType::Duration.qname()));
}

#[rstest]
fn month_value_loses_trailing_dashes() {
    let cursor = echo("m", VariableValue::Calendar(CalendarValue::new(CalendarShape::GMonth, "--05--"))).unwrap();
    assert_eq!(cursor.text(), "--05");
    assert_eq!(cursor.type_annotation(), Some(BuiltinSimpleType::GMonth.qname()));
}

#[rstest]
fn malformed_calendar_value_fails_binding() {
    let err = echo("t", VariableValue::Calendar(CalendarValue::new(CalendarShape::Time, "25:99"))).unwrap_err();
    assert!(matches!(err, BridgeError::Bind(BindError::MalformedValue { .. })));
}

#[rstest]
fn node_variable_from_another_store_fails_binding() {
    let foreign = Store::new().parse_document("<x/>").unwrap();
    let err = echo("n", VariableValue::from(&foreign.new_cursor())).unwrap_err();
    assert!(matches!(err, BridgeError::Bind(BindError::ForeignStore { .. })));
}

#[rstest]
fn node_variable_binds_the_node_itself() {
    let doc = Store::new().parse_document("<r><a>x</a></r>").unwrap();
    let mut target = doc.new_cursor();
    target.to_child("r");
    target.to_child("a");
    let engine = ScriptedEngine::new().with_script("$n", scripts::variable("n"));
    let bridge = QueryBridge::with_options(engine, BridgeOptions::new().with_external_variable("n"));
    let selection = bridge.select(&doc.new_cursor(), "$n", &VariableBindings::new().with("n", &target)).unwrap();
    assert!(selection.get(0).unwrap().is_at_same_position(&target));
}
