use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use num_bigint::BigInt;
use rust_decimal::Decimal;
use std::str::FromStr;
use xqbridge_store::QName;

use crate::error::LexicalError;
use crate::temporal;
use crate::types::BuiltinSimpleType;
use crate::value::AtomicValue;

/// Parses `text` as a value of `ty`.
///
/// Types other than `xs:string` and `xs:anySimpleType` collapse surrounding
/// whitespace first, as their facets require.
pub fn parse_lexical(ty: BuiltinSimpleType, text: &str) -> Result<AtomicValue, LexicalError> {
    let s = if ty.preserves_whitespace() { text } else { text.trim() };
    let value = match ty {
        BuiltinSimpleType::AnySimpleType => AtomicValue::UntypedAtomic(s.to_owned()),
        BuiltinSimpleType::String => AtomicValue::String(s.to_owned()),
        BuiltinSimpleType::Boolean => AtomicValue::Boolean(parse_boolean(s)?),
        BuiltinSimpleType::Decimal => AtomicValue::Decimal(parse_decimal(s)?),
        BuiltinSimpleType::Integer => AtomicValue::Integer(parse_integer(s)?),
        BuiltinSimpleType::Long => AtomicValue::Long(parse_fixed(s, "long")?),
        BuiltinSimpleType::Int => AtomicValue::Int(parse_fixed(s, "int")?),
        BuiltinSimpleType::Short => AtomicValue::Short(parse_fixed(s, "short")?),
        BuiltinSimpleType::Byte => AtomicValue::Byte(parse_fixed(s, "byte")?),
        BuiltinSimpleType::Float => AtomicValue::Float(parse_floating(s)?),
        BuiltinSimpleType::Double => AtomicValue::Double(parse_floating(s)?),
        BuiltinSimpleType::Duration => AtomicValue::Duration(temporal::parse_duration(s)?),
        BuiltinSimpleType::DateTime => {
            let (value, tz) = temporal::parse_date_time(s)?;
            AtomicValue::DateTime { value, tz }
        }
        BuiltinSimpleType::Date => {
            let (date, tz) = temporal::parse_date(s)?;
            AtomicValue::Date { date, tz }
        }
        BuiltinSimpleType::Time => {
            let (time, tz) = temporal::parse_time(s)?;
            AtomicValue::Time { time, tz }
        }
        BuiltinSimpleType::GYear => {
            let (year, tz) = temporal::parse_g_year(s)?;
            AtomicValue::GYear { year, tz }
        }
        BuiltinSimpleType::GYearMonth => {
            let (year, month, tz) = temporal::parse_g_year_month(s)?;
            AtomicValue::GYearMonth { year, month, tz }
        }
        BuiltinSimpleType::GMonthDay => {
            let (month, day, tz) = temporal::parse_g_month_day(s)?;
            AtomicValue::GMonthDay { month, day, tz }
        }
        BuiltinSimpleType::GDay => {
            let (day, tz) = temporal::parse_g_day(s)?;
            AtomicValue::GDay { day, tz }
        }
        BuiltinSimpleType::GMonth => {
            let (month, tz) = temporal::parse_g_month(s)?;
            AtomicValue::GMonth { month, tz }
        }
        BuiltinSimpleType::AnyUri => AtomicValue::AnyUri(s.to_owned()),
        BuiltinSimpleType::QName => AtomicValue::QName(parse_qname(s)?),
        BuiltinSimpleType::Base64Binary => AtomicValue::Base64Binary(
            BASE64.decode(s).map_err(|err| LexicalError::new(format!("invalid base64Binary: {err}")))?,
        ),
        BuiltinSimpleType::HexBinary => AtomicValue::HexBinary(parse_hex(s)?),
    };
    Ok(value)
}

fn parse_boolean(s: &str) -> Result<bool, LexicalError> {
    match s {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(LexicalError::new(format!("invalid boolean '{s}'"))),
    }
}

/// Optional sign, digits, optional fraction. No exponent.
fn is_decimal_lexical(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    (!int.is_empty() || !frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

fn parse_decimal(s: &str) -> Result<Decimal, LexicalError> {
    let invalid = || LexicalError::new(format!("invalid decimal '{s}'"));
    if !is_decimal_lexical(s) {
        return Err(invalid());
    }
    Decimal::from_str(s.strip_prefix('+').unwrap_or(s)).map_err(|_| invalid())
}

fn is_integer_lexical(s: &str) -> bool {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit())
}

fn parse_integer(s: &str) -> Result<BigInt, LexicalError> {
    let invalid = || LexicalError::new(format!("invalid integer '{s}'"));
    if !is_integer_lexical(s) {
        return Err(invalid());
    }
    BigInt::from_str(s.strip_prefix('+').unwrap_or(s)).map_err(|_| invalid())
}

fn parse_fixed<T: FromStr>(s: &str, name: &str) -> Result<T, LexicalError> {
    let invalid = || LexicalError::new(format!("invalid {name} '{s}'"));
    if !is_integer_lexical(s) {
        return Err(invalid());
    }
    s.strip_prefix('+').unwrap_or(s).parse().map_err(|_| invalid())
}

fn parse_floating<T: core::str::FromStr>(s: &str) -> Result<T, LexicalError> {
    let invalid = || LexicalError::new(format!("invalid floating-point value '{s}'"));
    let text = match s {
        "INF" | "+INF" => "inf",
        "-INF" => "-inf",
        "NaN" => "NaN",
        _ => {
            let (mantissa, exponent) = match s.find(['e', 'E']) {
                Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
                None => (s, None),
            };
            if !is_decimal_lexical(mantissa) || exponent.is_some_and(|e| !is_integer_lexical(e)) {
                return Err(invalid());
            }
            s
        }
    };
    text.parse().map_err(|_| invalid())
}

fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_alphabetic()) && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn parse_qname(s: &str) -> Result<QName, LexicalError> {
    let invalid = || LexicalError::new(format!("invalid QName '{s}'"));
    match s.split_once(':') {
        Some((prefix, local)) if is_ncname(prefix) && is_ncname(local) => {
            Ok(QName::local(local).with_prefix(prefix))
        }
        None if is_ncname(s) => Ok(QName::local(s)),
        _ => Err(invalid()),
    }
}

fn parse_hex(s: &str) -> Result<Vec<u8>, LexicalError> {
    let invalid = || LexicalError::new(format!("invalid hexBinary '{s}'"));
    if s.len() % 2 != 0 || !s.is_ascii() {
        return Err(invalid());
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| invalid())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BuiltinSimpleType::Boolean, "true", AtomicValue::Boolean(true))]
    #[case(BuiltinSimpleType::Boolean, " 0 ", AtomicValue::Boolean(false))]
    #[case(BuiltinSimpleType::Int, "+42", AtomicValue::Int(42))]
    #[case(BuiltinSimpleType::Byte, "-128", AtomicValue::Byte(-128))]
    #[case(BuiltinSimpleType::Decimal, "12.34", AtomicValue::Decimal(Decimal::from_str("12.34").unwrap()))]
    #[case(BuiltinSimpleType::Double, "-INF", AtomicValue::Double(f64::NEG_INFINITY))]
    #[case(BuiltinSimpleType::Double, "1.5e3", AtomicValue::Double(1500.0))]
    #[case(BuiltinSimpleType::Double, "1.0E300", AtomicValue::Double(1e300))]
    #[case(BuiltinSimpleType::Float, "0.1", AtomicValue::Float(0.1))]
    #[case(BuiltinSimpleType::Float, "+INF", AtomicValue::Float(f32::INFINITY))]
    #[case(BuiltinSimpleType::HexBinary, "0fA0", AtomicValue::HexBinary(vec![0x0f, 0xa0]))]
    #[case(BuiltinSimpleType::String, " padded ", AtomicValue::String(" padded ".to_owned()))]
    fn accepts_lexical_forms(#[case] ty: BuiltinSimpleType, #[case] text: &str, #[case] expected: AtomicValue) {
        assert_eq!(parse_lexical(ty, text).unwrap(), expected);
    }

    #[rstest]
    #[case(BuiltinSimpleType::Boolean, "yes")]
    #[case(BuiltinSimpleType::Byte, "128")]
    #[case(BuiltinSimpleType::Integer, "1.0")]
    #[case(BuiltinSimpleType::Decimal, "1e5")]
    #[case(BuiltinSimpleType::Double, "inf")]
    #[case(BuiltinSimpleType::Double, "infinity")]
    #[case(BuiltinSimpleType::Date, "2004-9-12x")]
    #[case(BuiltinSimpleType::QName, "a:b:c")]
    #[case(BuiltinSimpleType::HexBinary, "abc")]
    fn rejects_invalid_lexical_forms(#[case] ty: BuiltinSimpleType, #[case] text: &str) {
        assert!(parse_lexical(ty, text).is_err());
    }

    #[rstest]
    fn big_integers_keep_every_digit() {
        let text = "-98765432109876543210987654321";
        assert_eq!(parse_lexical(BuiltinSimpleType::Integer, text).unwrap().lexical(), text);
    }

    #[rstest]
    fn qname_keeps_prefix() {
        let AtomicValue::QName(name) = parse_lexical(BuiltinSimpleType::QName, "xs:date").unwrap() else {
            panic!("expected a QName");
        };
        assert_eq!(name.prefix.as_deref(), Some("xs"));
        assert_eq!(name.local, "date");
    }
}
