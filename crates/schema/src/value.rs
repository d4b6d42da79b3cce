use core::fmt;
use core::num::FpCategory;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use xqbridge_store::QName;

use crate::temporal::format_timezone;

/// `xs:duration` split into its components. Seconds keep sub-second digits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Duration {
    pub negative: bool,
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: Decimal,
}

impl Duration {
    pub fn is_zero(&self) -> bool {
        self.years == 0
            && self.months == 0
            && self.days == 0
            && self.hours == 0
            && self.minutes == 0
            && self.seconds.is_zero()
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("PT0S");
        }
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str("P")?;
        if self.years != 0 {
            write!(f, "{}Y", self.years)?;
        }
        if self.months != 0 {
            write!(f, "{}M", self.months)?;
        }
        if self.days != 0 {
            write!(f, "{}D", self.days)?;
        }
        if self.hours != 0 || self.minutes != 0 || !self.seconds.is_zero() {
            f.write_str("T")?;
            if self.hours != 0 {
                write!(f, "{}H", self.hours)?;
            }
            if self.minutes != 0 {
                write!(f, "{}M", self.minutes)?;
            }
            if !self.seconds.is_zero() {
                write!(f, "{}S", self.seconds.normalize())?;
            }
        }
        Ok(())
    }
}

/// Runtime scalar value as produced by an engine or parsed from lexical text.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicValue {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Integer(BigInt),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
    String(String),
    UntypedAtomic(String),
    AnyUri(String),
    QName(QName),
    Base64Binary(Vec<u8>),
    HexBinary(Vec<u8>),
    Duration(Duration),
    DateTime {
        value: NaiveDateTime,
        tz: Option<FixedOffset>,
    },
    Date {
        date: NaiveDate,
        tz: Option<FixedOffset>,
    },
    Time {
        time: NaiveTime,
        tz: Option<FixedOffset>,
    },
    GYear {
        year: i32,
        tz: Option<FixedOffset>,
    },
    GYearMonth {
        year: i32,
        month: u8,
        tz: Option<FixedOffset>,
    },
    GMonthDay {
        month: u8,
        day: u8,
        tz: Option<FixedOffset>,
    },
    GDay {
        day: u8,
        tz: Option<FixedOffset>,
    },
    GMonth {
        month: u8,
        tz: Option<FixedOffset>,
    },
}

impl AtomicValue {
    /// Lexical form as it would appear in XML text.
    pub fn lexical(&self) -> String {
        self.to_string()
    }
}

/// Shortest digits of `v` at its own width; exponent form outside
/// `1e-6 <= |v| < 1e6`, mantissa always carrying a fraction digit.
fn format_float<T>(v: T, f: &mut fmt::Formatter<'_>) -> fmt::Result
where
    T: Copy + Into<f64> + fmt::Display + fmt::UpperExp,
{
    let wide: f64 = v.into();
    if wide.is_nan() {
        return f.write_str("NaN");
    }
    if wide.is_infinite() {
        return f.write_str(if wide > 0.0 { "INF" } else { "-INF" });
    }
    if wide.classify() == FpCategory::Zero || (1e-6..1e6).contains(&wide.abs()) {
        return write!(f, "{v}");
    }
    let scientific = format!("{v:E}");
    match scientific.split_once('E') {
        Some((mantissa, exponent)) if !mantissa.contains('.') => write!(f, "{mantissa}.0E{exponent}"),
        _ => f.write_str(&scientific),
    }
}

fn format_year(year: i32) -> String {
    if year < 0 { format!("-{:04}", -i64::from(year)) } else { format!("{year:04}") }
}

impl fmt::Display for AtomicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicValue::Boolean(b) => write!(f, "{b}"),
            AtomicValue::Byte(v) => write!(f, "{v}"),
            AtomicValue::Short(v) => write!(f, "{v}"),
            AtomicValue::Int(v) => write!(f, "{v}"),
            AtomicValue::Long(v) => write!(f, "{v}"),
            AtomicValue::Integer(v) => write!(f, "{v}"),
            AtomicValue::Decimal(v) => write!(f, "{v}"),
            AtomicValue::Float(v) => format_float(*v, f),
            AtomicValue::Double(v) => format_float(*v, f),
            AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) | AtomicValue::AnyUri(s) => f.write_str(s),
            AtomicValue::QName(name) => f.write_str(&name.qualified()),
            AtomicValue::Base64Binary(bytes) => f.write_str(&BASE64.encode(bytes)),
            AtomicValue::HexBinary(bytes) => bytes.iter().try_for_each(|b| write!(f, "{b:02X}")),
            AtomicValue::Duration(d) => write!(f, "{d}"),
            AtomicValue::DateTime { value, tz } => {
                write!(f, "{}{}", value.format("%Y-%m-%dT%H:%M:%S%.f"), format_timezone(*tz))
            }
            AtomicValue::Date { date, tz } => write!(f, "{}{}", date.format("%Y-%m-%d"), format_timezone(*tz)),
            AtomicValue::Time { time, tz } => write!(f, "{}{}", time.format("%H:%M:%S%.f"), format_timezone(*tz)),
            AtomicValue::GYear { year, tz } => write!(f, "{}{}", format_year(*year), format_timezone(*tz)),
            AtomicValue::GYearMonth { year, month, tz } => {
                write!(f, "{}-{month:02}{}", format_year(*year), format_timezone(*tz))
            }
            AtomicValue::GMonthDay { month, day, tz } => write!(f, "--{month:02}-{day:02}{}", format_timezone(*tz)),
            AtomicValue::GDay { day, tz } => write!(f, "---{day:02}{}", format_timezone(*tz)),
            AtomicValue::GMonth { month, tz } => write!(f, "--{month:02}{}", format_timezone(*tz)),
        }
    }
}

impl From<bool> for AtomicValue {
    fn from(v: bool) -> Self {
        AtomicValue::Boolean(v)
    }
}

impl From<i32> for AtomicValue {
    fn from(v: i32) -> Self {
        AtomicValue::Int(v)
    }
}

impl From<i64> for AtomicValue {
    fn from(v: i64) -> Self {
        AtomicValue::Long(v)
    }
}

impl From<Decimal> for AtomicValue {
    fn from(v: Decimal) -> Self {
        AtomicValue::Decimal(v)
    }
}

impl From<f64> for AtomicValue {
    fn from(v: f64) -> Self {
        AtomicValue::Double(v)
    }
}

impl From<&str> for AtomicValue {
    fn from(v: &str) -> Self {
        AtomicValue::String(v.to_owned())
    }
}

impl From<String> for AtomicValue {
    fn from(v: String) -> Self {
        AtomicValue::String(v)
    }
}

impl From<NaiveDate> for AtomicValue {
    fn from(date: NaiveDate) -> Self {
        AtomicValue::Date { date, tz: None }
    }
}
