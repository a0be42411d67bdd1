//! Parsing of engine type tags.

use crate::error::ConversionError;
use std::fmt;
use std::str::FromStr;

/// Engine data type, parsed from a column's type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    /// DECIMAL(p, s)
    Decimal { precision: u8, scale: u8 },
    /// VARCHAR or VARCHAR(n)
    Varchar { length: Option<u32> },
    /// CHAR(n)
    Char { length: Option<u32> },
    Varbinary,
    Json,
    Date,
    Time { precision: Option<u8>, with_time_zone: bool },
    Timestamp { precision: Option<u8>, with_time_zone: bool },
    IntervalYearToMonth,
    IntervalDayToSecond,
    Uuid,
    IpAddress,
    /// ARRAY(T)
    Array(Box<EngineType>),
    /// MAP(K, V)
    Map(Box<EngineType>, Box<EngineType>),
    /// ROW(name T, ...); field names may be absent
    Row(Vec<(Option<String>, EngineType)>),
    /// Anything this crate does not model; values are kept as raw JSON
    Unknown(String),
}

impl EngineType {
    /// Whether values of this type are carried as JSON numbers or strings
    /// that represent exact integers.
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            EngineType::TinyInt | EngineType::SmallInt | EngineType::Integer | EngineType::BigInt
        )
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, EngineType::Unknown(_))
    }
}

impl FromStr for EngineType {
    type Err = ConversionError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalized = tag.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ConversionError::UnsupportedType {
                type_tag: tag.to_string(),
            });
        }
        parse_type(&normalized, tag)
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineType::Boolean => write!(f, "boolean"),
            EngineType::TinyInt => write!(f, "tinyint"),
            EngineType::SmallInt => write!(f, "smallint"),
            EngineType::Integer => write!(f, "integer"),
            EngineType::BigInt => write!(f, "bigint"),
            EngineType::Real => write!(f, "real"),
            EngineType::Double => write!(f, "double"),
            EngineType::Decimal { precision, scale } => write!(f, "decimal({},{})", precision, scale),
            EngineType::Varchar { length: Some(n) } => write!(f, "varchar({})", n),
            EngineType::Varchar { length: None } => write!(f, "varchar"),
            EngineType::Char { length: Some(n) } => write!(f, "char({})", n),
            EngineType::Char { length: None } => write!(f, "char"),
            EngineType::Varbinary => write!(f, "varbinary"),
            EngineType::Json => write!(f, "json"),
            EngineType::Date => write!(f, "date"),
            EngineType::Time {
                precision,
                with_time_zone,
            } => write_temporal(f, "time", *precision, *with_time_zone),
            EngineType::Timestamp {
                precision,
                with_time_zone,
            } => write_temporal(f, "timestamp", *precision, *with_time_zone),
            EngineType::IntervalYearToMonth => write!(f, "interval year to month"),
            EngineType::IntervalDayToSecond => write!(f, "interval day to second"),
            EngineType::Uuid => write!(f, "uuid"),
            EngineType::IpAddress => write!(f, "ipaddress"),
            EngineType::Array(element) => write!(f, "array({})", element),
            EngineType::Map(key, value) => write!(f, "map({}, {})", key, value),
            EngineType::Row(fields) => {
                write!(f, "row(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match name {
                        Some(name) => write!(f, "{} {}", name, ty)?,
                        None => write!(f, "{}", ty)?,
                    }
                }
                write!(f, ")")
            }
            EngineType::Unknown(tag) => write!(f, "{}", tag),
        }
    }
}

fn write_temporal(
    f: &mut fmt::Formatter<'_>,
    base: &str,
    precision: Option<u8>,
    with_time_zone: bool,
) -> fmt::Result {
    write!(f, "{}", base)?;
    if let Some(p) = precision {
        write!(f, "({})", p)?;
    }
    if with_time_zone {
        write!(f, " with time zone")?;
    }
    Ok(())
}

fn parse_type(tag: &str, original: &str) -> Result<EngineType, ConversionError> {
    let (base, args, suffix) = split_parameters(tag, original)?;

    let ty = match (base, args) {
        ("boolean", None) => EngineType::Boolean,
        ("tinyint", None) => EngineType::TinyInt,
        ("smallint", None) => EngineType::SmallInt,
        ("integer" | "int", None) => EngineType::Integer,
        ("bigint", None) => EngineType::BigInt,
        ("real", None) => EngineType::Real,
        ("double" | "double precision", None) => EngineType::Double,
        ("decimal", args) => {
            let params = numeric_params(args, original)?;
            match params.as_slice() {
                [] => EngineType::Decimal {
                    precision: 38,
                    scale: 0,
                },
                [p] => EngineType::Decimal {
                    precision: narrow(*p, original)?,
                    scale: 0,
                },
                [p, s] => EngineType::Decimal {
                    precision: narrow(*p, original)?,
                    scale: narrow(*s, original)?,
                },
                _ => return Err(unsupported(original)),
            }
        }
        ("varchar", args) => EngineType::Varchar {
            length: single_length(args, original)?,
        },
        ("char", args) => EngineType::Char {
            length: single_length(args, original)?,
        },
        ("varbinary", None) => EngineType::Varbinary,
        ("json", None) => EngineType::Json,
        ("date", None) => EngineType::Date,
        ("time", args) => EngineType::Time {
            precision: temporal_precision(args, original)?,
            with_time_zone: time_zone_suffix(suffix, original)?,
        },
        ("timestamp", args) => EngineType::Timestamp {
            precision: temporal_precision(args, original)?,
            with_time_zone: time_zone_suffix(suffix, original)?,
        },
        ("interval year to month", None) => EngineType::IntervalYearToMonth,
        ("interval day to second", None) => EngineType::IntervalDayToSecond,
        ("uuid", None) => EngineType::Uuid,
        ("ipaddress", None) => EngineType::IpAddress,
        ("array", Some(inner)) => EngineType::Array(Box::new(parse_type(inner.trim(), original)?)),
        ("map", Some(inner)) => match split_top_level(inner).as_slice() {
            [key, value] => EngineType::Map(
                Box::new(parse_type(key.trim(), original)?),
                Box::new(parse_type(value.trim(), original)?),
            ),
            _ => return Err(unsupported(original)),
        },
        ("row", Some(inner)) => EngineType::Row(
            split_top_level(inner)
                .into_iter()
                .map(|field| parse_row_field(field.trim(), original))
                .collect::<Result<_, _>>()?,
        ),
        _ => EngineType::Unknown(original.trim().to_string()),
    };

    // Only temporal types accept a trailing clause after their parameters.
    if !suffix.is_empty() && !matches!(ty, EngineType::Time { .. } | EngineType::Timestamp { .. }) {
        return Ok(EngineType::Unknown(original.trim().to_string()));
    }

    Ok(ty)
}

/// Split `base(args) suffix`. Bases without parentheses keep any trailing
/// words, except for temporal types whose `with time zone` clause becomes the suffix.
fn split_parameters<'a>(
    tag: &'a str,
    original: &str,
) -> Result<(&'a str, Option<&'a str>, &'a str), ConversionError> {
    match tag.find('(') {
        Some(open) => {
            let close = matching_paren(tag, open).ok_or_else(|| unsupported(original))?;
            Ok((
                tag[..open].trim(),
                Some(&tag[open + 1..close]),
                tag[close + 1..].trim(),
            ))
        }
        None => {
            for base in ["timestamp", "time"] {
                if let Some(rest) = tag.strip_prefix(base) {
                    if rest.starts_with(' ') {
                        return Ok((base, None, rest.trim()));
                    }
                }
            }
            Ok((tag, None, ""))
        }
    }
}

fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on commas that are not nested inside parentheses or quotes.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn parse_row_field(field: &str, original: &str) -> Result<(Option<String>, EngineType), ConversionError> {
    if let Some(rest) = field.strip_prefix('"') {
        let end = rest.find('"').ok_or_else(|| unsupported(original))?;
        let name = rest[..end].to_string();
        let ty = parse_type(rest[end + 1..].trim(), original)?;
        return Ok((Some(name), ty));
    }

    // An anonymous field parses as a type on its own.
    let whole = parse_type(field, original);
    if let Ok(ty) = &whole {
        if !ty.is_unknown() {
            return Ok((None, ty.clone()));
        }
    }

    match field.split_once(char::is_whitespace) {
        Some((name, ty)) => Ok((Some(name.to_string()), parse_type(ty.trim(), original)?)),
        None => whole.map(|ty| (None, ty)),
    }
}

fn numeric_params(args: Option<&str>, original: &str) -> Result<Vec<u32>, ConversionError> {
    match args {
        None => Ok(Vec::new()),
        Some(args) => args
            .split(',')
            .map(|p| p.trim().parse::<u32>().map_err(|_| unsupported(original)))
            .collect(),
    }
}

fn single_length(args: Option<&str>, original: &str) -> Result<Option<u32>, ConversionError> {
    match numeric_params(args, original)?.as_slice() {
        [] => Ok(None),
        [n] => Ok(Some(*n)),
        _ => Err(unsupported(original)),
    }
}

fn temporal_precision(args: Option<&str>, original: &str) -> Result<Option<u8>, ConversionError> {
    single_length(args, original)?
        .map(|p| narrow(p, original))
        .transpose()
}

fn time_zone_suffix(suffix: &str, original: &str) -> Result<bool, ConversionError> {
    match suffix {
        "" => Ok(false),
        "with time zone" => Ok(true),
        _ => Err(unsupported(original)),
    }
}

fn narrow(value: u32, original: &str) -> Result<u8, ConversionError> {
    u8::try_from(value).map_err(|_| unsupported(original))
}

fn unsupported(original: &str) -> ConversionError {
    ConversionError::UnsupportedType {
        type_tag: original.to_string(),
    }
}
