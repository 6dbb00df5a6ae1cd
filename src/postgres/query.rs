use std::error::Error;
use std::fmt::Write as _;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres_protocol::types as wire;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{FromSql, Kind, Type};
use uuid::Uuid;

use crate::error::SqlRunnerError;
use crate::results::ResultSet;
use crate::types::RowValues;

type BoxError = Box<dyn Error + Sync + Send>;

/// Build a result set from raw Postgres rows.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set_from_rows(
    rows: &[tokio_postgres::Row],
) -> Result<ResultSet, SqlRunnerError> {
    let mut result_set = ResultSet::with_capacity(rows.len());
    if let Some(row) = rows.first() {
        let cols: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
        result_set.set_column_names(Arc::new(cols));
    }

    for row in rows {
        result_set.add_row_values(postgres_extract_row(row)?);
    }

    Ok(result_set)
}

/// Extract every column of a row.
///
/// # Errors
/// Returns `SqlRunnerError` if a column cannot be decoded.
pub fn postgres_extract_row(row: &tokio_postgres::Row) -> Result<Vec<RowValues>, SqlRunnerError> {
    let col_count = row.columns().len();
    let mut row_values = Vec::with_capacity(col_count);
    for idx in 0..col_count {
        row_values.push(postgres_extract_value(row, idx)?);
    }
    Ok(row_values)
}

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `SqlRunnerError::ExecutionError` for column types with no JSON form, or
/// if the column cannot be decoded.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, SqlRunnerError> {
    let column = &row.columns()[idx];
    if !<Cell as FromSql>::accepts(column.type_()) {
        return Err(SqlRunnerError::ExecutionError(format!(
            "unsupported type {} for column {}",
            column.type_().name(),
            column.name()
        )));
    }
    let val: Option<Cell> = row.try_get(idx)?;
    Ok(val.map_or(RowValues::Null, |cell| cell.0))
}

/// One decoded column value; arrays decode element-wise into JSON arrays.
#[derive(Debug)]
pub(crate) struct Cell(pub(crate) RowValues);

impl<'a> FromSql<'a> for Cell {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => RowValues::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => RowValues::Int(i16::from_sql(ty, raw)?.into()),
            Type::INT4 => RowValues::Int(i32::from_sql(ty, raw)?.into()),
            Type::INT8 => RowValues::Int(i64::from_sql(ty, raw)?),
            Type::OID => RowValues::Int(u32::from_sql(ty, raw)?.into()),
            Type::FLOAT4 => RowValues::Float(f32::from_sql(ty, raw)?.into()),
            Type::FLOAT8 => RowValues::Float(f64::from_sql(ty, raw)?),
            Type::NUMERIC => RowValues::Text(numeric_text(ty, raw)?),
            Type::MONEY => RowValues::Text(money_text(i64::from_sql(ty, raw)?)),
            Type::TIMESTAMP => RowValues::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => RowValues::Text(DateTime::<Utc>::from_sql(ty, raw)?.to_rfc3339()),
            Type::DATE => RowValues::Text(NaiveDate::from_sql(ty, raw)?.to_string()),
            Type::TIME => RowValues::Text(NaiveTime::from_sql(ty, raw)?.to_string()),
            Type::TIMETZ => RowValues::Text(timetz_text(raw)?),
            Type::INTERVAL => RowValues::Text(interval_text(raw)?),
            Type::JSON | Type::JSONB => RowValues::JSON(Value::from_sql(ty, raw)?),
            Type::BYTEA => RowValues::Blob(Vec::<u8>::from_sql(ty, raw)?),
            Type::UUID => RowValues::Text(Uuid::from_sql(ty, raw)?.to_string()),
            Type::INET | Type::CIDR => RowValues::Text(inet_text(ty, raw)?),
            Type::MACADDR => RowValues::Text(macaddr_text(raw)?),
            _ if <String as FromSql>::accepts(ty) => RowValues::Text(String::from_sql(ty, raw)?),
            _ => match ty.kind() {
                Kind::Array(_) => {
                    let cells = Vec::<Option<Cell>>::from_sql(ty, raw)?;
                    let items = cells
                        .into_iter()
                        .map(|cell| serde_json::to_value(cell.map_or(RowValues::Null, |c| c.0)))
                        .collect::<Result<Vec<_>, _>>()?;
                    RowValues::JSON(Value::Array(items))
                }
                Kind::Enum(_) => RowValues::Text(std::str::from_utf8(raw)?.to_string()),
                Kind::Domain(inner) => Cell::from_sql(inner, raw)?.0,
                _ => return Err(format!("unsupported type {}", ty.name()).into()),
            },
        };
        Ok(Cell(value))
    }

    fn accepts(ty: &Type) -> bool {
        match *ty {
            Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::OID
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::NUMERIC
            | Type::MONEY
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::DATE
            | Type::TIME
            | Type::TIMETZ
            | Type::INTERVAL
            | Type::JSON
            | Type::JSONB
            | Type::BYTEA
            | Type::UUID
            | Type::INET
            | Type::CIDR
            | Type::MACADDR => true,
            _ if <String as FromSql>::accepts(ty) => true,
            _ => match ty.kind() {
                Kind::Array(member) => Self::accepts(member),
                Kind::Enum(_) => true,
                Kind::Domain(inner) => Self::accepts(inner),
                _ => false,
            },
        }
    }
}

const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// `numeric` as decimal text with its declared scale.
fn numeric_text(ty: &Type, raw: &[u8]) -> Result<String, BoxError> {
    let sign = raw
        .get(4..6)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or("numeric value is truncated")?;
    match sign {
        NUMERIC_NAN => Ok("NaN".to_string()),
        NUMERIC_PINF => Ok("Infinity".to_string()),
        NUMERIC_NINF => Ok("-Infinity".to_string()),
        _ => match Decimal::from_sql(ty, raw) {
            Ok(decimal) => Ok(decimal.to_string()),
            Err(err) => {
                tracing::debug!(error = %err, "numeric exceeds decimal range, rendering digits");
                numeric_digits_text(raw)
            }
        },
    }
}

/// Renders base-10000 numeric digits directly, for values wider than `Decimal`.
fn numeric_digits_text(raw: &[u8]) -> Result<String, BoxError> {
    let word = |i: usize| {
        raw.get(i * 2..i * 2 + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .ok_or("numeric value is truncated")
    };
    let ndigits = usize::from(word(0)?);
    let weight = i32::from(i16::from_be_bytes(word(1)?.to_be_bytes()));
    let negative = word(2)? == 0x4000;
    let dscale = usize::from(word(3)?);
    let digits = (0..ndigits)
        .map(|i| word(4 + i))
        .collect::<Result<Vec<u16>, _>>()?;
    let group = |w: i32| {
        usize::try_from(weight - w)
            .ok()
            .and_then(|i| digits.get(i))
            .copied()
            .unwrap_or(0)
    };

    let mut int_digits = String::new();
    for w in (0..=weight).rev() {
        write!(int_digits, "{:04}", group(w))?;
    }
    let int_digits = int_digits.trim_start_matches('0');

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(if int_digits.is_empty() { "0" } else { int_digits });
    if dscale > 0 {
        let mut frac = String::new();
        let mut w = -1;
        while frac.len() < dscale {
            write!(frac, "{:04}", group(w))?;
            w -= 1;
        }
        out.push('.');
        out.push_str(&frac[..dscale]);
    }
    Ok(out)
}

fn money_text(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}

fn timetz_text(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 12 {
        return Err("invalid timetz length".into());
    }
    let micros = wire::time_from_sql(&raw[..8])?;
    // stored as seconds west of UTC
    let offset = -wire::int4_from_sql(&raw[8..])?;

    let mut out = time_of_day(micros)?;
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.unsigned_abs();
    write!(out, "{sign}{:02}", offset / 3600)?;
    if offset % 3600 != 0 {
        write!(out, ":{:02}", offset % 3600 / 60)?;
    }
    Ok(out)
}

fn time_of_day(micros: i64) -> Result<String, BoxError> {
    let secs = u32::try_from(micros.div_euclid(1_000_000))?;
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        .ok_or("time of day out of range")?;
    Ok(time.to_string())
}

/// `interval` in the server's default `postgres` output style.
fn interval_text(raw: &[u8]) -> Result<String, BoxError> {
    if raw.len() != 16 {
        return Err("invalid interval length".into());
    }
    let micros = wire::int8_from_sql(&raw[..8])?;
    let days = wire::int4_from_sql(&raw[8..12])?;
    let months = wire::int4_from_sql(&raw[12..])?;

    let mut parts: Vec<String> = Vec::new();
    for (amount, unit) in [(months / 12, "year"), (months % 12, "mon"), (days, "day")] {
        if amount != 0 {
            let plural = if amount == 1 { "" } else { "s" };
            parts.push(format!("{amount} {unit}{plural}"));
        }
    }

    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let abs = micros.unsigned_abs();
        let secs = abs / 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            secs / 3600,
            secs % 3600 / 60,
            secs % 60
        );
        let frac = abs % 1_000_000;
        if frac != 0 {
            let digits = format!("{frac:06}");
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }

    Ok(parts.join(" "))
}

fn inet_text(ty: &Type, raw: &[u8]) -> Result<String, BoxError> {
    let inet = wire::inet_from_sql(raw)?;
    let full = match inet.addr() {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    if *ty == Type::INET && inet.netmask() == full {
        Ok(inet.addr().to_string())
    } else {
        Ok(format!("{}/{}", inet.addr(), inet.netmask()))
    }
}

fn macaddr_text(raw: &[u8]) -> Result<String, BoxError> {
    let bytes = wire::macaddr_from_sql(raw)?;
    Ok(bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(ty: &Type, raw: &[u8]) -> RowValues {
        Cell::from_sql(ty, raw).expect("decode").0
    }

    fn numeric(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&u16::try_from(digits.len()).expect("len").to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            raw.extend_from_slice(&d.to_be_bytes());
        }
        raw
    }

    fn int4_array(values: &[Option<i32>]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&1i32.to_be_bytes());
        raw.extend_from_slice(&i32::from(values.iter().any(Option::is_none)).to_be_bytes());
        raw.extend_from_slice(&Type::INT4.oid().to_be_bytes());
        raw.extend_from_slice(&i32::try_from(values.len()).expect("len").to_be_bytes());
        raw.extend_from_slice(&1i32.to_be_bytes());
        for value in values {
            match value {
                Some(v) => {
                    raw.extend_from_slice(&4i32.to_be_bytes());
                    raw.extend_from_slice(&v.to_be_bytes());
                }
                None => raw.extend_from_slice(&(-1i32).to_be_bytes()),
            }
        }
        raw
    }

    fn interval(micros: i64, days: i32, months: i32) -> Vec<u8> {
        let mut raw = micros.to_be_bytes().to_vec();
        raw.extend_from_slice(&days.to_be_bytes());
        raw.extend_from_slice(&months.to_be_bytes());
        raw
    }

    #[test]
    fn arrays_decode_to_json_arrays() {
        assert_eq!(
            decode(&Type::INT4_ARRAY, &int4_array(&[Some(1), None, Some(2)])),
            RowValues::JSON(json!([1, null, 2]))
        );
        assert!(<Cell as FromSql>::accepts(&Type::TEXT_ARRAY));
        assert!(<Cell as FromSql>::accepts(&Type::NUMERIC_ARRAY));
    }

    #[test]
    fn numeric_keeps_declared_scale() {
        assert_eq!(
            decode(&Type::NUMERIC, &numeric(0, 0, 2, &[123, 4500])),
            RowValues::Text("123.45".into())
        );
        assert_eq!(
            decode(&Type::NUMERIC, &numeric(-1, 0x4000, 2, &[500])),
            RowValues::Text("-0.05".into())
        );
        assert_eq!(
            decode(&Type::NUMERIC, &numeric(0, NUMERIC_NAN, 0, &[])),
            RowValues::Text("NaN".into())
        );
        assert_eq!(
            decode(&Type::NUMERIC, &numeric(9, 0, 0, &[1])),
            RowValues::Text(format!("1{}", "0".repeat(36)))
        );
        assert!(Cell::from_sql(&Type::NUMERIC, &[0, 1]).is_err());
    }

    #[test]
    fn uuid_renders_hyphenated() {
        let raw: Vec<u8> = (0u8..16).collect();
        assert_eq!(
            decode(&Type::UUID, &raw),
            RowValues::Text("00010203-0405-0607-0809-0a0b0c0d0e0f".into())
        );
    }

    #[test]
    fn interval_uses_server_output_style() {
        assert_eq!(interval_text(&interval(0, 1, 0)).expect("interval"), "1 day");
        assert_eq!(
            interval_text(&interval(14_706_500_000, 3, 14)).expect("interval"),
            "1 year 2 mons 3 days 04:05:06.5"
        );
        assert_eq!(interval_text(&interval(-3_600_000_000, 0, 0)).expect("interval"), "-01:00:00");
        assert_eq!(interval_text(&interval(0, 0, 0)).expect("interval"), "00:00:00");
    }

    #[test]
    fn timetz_money_and_network_types() {
        let mut timetz = 45_296_000_000i64.to_be_bytes().to_vec();
        timetz.extend_from_slice(&(-19_800i32).to_be_bytes());
        assert_eq!(timetz_text(&timetz).expect("timetz"), "12:34:56+05:30");

        assert_eq!(money_text(-1234), "-$12.34");

        let host = [2u8, 32, 0, 4, 10, 0, 0, 1];
        assert_eq!(decode(&Type::INET, &host), RowValues::Text("10.0.0.1".into()));
        let net = [2u8, 24, 1, 4, 10, 0, 0, 0];
        assert_eq!(decode(&Type::CIDR, &net), RowValues::Text("10.0.0.0/24".into()));
    }

    #[test]
    fn unknown_binary_types_are_rejected() {
        assert!(!<Cell as FromSql>::accepts(&Type::POINT));
        assert!(!<Cell as FromSql>::accepts(&Type::TS_VECTOR));
        assert!(Cell::from_sql(&Type::POINT, &[0; 16]).is_err());
    }
}
