//! Value conversions at the MySQL driver boundary.
//!
//! Decoding is driven by result-set metadata rather than catalog lookups, so
//! sub-query sources and computed SELECT items work the same as plain
//! columns. Values MySQL has no neutral representation for (JSON, ENUM, SET,
//! CHAR-stored UUIDs) travel as text.

use mysql_async::Params;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row as SqlxRow, TypeInfo, ValueRef};

use crate::error::Result;
use crate::value::{Row, SqlValue};

/// Decode one SQLx row into neutral values.
pub fn decode_row(row: &MySqlRow) -> Result<Row> {
    let columns = row.columns();
    let mut values = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        values.push(decode_value(row, i, column.type_info().name())?);
    }
    Ok(values)
}

fn decode_value(row: &MySqlRow, i: usize, type_name: &str) -> Result<SqlValue> {
    // NULL first; the raw value knows regardless of the declared type.
    let is_null = row.try_get_raw(i).map(|v| v.is_null()).unwrap_or(true);
    if is_null {
        return Ok(SqlValue::Null);
    }

    let value = match type_name {
        // Integer types (TINYINT(1) reports as BOOLEAN)
        "BOOLEAN" | "BIT" => SqlValue::Bool(row.try_get::<bool, _>(i)?),
        "TINYINT" => SqlValue::I64(row.try_get::<i8, _>(i)? as i64),
        "SMALLINT" => SqlValue::I64(row.try_get::<i16, _>(i)? as i64),
        "MEDIUMINT" | "INT" => SqlValue::I64(row.try_get::<i32, _>(i)? as i64),
        "BIGINT" => SqlValue::I64(row.try_get::<i64, _>(i)?),
        "TINYINT UNSIGNED" => SqlValue::I64(row.try_get::<u8, _>(i)? as i64),
        "SMALLINT UNSIGNED" => SqlValue::I64(row.try_get::<u16, _>(i)? as i64),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" => {
            SqlValue::I64(row.try_get::<u32, _>(i)? as i64)
        }
        "BIGINT UNSIGNED" => unsigned_big(row.try_get::<u64, _>(i)?),
        "YEAR" => SqlValue::I64(row.try_get::<u16, _>(i)? as i64),

        // Floating point
        "FLOAT" => SqlValue::F64(row.try_get::<f32, _>(i)? as f64),
        "DOUBLE" => SqlValue::F64(row.try_get::<f64, _>(i)?),

        // Decimal
        "DECIMAL" => SqlValue::Decimal(row.try_get::<Decimal, _>(i)?),

        // Date/Time types
        "DATE" => SqlValue::Date(row.try_get::<chrono::NaiveDate, _>(i)?),
        "TIME" => SqlValue::Time(row.try_get::<chrono::NaiveTime, _>(i)?),
        "DATETIME" | "TIMESTAMP" => {
            SqlValue::DateTime(row.try_get::<chrono::NaiveDateTime, _>(i)?)
        }

        // Binary types
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            SqlValue::Bytes(row.try_get::<Vec<u8>, _>(i)?)
        }

        // CHAR/VARCHAR/TEXT family, ENUM, SET, JSON, and anything newer
        _ => SqlValue::Text(row.try_get::<String, _>(i)?),
    };
    Ok(value)
}

/// A BIGINT UNSIGNED above `i64::MAX` keeps full precision as a decimal.
fn unsigned_big(v: u64) -> SqlValue {
    match i64::try_from(v) {
        Ok(i) => SqlValue::I64(i),
        Err(_) => SqlValue::Decimal(Decimal::from(v)),
    }
}

/// Positional parameters for one INSERT execution.
pub fn to_mysql_params(row: &Row) -> Params {
    Params::Positional(row.iter().map(to_mysql_value).collect())
}

/// Convert a neutral value to a mysql_async wire value.
fn to_mysql_value(value: &SqlValue) -> mysql_async::Value {
    match value {
        SqlValue::Null => mysql_async::Value::NULL,
        SqlValue::Bool(b) => mysql_async::Value::from(*b),
        SqlValue::I64(i) => mysql_async::Value::from(*i),
        SqlValue::F64(f) => mysql_async::Value::from(*f),
        SqlValue::Text(s) => mysql_async::Value::from(s.as_str()),
        SqlValue::Bytes(b) => mysql_async::Value::from(b.as_slice()),
        SqlValue::Decimal(d) => mysql_async::Value::from(d.to_string()),
        SqlValue::Uuid(u) => mysql_async::Value::from(u.to_string()),
        SqlValue::Date(d) => mysql_async::Value::from(*d),
        SqlValue::Time(t) => mysql_async::Value::from(*t),
        SqlValue::DateTime(dt) => mysql_async::Value::from(*dt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::str::FromStr;
    use uuid::Uuid;

    #[test]
    fn test_scalars_map_directly() {
        assert_eq!(to_mysql_value(&SqlValue::Null), mysql_async::Value::NULL);
        assert_eq!(
            to_mysql_value(&SqlValue::I64(-7)),
            mysql_async::Value::Int(-7)
        );
        assert_eq!(
            to_mysql_value(&SqlValue::F64(1.5)),
            mysql_async::Value::Double(1.5)
        );
        assert_eq!(
            to_mysql_value(&SqlValue::Text("abc".into())),
            mysql_async::Value::Bytes(b"abc".to_vec())
        );
        assert_eq!(
            to_mysql_value(&SqlValue::Bytes(vec![0x01, 0x02])),
            mysql_async::Value::Bytes(vec![0x01, 0x02])
        );
    }

    #[test]
    fn test_decimal_and_uuid_travel_as_text() {
        let decimal = Decimal::from_str("12.34").unwrap();
        assert_eq!(
            to_mysql_value(&SqlValue::Decimal(decimal)),
            mysql_async::Value::Bytes(b"12.34".to_vec())
        );

        let id = Uuid::nil();
        assert_eq!(
            to_mysql_value(&SqlValue::Uuid(id)),
            mysql_async::Value::Bytes(id.to_string().into_bytes())
        );
    }

    #[test]
    fn test_temporal_values_use_wire_tuples() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert_eq!(
            to_mysql_value(&SqlValue::Date(date)),
            mysql_async::Value::Date(2024, 5, 17, 0, 0, 0, 0)
        );

        let time = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        assert_eq!(
            to_mysql_value(&SqlValue::Time(time)),
            mysql_async::Value::Time(false, 0, 10, 30, 0, 0)
        );

        let at = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(
            to_mysql_value(&SqlValue::DateTime(at)),
            mysql_async::Value::Date(2024, 5, 17, 10, 30, 0, 0)
        );
    }

    #[test]
    fn test_unsigned_bigint_keeps_precision() {
        assert_eq!(unsigned_big(42), SqlValue::I64(42));
        assert_eq!(
            unsigned_big(u64::MAX),
            SqlValue::Decimal(Decimal::from(u64::MAX))
        );
    }

    #[test]
    fn test_row_params_are_positional() {
        let row = vec![SqlValue::I64(1), SqlValue::Null];
        match to_mysql_params(&row) {
            Params::Positional(values) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[1], mysql_async::Value::NULL);
            }
            other => panic!("expected positional params, got {:?}", other),
        }
    }
}
