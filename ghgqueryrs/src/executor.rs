#[cfg(feature = "duckdb")]
use duckdb::types::Value as DuckValue;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
}

/// Rows returned by a backend; each row keeps the projection's column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn into_rows(self) -> Vec<Map<String, Value>> {
        self.rows
    }
}

/// Map an engine value onto JSON the way a record-oriented dataframe export would:
/// numbers stay numbers, non-finite floats become null.
#[cfg(feature = "duckdb")]
pub(crate) fn duck_value_to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::from(i),
        DuckValue::SmallInt(i) => Value::from(i),
        DuckValue::Int(i) => Value::from(i),
        DuckValue::BigInt(i) => Value::from(i),
        DuckValue::HugeInt(i) => match i64::try_from(i) {
            Ok(small) => Value::from(small),
            Err(_) => Value::String(i.to_string()),
        },
        DuckValue::UHugeInt(i) => match u64::try_from(i) {
            Ok(small) => Value::from(small),
            Err(_) => Value::String(i.to_string()),
        },
        DuckValue::UTinyInt(i) => Value::from(i),
        DuckValue::USmallInt(i) => Value::from(i),
        DuckValue::UInt(i) => Value::from(i),
        DuckValue::UBigInt(i) => Value::from(i),
        DuckValue::Float(f) => Value::from(f),
        DuckValue::Double(f) => Value::from(f),
        DuckValue::Decimal(d) => {
            let text = d.to_string();
            match text.parse::<f64>() {
                Ok(f) => Value::from(f),
                Err(_) => Value::String(text),
            }
        }
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::String(s),
        DuckValue::Blob(bytes) | DuckValue::Geometry(bytes) => Value::String(hex::encode(bytes)),
        DuckValue::Date32(d) => Value::from(d),
        DuckValue::Timestamp(unit, t) => Value::String(format!("{t} ({unit:?})")),
        DuckValue::Time64(unit, t) => Value::String(format!("{t} ({unit:?})")),
        DuckValue::Interval {
            months,
            days,
            nanos,
        } => Value::String(format!("{months} months {days} days {nanos} nanos")),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(duck_value_to_json).collect())
        }
        DuckValue::Struct(fields) => {
            let mut map = Map::new();
            for (key, val) in fields.iter() {
                map.insert(key.clone(), duck_value_to_json(val.clone()));
            }
            Value::Object(map)
        }
        DuckValue::Map(entries) => Value::Array(
            entries
                .iter()
                .map(|(k, v)| {
                    Value::Array(vec![
                        duck_value_to_json(k.clone()),
                        duck_value_to_json(v.clone()),
                    ])
                })
                .collect(),
        ),
        DuckValue::Union(inner) => duck_value_to_json(*inner),
        other => Value::String(format!("{other:?}")),
    }
}

#[cfg(all(test, feature = "duckdb"))]
mod tests {
    use super::*;

    #[test]
    fn numeric_values_stay_numeric() {
        assert_eq!(duck_value_to_json(DuckValue::Double(1.5)), Value::from(1.5));
        assert_eq!(duck_value_to_json(DuckValue::HugeInt(42)), Value::from(42));
        assert_eq!(duck_value_to_json(DuckValue::Double(f64::NAN)), Value::Null);
        assert_eq!(
            duck_value_to_json(DuckValue::Text("Bahia".to_string())),
            Value::String("Bahia".to_string())
        );
    }
}
