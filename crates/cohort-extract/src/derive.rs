//! Secondary confounds computed from joined columns: indicator recoding,
//! squared age and the sex-by-age interactions.
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::table::Table;
use crate::value::Value;

/// Recode a categorical text column to 1 for `level`, 0 otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub column: String,
    pub level: String,
}

impl Indicator {
    pub fn new(column: &str, level: &str) -> Self {
        Indicator {
            column: column.to_string(),
            level: level.to_string(),
        }
    }
}

/// Which columns play "sex" and "age", and the names of the derived terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interactions {
    pub sex: String,
    pub age: String,
    pub age_squared: String,
    pub sex_times_age: String,
    pub sex_times_age_squared: String,
}

impl Interactions {
    pub fn new(sex: &str, age: &str, derived: [&str; 3]) -> Self {
        let [age_squared, sex_times_age, sex_times_age_squared] = derived;
        Interactions {
            sex: sex.to_string(),
            age: age.to_string(),
            age_squared: age_squared.to_string(),
            sex_times_age: sex_times_age.to_string(),
            sex_times_age_squared: sex_times_age_squared.to_string(),
        }
    }

    pub fn derived_names(&self) -> [&str; 3] {
        [
            self.age_squared.as_str(),
            self.sex_times_age.as_str(),
            self.sex_times_age_squared.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSpec {
    pub indicators: Vec<Indicator>,
    pub interactions: Interactions,
}

/// Apply indicators, then append the three interaction columns.
pub fn derive(table: Table, spec: &DerivedSpec) -> Result<Table> {
    let mut table = table;
    for indicator in &spec.indicators {
        let values = table
            .column(&indicator.column)
            .ok_or_else(|| ExtractError::UnknownColumn(indicator.column.clone()))?;
        let recoded = indicator_values(&indicator.column, values, &indicator.level)?;
        table = table.replace_column(&indicator.column, recoded)?;
    }

    let it = &spec.interactions;
    let sex = numeric_column(&table, &it.sex)?;
    let age = numeric_column(&table, &it.age)?;

    let age_squared: Vec<Value> = age
        .iter()
        .map(|a| float_or_missing(a.map(|a| a.powi(2))))
        .collect();
    let sex_times_age: Vec<Value> = sex
        .iter()
        .zip(&age)
        .map(|(s, a)| float_or_missing(s.zip(*a).map(|(s, a)| s * a)))
        .collect();
    let sex_times_age_squared: Vec<Value> = sex
        .iter()
        .zip(&age)
        .map(|(s, a)| float_or_missing(s.zip(*a).map(|(s, a)| s * a.powi(2))))
        .collect();

    table
        .with_column(&it.age_squared, age_squared)?
        .with_column(&it.sex_times_age, sex_times_age)?
        .with_column(&it.sex_times_age_squared, sex_times_age_squared)
}

/// 0/1 per row. Missing stays missing; numeric cells are a schema error.
pub fn indicator_values(column: &str, values: &[Value], level: &str) -> Result<Vec<Value>> {
    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            Value::Text(s) => Ok(Value::Int(i64::from(s.trim() == level))),
            Value::Missing => Ok(Value::Missing),
            other => Err(ExtractError::NotCategorical {
                column: column.to_string(),
                value: other.to_string(),
                row,
            }),
        })
        .collect()
}

fn numeric_column(table: &Table, name: &str) -> Result<Vec<Option<f64>>> {
    let values = table
        .column(name)
        .ok_or_else(|| ExtractError::UnknownColumn(name.to_string()))?;
    values
        .iter()
        .enumerate()
        .map(|(row, v)| match v {
            Value::Missing => Ok(None),
            v => v.as_f64().map(Some).ok_or_else(|| ExtractError::NotNumeric {
                column: name.to_string(),
                value: v.to_string(),
                row,
            }),
        })
        .collect()
}

fn float_or_missing(v: Option<f64>) -> Value {
    v.map_or(Value::Missing, Value::Float)
}
