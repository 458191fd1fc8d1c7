// src/table/mod.rs

use anyhow::{bail, ensure, Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, Float64Array, Int32Array, StringArray},
    datatypes::{DataType, Field, Float64Type, Int32Type, Schema},
    record_batch::RecordBatch,
};
use serde_json::Value;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};
use tracing::{debug, info, warn};

use crate::fetch::Observation;

pub mod coerce;
pub mod export;

/// Fertility rate, total (births per woman).
pub const FERTILITY_RATE: &str = "SP.DYN.TFRT.IN";
/// Adolescent fertility rate (births per 1,000 women ages 15-19).
pub const TEEN_BIRTH_RATE: &str = "SP.ADO.TFRT";
/// Labor force participation rate, female (% of female population ages 15+).
pub const FEMALE_LABOR_FORCE: &str = "SL.TLF.CACT.FE.ZS";

pub const COUNTRY: &str = "country";
pub const YEAR: &str = "year";

/// Observations pivoted to one row per (country, year) and one nullable
/// Float64 column per indicator.
///
/// Layout: `country` (Utf8), `year` (Int32), then indicator columns in
/// lexicographic order. Rows are strictly ascending by (country, year), so
/// every pair is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    batch: RecordBatch,
}

/// Pivot observations into a [`WideTable`].
///
/// Values are coerced to numbers (anything else is missing). Observations
/// whose year doesn't parse are dropped. When the same (country, year,
/// indicator) shows up twice the later one wins. Indicators without a
/// single numeric value get no column.
pub fn build_wide_table(observations: &[Observation]) -> Result<WideTable> {
    let mut rows: BTreeMap<(String, i32), HashMap<&str, Option<f64>>> = BTreeMap::new();
    let mut dropped = 0usize;

    for obs in observations {
        let Some(year) = coerce::parse_year(&obs.date) else {
            warn!(country = %obs.country, indicator = %obs.indicator, date = %obs.date, "unparseable year; dropping observation");
            dropped += 1;
            continue;
        };
        let cells = rows.entry((obs.country.clone(), year)).or_default();
        if cells
            .insert(obs.indicator.as_str(), coerce::coerce_value(&obs.value))
            .is_some()
        {
            debug!(country = %obs.country, year, indicator = %obs.indicator, "duplicate observation; later value wins");
        }
    }

    let populated: BTreeSet<&str> = rows
        .values()
        .flat_map(|cells| cells.iter())
        .filter(|(_, v)| v.is_some())
        .map(|(k, _)| *k)
        .collect();

    let mut fields = vec![
        Field::new(COUNTRY, DataType::Utf8, false),
        Field::new(YEAR, DataType::Int32, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.keys().map(|(c, _)| c.as_str()),
        )),
        Arc::new(Int32Array::from_iter_values(rows.keys().map(|(_, y)| *y))),
    ];
    for &indicator in &populated {
        if indicator == COUNTRY || indicator == YEAR {
            bail!("indicator code {:?} clashes with a key column", indicator);
        }
        let values: Float64Array = rows
            .values()
            .map(|cells| cells.get(indicator).copied().flatten())
            .collect();
        fields.push(Field::new(indicator, DataType::Float64, true));
        columns.push(Arc::new(values));
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("building wide table batch")?;
    info!(
        rows = batch.num_rows(),
        indicators = populated.len(),
        dropped,
        "built wide table"
    );
    Ok(WideTable { batch })
}

impl WideTable {
    /// Wrap an existing batch, checking the layout and row-key invariants.
    pub fn from_batch(batch: RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        ensure!(
            schema.fields().len() >= 2,
            "wide table needs at least country and year columns"
        );
        let (c, y) = (schema.field(0), schema.field(1));
        ensure!(
            c.name() == COUNTRY && c.data_type() == &DataType::Utf8,
            "first column must be Utf8 {:?}",
            COUNTRY
        );
        ensure!(
            y.name() == YEAR && y.data_type() == &DataType::Int32,
            "second column must be Int32 {:?}",
            YEAR
        );
        for f in schema.fields().iter().skip(2) {
            ensure!(
                f.data_type() == &DataType::Float64,
                "indicator column {:?} must be Float64, found {}",
                f.name(),
                f.data_type()
            );
        }
        ensure!(
            batch.column(0).null_count() == 0 && batch.column(1).null_count() == 0,
            "country and year must not contain nulls"
        );

        let table = Self { batch };
        let (countries, years) = (table.country_col(), table.year_col());
        for i in 1..table.num_rows() {
            let prev = (countries.value(i - 1), years.value(i - 1));
            let cur = (countries.value(i), years.value(i));
            ensure!(
                prev < cur,
                "rows must be unique and sorted by (country, year): {:?} then {:?}",
                prev,
                cur
            );
        }
        Ok(table)
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn indicator_columns(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .skip(2)
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn has_column(&self, indicator: &str) -> bool {
        self.indicator(indicator).is_some()
    }

    /// Distinct countries in row order.
    pub fn countries(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for c in self.country_col().iter().flatten() {
            if out.last().map(String::as_str) != Some(c) {
                out.push(c.to_string());
            }
        }
        out
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let set: BTreeSet<i32> = self.year_col().values().iter().copied().collect();
        set.into_iter().collect()
    }

    pub fn max_year(&self) -> Option<i32> {
        self.year_col().values().iter().copied().max()
    }

    pub fn min_year(&self) -> Option<i32> {
        self.year_col().values().iter().copied().min()
    }

    pub fn value(&self, country: &str, year: i32, indicator: &str) -> Option<f64> {
        let values = self.indicator(indicator)?;
        let i = self.row_index(country, year)?;
        values.is_valid(i).then(|| values.value(i))
    }

    /// `(year, value)` for one country, ascending by year. Missing values
    /// are kept so callers can see the gaps.
    pub fn series(&self, country: &str, indicator: &str) -> Vec<(i32, Option<f64>)> {
        let Some(values) = self.indicator(indicator) else {
            return Vec::new();
        };
        let (countries, years) = (self.country_col(), self.year_col());
        (0..self.num_rows())
            .filter(|&i| countries.value(i) == country)
            .map(|i| (years.value(i), values.is_valid(i).then(|| values.value(i))))
            .collect()
    }

    /// `(country, value)` for every row of `year`, in row order.
    pub fn values_at(&self, year: i32, indicator: &str) -> Vec<(String, Option<f64>)> {
        let Some(values) = self.indicator(indicator) else {
            return Vec::new();
        };
        let (countries, years) = (self.country_col(), self.year_col());
        (0..self.num_rows())
            .filter(|&i| years.value(i) == year)
            .map(|i| {
                (
                    countries.value(i).to_string(),
                    values.is_valid(i).then(|| values.value(i)),
                )
            })
            .collect()
    }

    /// Flatten back to one observation per cell; missing cells become
    /// `null` so every row survives a rebuild.
    pub fn to_observations(&self) -> Vec<Observation> {
        let (countries, years) = (self.country_col(), self.year_col());
        let mut out = Vec::new();
        for name in self.indicator_columns() {
            let Some(values) = self.indicator(&name) else {
                continue;
            };
            for i in 0..self.num_rows() {
                out.push(Observation {
                    country: countries.value(i).to_string(),
                    date: years.value(i).to_string(),
                    indicator: name.clone(),
                    value: if values.is_valid(i) {
                        Value::from(values.value(i))
                    } else {
                        Value::Null
                    },
                });
            }
        }
        out
    }

    fn row_index(&self, country: &str, year: i32) -> Option<usize> {
        let (countries, years) = (self.country_col(), self.year_col());
        (0..self.num_rows()).find(|&i| countries.value(i) == country && years.value(i) == year)
    }

    fn country_col(&self) -> &StringArray {
        self.batch.column(0).as_string::<i32>()
    }

    fn year_col(&self) -> &Int32Array {
        self.batch.column(1).as_primitive::<Int32Type>()
    }

    fn indicator(&self, name: &str) -> Option<&Float64Array> {
        let idx = self.batch.schema().index_of(name).ok().filter(|&i| i >= 2)?;
        Some(self.batch.column(idx).as_primitive::<Float64Type>())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::obs;
    use super::*;
    use serde_json::json;

    fn sample() -> Vec<Observation> {
        vec![
            obs("Sweden", 2021, FERTILITY_RATE, json!(1.67)),
            obs("Norway", 2022, FERTILITY_RATE, json!(1.41)),
            obs("Norway", 2021, FERTILITY_RATE, json!(1.55)),
            obs("Norway", 2021, TEEN_BIRTH_RATE, json!("2.9")),
            obs("Norway", 2022, TEEN_BIRTH_RATE, Value::Null),
            obs("Sweden", 2021, TEEN_BIRTH_RATE, json!("n/a")),
            obs("Sweden", 2021, FEMALE_LABOR_FORCE, Value::Null),
        ]
    }

    #[test]
    fn one_row_per_country_year() {
        let t = build_wide_table(&sample()).unwrap();
        assert_eq!(t.num_rows(), 3);
        assert_eq!(t.countries(), vec!["Norway", "Sweden"]);
        assert_eq!(t.years(), vec![2021, 2022]);
        assert_eq!(t.max_year(), Some(2022));
        assert_eq!(t.min_year(), Some(2021));
    }

    #[test]
    fn pivots_and_coerces_values() {
        let t = build_wide_table(&sample()).unwrap();
        assert_eq!(t.value("Norway", 2021, FERTILITY_RATE), Some(1.55));
        assert_eq!(t.value("Norway", 2021, TEEN_BIRTH_RATE), Some(2.9));
        assert_eq!(t.value("Norway", 2022, TEEN_BIRTH_RATE), None);
        assert_eq!(t.value("Sweden", 2021, TEEN_BIRTH_RATE), None);
        assert_eq!(t.value("Sweden", 2022, FERTILITY_RATE), None);
        assert_eq!(
            t.series("Norway", FERTILITY_RATE),
            vec![(2021, Some(1.55)), (2022, Some(1.41))]
        );
        assert_eq!(
            t.values_at(2021, FERTILITY_RATE),
            vec![("Norway".to_string(), Some(1.55)), ("Sweden".to_string(), Some(1.67))]
        );
    }

    #[test]
    fn all_missing_indicator_has_no_column() {
        let t = build_wide_table(&sample()).unwrap();
        assert_eq!(t.indicator_columns(), vec![TEEN_BIRTH_RATE, FERTILITY_RATE]);
        assert!(t.has_column(FERTILITY_RATE));
        assert!(!t.has_column(FEMALE_LABOR_FORCE));
        assert!(!t.has_column(YEAR));
        assert!(t.series("Norway", FEMALE_LABOR_FORCE).is_empty());
    }

    #[test]
    fn duplicate_cell_keeps_last_value() {
        let t = build_wide_table(&[
            obs("Iceland", 2000, FERTILITY_RATE, json!(2.0)),
            obs("Iceland", 2000, FERTILITY_RATE, json!(2.5)),
        ])
        .unwrap();
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.value("Iceland", 2000, FERTILITY_RATE), Some(2.5));
    }

    #[test]
    fn unparseable_year_is_dropped() {
        let mut bad = obs("Finland", 0, FERTILITY_RATE, json!(1.3));
        bad.date = "2020Q1".to_string();
        let t = build_wide_table(&[bad, obs("Finland", 2020, FERTILITY_RATE, json!(1.37))]).unwrap();
        assert_eq!(t.num_rows(), 1);
        assert_eq!(t.years(), vec![2020]);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let t = build_wide_table(&[]).unwrap();
        assert!(t.is_empty());
        assert!(t.indicator_columns().is_empty());
        assert_eq!(t.max_year(), None);
    }

    #[test]
    fn rebuild_from_own_output_is_identity() {
        let t = build_wide_table(&sample()).unwrap();
        let again = build_wide_table(&t.to_observations()).unwrap();
        assert_eq!(again, t);

        let wrapped = WideTable::from_batch(t.record_batch().clone()).unwrap();
        assert_eq!(wrapped, t);
    }

    #[test]
    fn from_batch_rejects_duplicate_keys() {
        let schema = Arc::new(Schema::new(vec![
            Field::new(COUNTRY, DataType::Utf8, false),
            Field::new(YEAR, DataType::Int32, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["Norway", "Norway"])),
                Arc::new(Int32Array::from(vec![2000, 2000])),
            ],
        )
        .unwrap();
        assert!(WideTable::from_batch(batch).is_err());
    }
}
