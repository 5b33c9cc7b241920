//! Reference dataset served by the random-sample endpoint.

use std::path::Path;

use rand::Rng;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{DatasetError, DatasetResult};

/// Rows sampled per request.
pub const SAMPLE_SIZE: usize = 10;

/// Tabular reference data kept in memory, columns in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ReferenceDataset {
    /// Load a dataset file: `.json` as an array of row objects, anything
    /// else as CSV with a header row.
    pub fn load(path: impl AsRef<Path>) -> DatasetResult<Self> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let dataset = if is_json {
            Self::load_json(path)?
        } else {
            Self::load_csv(path)?
        };
        info!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.columns.len(),
            "reference_dataset_loaded"
        );
        Ok(dataset)
    }

    /// CSV columns keep header order; cells are typed as integer, float or string.
    fn load_csv(path: &Path) -> DatasetResult<Self> {
        let csv_error = |source| DatasetError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.is_empty() {
            return Err(DatasetError::Shape("CSV file has no header row".to_string()));
        }

        let rows = reader
            .records()
            .map(|record| -> DatasetResult<Vec<Value>> {
                let record = record.map_err(csv_error)?;
                Ok((0..columns.len())
                    .map(|i| record.get(i).map(csv_cell).unwrap_or(Value::Null))
                    .collect())
            })
            .collect::<DatasetResult<Vec<Vec<Value>>>>()?;

        Ok(Self { columns, rows })
    }

    fn load_json(path: &Path) -> DatasetResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let Value::Array(items) = value else {
            return Err(DatasetError::Shape(
                "expected a JSON array of row objects".to_string(),
            ));
        };
        let rows = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(row) => Ok(row),
                _ => Err(DatasetError::Shape(format!("row {i} is not an object"))),
            })
            .collect::<DatasetResult<Vec<_>>>()?;

        Ok(Self::from_rows(rows))
    }

    /// Build from row objects. Columns missing from a row are null.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = rows
            .into_iter()
            .map(|mut row| {
                columns
                    .iter()
                    .map(|c| row.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Draw `n` distinct rows uniformly, returned column-oriented.
    pub fn sample(&self, n: usize) -> DatasetResult<Map<String, Value>> {
        self.sample_with(n, &mut rand::rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> DatasetResult<Map<String, Value>> {
        if n > self.rows.len() {
            return Err(DatasetError::TooFewRows {
                requested: n,
                available: self.rows.len(),
            });
        }

        let picked = rand::seq::index::sample(rng, self.rows.len(), n);
        let mut out = Map::new();
        for (col, name) in self.columns.iter().enumerate() {
            let values = picked
                .iter()
                .map(|row| self.rows[row][col].clone())
                .collect();
            out.insert(name.clone(), Value::Array(values));
        }
        Ok(out)
    }
}

fn csv_cell(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    match raw.parse::<f64>() {
        Ok(float) if float.is_finite() => Value::from(float),
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use tempfile::TempDir;

    fn rows(n: usize) -> Vec<Map<String, Value>> {
        (0..n)
            .map(|i| {
                let value = json!({"smiles": format!("C{i}"), "density": i as f64 / 10.0});
                match value {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                }
            })
            .collect()
    }

    #[test]
    fn sample_is_column_oriented_and_distinct() {
        let dataset = ReferenceDataset::from_rows(rows(25));
        let mut rng = StdRng::seed_from_u64(7);
        let sample = dataset.sample_with(SAMPLE_SIZE, &mut rng).unwrap();

        let keys: Vec<&String> = sample.keys().collect();
        assert_eq!(keys, vec!["smiles", "density"]);

        let smiles = sample["smiles"].as_array().unwrap();
        assert_eq!(smiles.len(), SAMPLE_SIZE);
        let mut unique: Vec<&str> = smiles.iter().map(|v| v.as_str().unwrap()).collect();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), SAMPLE_SIZE);
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let dataset = ReferenceDataset::from_rows(rows(3));
        assert!(matches!(
            dataset.sample(SAMPLE_SIZE),
            Err(DatasetError::TooFewRows {
                requested: 10,
                available: 3
            })
        ));
    }

    #[test]
    fn missing_cells_are_null() {
        let mut data = rows(2);
        data[1].remove("density");
        let dataset = ReferenceDataset::from_rows(data);
        let sample = dataset.sample(2).unwrap();
        let densities = sample["density"].as_array().unwrap();
        assert_eq!(densities.iter().filter(|v| v.is_null()).count(), 1);
    }

    #[test]
    fn load_rejects_non_array() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dataset.json");
        std::fs::write(&path, r#"{"smiles": ["C"]}"#).unwrap();
        assert!(matches!(
            ReferenceDataset::load(&path),
            Err(DatasetError::Shape(_))
        ));
    }

    #[test]
    fn load_reads_rows() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dataset.json");
        std::fs::write(&path, serde_json::to_string(&rows(12)).unwrap()).unwrap();
        let dataset = ReferenceDataset::load(&path).unwrap();
        assert_eq!(dataset.len(), 12);
        assert_eq!(dataset.columns(), ["smiles", "density"]);
    }

    #[test]
    fn load_reads_csv_in_header_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dataset.csv");
        let mut text = String::from("SMILES,Density,Refractive_Index,DC,Thermal_Conductivity\n");
        for i in 0..12 {
            text.push_str(&format!("*CC(*)C{i},1.0{i},1.5,2.6,\n"));
        }
        std::fs::write(&path, text).unwrap();

        let dataset = ReferenceDataset::load(&path).unwrap();
        assert_eq!(dataset.len(), 12);
        assert_eq!(
            dataset.columns(),
            ["SMILES", "Density", "Refractive_Index", "DC", "Thermal_Conductivity"]
        );

        let sample = dataset.sample(SAMPLE_SIZE).unwrap();
        let keys: Vec<&String> = sample.keys().collect();
        assert_eq!(keys, dataset.columns().iter().collect::<Vec<_>>());
        assert!(sample["SMILES"][0].as_str().unwrap().starts_with("*CC(*)C"));
        assert!(sample["Density"][0].is_f64());
        assert!(sample["Thermal_Conductivity"][0].is_null());
    }

    #[test]
    fn csv_cells_are_typed() {
        assert_eq!(csv_cell("42"), json!(42));
        assert_eq!(csv_cell(" 1.25 "), json!(1.25));
        assert_eq!(csv_cell("NaN"), json!("NaN"));
        assert_eq!(csv_cell("c1ccccc1"), json!("c1ccccc1"));
        assert_eq!(csv_cell(""), Value::Null);
    }

    #[test]
    fn load_rejects_ragged_csv() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dataset.csv");
        std::fs::write(&path, "SMILES,Density\nCC,1.0\nCCC,1.1,extra\n").unwrap();
        assert!(matches!(
            ReferenceDataset::load(&path),
            Err(DatasetError::Csv { .. })
        ));
    }
}
