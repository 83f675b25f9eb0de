use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use glob::glob;
use once_cell::sync::Lazy;

use crate::error::{GhgQueryError, Result};
use crate::models::{DatasetSpec, DatasetSummary, FilterSpec};

pub const SEEG: &str = "seeg";
pub const SIRENE: &str = "sirene";

static BUILTIN_SPECS: Lazy<Vec<DatasetSpec>> = Lazy::new(|| vec![seeg_spec(), sirene_spec()]);

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}

fn seeg_spec() -> DatasetSpec {
    let base_columns = columns(&[
        "Emissão/Remoção/Bunker",
        "Gás",
        "Setor de emissão",
        "Estado",
        "Categoria emissora",
        "Sub-categoria emissora",
        "Atividade geral",
        "Recorte",
        "Produto ou sistema",
        "Detalhamento",
        "Bioma",
    ]);
    DatasetSpec {
        key: SEEG.to_string(),
        title: "SEEG v12".to_string(),
        table: "SEEG-12-dados-nacionais".to_string(),
        min_year: 1970,
        max_year: 2023,
        // Filter order is fixed; it defines predicate and parameter order.
        filters: vec![
            FilterSpec::new("emissao_type", "Emissão/Remoção/Bunker"),
            FilterSpec::new("gas", "Gás").with_default("CO2e (t) GWP-AR5"),
            FilterSpec::new("setor", "Setor de emissão"),
            FilterSpec::new("estado", "Estado"),
            FilterSpec::new("categoria", "Categoria emissora"),
            FilterSpec::new("subcategoria", "Sub-categoria emissora"),
            FilterSpec::new("atividade", "Atividade geral"),
            FilterSpec::new("recorte", "Recorte"),
            FilterSpec::new("produto", "Produto ou sistema"),
            FilterSpec::new("detalhamento", "Detalhamento"),
            FilterSpec::new("bioma", "Bioma"),
        ],
        distinct_columns: base_columns.clone(),
        base_columns,
        description: Some(
            "National greenhouse-gas emissions and removals by sector, state and gas".to_string(),
        ),
    }
}

fn sirene_spec() -> DatasetSpec {
    let base_columns = columns(&[
        "Código NFR",
        "Setor",
        "Categoria",
        "Sub-categoria",
        "Gás",
        "Unidade",
    ]);
    DatasetSpec {
        key: SIRENE.to_string(),
        title: "SIRENE".to_string(),
        table: "SIRENE-dados-nacionais".to_string(),
        min_year: 1990,
        max_year: 2020,
        filters: vec![
            FilterSpec::new("gas", "Gás"),
            FilterSpec::new("setor", "Setor"),
            FilterSpec::new("codigo_nfr", "Código NFR"),
            FilterSpec::new("categoria", "Categoria"),
            FilterSpec::new("subcategoria", "Sub-categoria"),
        ],
        distinct_columns: base_columns[..5].to_vec(),
        base_columns,
        description: Some("National inventory of emissions by NFR reporting code".to_string()),
    }
}

/// Read-only lookup of dataset definitions keyed by dataset key.
#[derive(Debug, Default, Clone)]
pub struct DatasetRegistry {
    datasets: BTreeMap<String, Arc<DatasetSpec>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the compiled-in `seeg` and `sirene` definitions.
    pub fn builtin() -> Self {
        let datasets = BUILTIN_SPECS
            .iter()
            .map(|spec| (spec.key.clone(), Arc::new(spec.clone())))
            .collect();
        Self { datasets }
    }

    pub fn from_specs(specs: impl IntoIterator<Item = DatasetSpec>) -> Result<Self> {
        let mut registry = Self::new();
        for spec in specs {
            registry.insert(spec)?;
        }
        Ok(registry)
    }

    /// Validate and register a dataset, replacing any previous definition with the same key.
    pub fn insert(&mut self, spec: DatasetSpec) -> Result<()> {
        validate_spec(&spec)?;
        if self.datasets.contains_key(&spec.key) {
            tracing::info!(dataset = %spec.key, "overriding dataset definition");
        }
        self.datasets.insert(spec.key.clone(), Arc::new(spec));
        Ok(())
    }

    /// Load every `*.yml` / `*.yaml` dataset definition found directly under `dir`.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(GhgQueryError::Config(format!(
                "dataset directory not found: {}",
                dir.display()
            )));
        }
        for pattern in ["yml", "yaml"] {
            for entry in glob(&format!("{}/*.{pattern}", dir.display()))
                .map_err(|e| GhgQueryError::Other(e.into()))?
                .flatten()
            {
                self.load_file(&entry)?;
            }
        }
        Ok(())
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let spec: DatasetSpec = serde_yaml::from_str(&contents)?;
        tracing::debug!(dataset = %spec.key, path = %path.display(), "loaded dataset definition");
        self.insert(spec)
    }

    pub fn get(&self, key: &str) -> Option<&Arc<DatasetSpec>> {
        self.datasets.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn specs(&self) -> impl Iterator<Item = &Arc<DatasetSpec>> {
        self.datasets.values()
    }

    pub fn list_summaries(&self) -> Vec<DatasetSummary> {
        self.datasets.values().map(|spec| spec.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

fn validate_spec(spec: &DatasetSpec) -> Result<()> {
    let invalid = |msg: String| GhgQueryError::Validation(format!("dataset {}: {msg}", spec.key));

    if spec.key.is_empty() || spec.table.is_empty() {
        return Err(invalid("key and table must be non-empty".to_string()));
    }
    if spec.min_year > spec.max_year {
        return Err(invalid(format!(
            "min_year {} is after max_year {}",
            spec.min_year, spec.max_year
        )));
    }
    if spec.base_columns.is_empty() {
        return Err(invalid("at least one base column is required".to_string()));
    }

    let base: HashSet<&str> = spec.base_columns.iter().map(String::as_str).collect();
    if base.len() != spec.base_columns.len() {
        return Err(invalid("duplicate base column".to_string()));
    }

    let mut params = HashSet::new();
    for filter in &spec.filters {
        if !params.insert(filter.param.as_str()) {
            return Err(invalid(format!("duplicate filter parameter {}", filter.param)));
        }
        if !base.contains(filter.column.as_str()) {
            return Err(invalid(format!(
                "filter {} references unknown column {}",
                filter.param, filter.column
            )));
        }
    }
    for column in &spec.distinct_columns {
        if !base.contains(column.as_str()) {
            return Err(invalid(format!(
                "distinct column {column} is not a base column"
            )));
        }
    }
    Ok(())
}
