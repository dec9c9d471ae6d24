//! Layer export pipeline
//!
//! An [`Exporter`] compiles every layer of a [`Visualization`] into chunk
//! artifacts and writes the `plot.json` manifest describing them.
//!
//! The run has two phases:
//!
//! 1. **Registration** (sequential): every layer's aesthetics are classified and
//!    its selector references, declared types and observed values are merged into
//!    the run's [`SelectorRegistry`]. A layer is checked completely before it
//!    touches the registry, so a rejected layer leaves no trace.
//! 2. **Compilation** (optionally parallel): geom pre-processing, chunk planning,
//!    clamping, NA re-grouping, common factoring and partitioning. Chunk groups are
//!    merged into the registry under its lock.
//!
//! Configuration and data errors fail only the layer that caused them; they are
//! collected in [`ExportReport::failures`].

pub mod clamp;
pub mod common;
pub mod manifest;
pub mod na;
pub mod params;
pub mod partition;
pub mod plan;
pub mod types;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::data::{column_keys, column_names, compare_keys, distinct_keys, has_column, to_tsv};
use crate::geom::GeomData;
use crate::layer::{Layer, Plot, Visualization};
use crate::naming::{self, CHUNK_VARS_PARAM, GROUP_COLUMN, MANIFEST_FILE, PANEL_COLUMN};
use crate::selector::{classify, Classified, SelectorRegistry, SelectorType};
use crate::writer::ArtifactWriter;
use crate::{AnimintError, DataFrame, Result};

use manifest::{ColumnSets, LayerManifest, Manifest, TimeManifest};
use partition::NestKey;
use plan::MIN_CHUNK_BYTES;

/// Export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Compile layers on several threads
    pub parallel: bool,
    /// Smallest estimated chunk file size worth a separate request
    pub min_chunk_bytes: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            min_chunk_bytes: MIN_CHUNK_BYTES,
        }
    }
}

/// Non-fatal usage problem found in a layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportWarning {
    pub layer: String,
    pub message: String,
}

/// A layer that could not be exported
#[derive(Debug)]
pub struct LayerFailure {
    pub layer: String,
    pub error: AnimintError,
}

#[derive(Debug)]
pub struct ExportReport {
    pub manifest: Manifest,
    pub warnings: Vec<ExportWarning>,
    pub failures: Vec<LayerFailure>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A layer and where it sits in the visualization
struct LayerRef<'v> {
    classed: String,
    plot: &'v Plot,
    layer: &'v Layer,
}

struct CompiledLayer {
    manifest: LayerManifest,
    warnings: Vec<String>,
}

/// One selector referenced by a layer
#[derive(Debug, Clone, PartialEq)]
struct SelectorReference {
    name: String,
    click: bool,
    show: bool,
    values: Vec<String>,
}

pub struct Exporter<'w> {
    options: ExportOptions,
    writer: &'w dyn ArtifactWriter,
}

impl<'w> Exporter<'w> {
    pub fn new(options: ExportOptions, writer: &'w dyn ArtifactWriter) -> Self {
        Self { options, writer }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export a visualization and write its manifest
    ///
    /// Returns an error only for problems affecting the whole run (invalid
    /// visualization-wide declarations, manifest write failures).
    pub fn export(&self, visualization: &Visualization) -> Result<ExportReport> {
        let mut registry = new_registry(visualization)?;
        let mut failures = Vec::new();

        let mut registered = Vec::new();
        for layer in enumerate_layers(visualization) {
            match register_layer(&mut registry, &layer) {
                Ok(classified) => registered.push((layer, classified)),
                Err(error) => failures.push(failure(&layer.classed, error)),
            }
        }

        let time = visualization.time.as_ref().map(|t| t.variable.as_str());
        let registry = Mutex::new(registry);
        let results = if self.options.parallel && registered.len() > 1 {
            self.compile_parallel(&registered, &registry, time)
        } else {
            registered
                .iter()
                .map(|(layer, classified)| self.compile_layer(layer, classified, &registry, time))
                .collect()
        };

        let mut manifest = Manifest::default();
        for plot in &visualization.plots {
            let entry = manifest.plots.entry(plot.name.clone()).or_default();
            entry.panels = plot.panels;
        }
        let mut warnings = Vec::new();
        for ((layer, _), result) in registered.iter().zip(results) {
            match result {
                Ok(compiled) => {
                    warnings.extend(compiled.warnings.into_iter().map(|message| ExportWarning {
                        layer: layer.classed.clone(),
                        message,
                    }));
                    manifest
                        .plots
                        .entry(layer.plot.name.clone())
                        .or_default()
                        .geoms
                        .push(layer.classed.clone());
                    manifest.geoms.insert(layer.classed.clone(), compiled.manifest);
                }
                Err(error) => failures.push(failure(&layer.classed, error)),
            }
        }

        let registry = registry.into_inner().map_err(|_| {
            AnimintError::InternalError("Selector registry lock was poisoned".to_string())
        })?;
        manifest.time = visualization.time.as_ref().map(|t| TimeManifest {
            variable: t.variable.clone(),
            ms: t.ms,
            sequence: registry.levels(&t.variable),
        });
        manifest.selectors = registry.into_descriptors();

        let json = manifest.to_json().map_err(|e| {
            AnimintError::WriterError(format!("Failed to serialize manifest: {}", e))
        })?;
        self.writer.write_artifact(MANIFEST_FILE, json.as_bytes())?;

        info!(
            "Exported {} layers ({} failed, {} warnings)",
            manifest.geoms.len(),
            failures.len(),
            warnings.len()
        );
        Ok(ExportReport {
            manifest,
            warnings,
            failures,
        })
    }

    /// Check every layer's selectors without compiling or writing anything
    pub fn validate(&self, visualization: &Visualization) -> Result<Vec<LayerFailure>> {
        let mut registry = new_registry(visualization)?;
        Ok(enumerate_layers(visualization)
            .into_iter()
            .filter_map(|layer| {
                register_layer(&mut registry, &layer)
                    .err()
                    .map(|error| failure(&layer.classed, error))
            })
            .collect())
    }

    fn compile_parallel(
        &self,
        layers: &[(LayerRef<'_>, Classified)],
        registry: &Mutex<SelectorRegistry>,
        time: Option<&str>,
    ) -> Vec<Result<CompiledLayer>> {
        layers
            .par_iter()
            .map(|(layer, classified)| self.compile_layer(layer, classified, registry, time))
            .collect()
    }

    fn compile_layer(
        &self,
        layer: &LayerRef<'_>,
        classified: &Classified,
        registry: &Mutex<SelectorRegistry>,
        time: Option<&str>,
    ) -> Result<CompiledLayer> {
        self.compile(layer, classified, registry, time)
            .map_err(|e| e.in_layer(&layer.classed))
    }

    fn compile(
        &self,
        layer: &LayerRef<'_>,
        classified: &Classified,
        registry: &Mutex<SelectorRegistry>,
        time: Option<&str>,
    ) -> Result<CompiledLayer> {
        let source = layer.layer;
        let plot = layer.plot;
        let classed = layer.classed.as_str();

        let mut params = source.params.clone();
        types::normalize_colour_params(&mut params);
        let mut data = source.data.clone();
        params::apply_array_params(&mut params, &mut data)?;

        let GeomData {
            geom,
            mut params,
            data,
            ..
        } = source.geom.pre_process(
            GeomData {
                geom: source.geom,
                mapping: source.mapping.clone(),
                params,
                data,
            },
            &plot.ranges,
        )?;

        let warnings =
            params::usage_warnings(geom, classified, &params, &source.stat, &source.position);
        for message in &warnings {
            warn!(layer = classed, "{}", message);
        }

        let mut data = clamp::clamp_to_ranges(data, &plot.ranges)?;
        if plot.panels <= 1 && has_column(&data, PANEL_COLUMN) {
            data = data.drop(PANEL_COLUMN)?;
        }
        let data = types::normalize_colour_columns(data)?;

        let grouped = source.mapping.contains(GROUP_COLUMN) && has_column(&data, GROUP_COLUMN);
        // Chunks are sized by the rows that survive NA re-grouping
        let complete;
        let sized = if grouped {
            complete = na::complete_rows(&data)?;
            &complete
        } else {
            &data
        };
        let candidates = plan::subset_vec(classified, time);
        let chunk_plan = {
            let registry = lock(registry)?;
            plan::plan_chunks(
                &candidates,
                params.get(CHUNK_VARS_PARAM),
                sized,
                &registry,
                self.options.min_chunk_bytes,
            )?
        };
        params.remove(CHUNK_VARS_PARAM);
        debug!(
            layer = classed,
            chunk = ?chunk_plan.chunk_columns(),
            nest = ?chunk_plan.nest_columns(),
            "Planned chunks"
        );

        let nest = nest_keys(
            &chunk_plan.nest_columns(),
            classified,
            plot,
            &data,
            geom.is_data_object() && grouped,
        );
        let chunk_columns = chunk_plan.chunk_columns();
        let mut key_columns = chunk_columns.clone();
        key_columns.extend(nest.iter().flat_map(NestKey::columns));
        if grouped && !key_columns.iter().any(|c| c == GROUP_COLUMN) {
            key_columns.push(GROUP_COLUMN.to_string());
        }

        let data = if grouped {
            na::split_na_groups(data, &key_columns)?
        } else {
            data
        };

        let partition = partition::partition(&data, classed, &chunk_columns, &nest)?;
        let common = common::extract_common(&data, &key_columns, partition.total())?;
        let common_columns = common.as_ref().map(|c| c.columns.clone()).unwrap_or_default();

        for chunk in &partition.chunks {
            let chunk_data = chunk.data.drop_many(common_columns.iter().map(|c| c.as_str()));
            self.writer.write_artifact(&chunk.name, &to_tsv(&chunk_data, true)?)?;
        }
        let common_name = match &common {
            Some(common) => {
                let name = naming::common_file(classed);
                self.writer.write_artifact(&name, &to_tsv(&common.data, true)?)?;
                Some(name)
            }
            None => None,
        };

        let chunk_order = chunk_plan.chunk_order();
        if !chunk_order.is_empty() {
            let label = naming::chunk_group_label(&chunk_order);
            let mut associated = chunk_order.clone();
            for name in pair_selectors(classified, &source.data)? {
                if !associated.contains(&name) {
                    associated.push(name);
                }
            }
            let mut registry = lock(registry)?;
            for name in &associated {
                registry.associate_chunk_group(name, &label);
            }
        }

        let varied = column_names(&data)
            .into_iter()
            .filter(|c| !common_columns.contains(c))
            .collect();
        let subset_order = chunk_plan
            .nest_columns()
            .into_iter()
            .chain(classified.show_selected.several.iter().map(|p| p.variable.clone()))
            .collect();

        info!(layer = classed, chunks = partition.total(), "Compiled layer");
        Ok(CompiledLayer {
            manifest: LayerManifest {
                geom: geom.name().to_string(),
                classed: classed.to_string(),
                plot: plot.name.clone(),
                aes: source.mapping.clone(),
                params,
                types: types::column_types(&data)?,
                subset_order,
                nest_order: nest.iter().map(NestKey::label).collect(),
                chunk_order,
                total: partition.total(),
                chunks: partition.index,
                columns: ColumnSets {
                    common: common_columns,
                    varied,
                },
                common: common_name,
                update_selectors: update_selectors(classified, &source.data)?,
            },
            warnings,
        })
    }
}

fn new_registry(visualization: &Visualization) -> Result<SelectorRegistry> {
    Ok(SelectorRegistry::with_declared_types(&visualization.selector_types)?
        .with_first(visualization.first.clone())
        .with_duration(visualization.duration.clone()))
}

fn lock(registry: &Mutex<SelectorRegistry>) -> Result<MutexGuard<'_, SelectorRegistry>> {
    registry
        .lock()
        .map_err(|_| AnimintError::InternalError("Selector registry lock was poisoned".to_string()))
}

fn failure(classed: &str, error: AnimintError) -> LayerFailure {
    let error = error.in_layer(classed);
    warn!("{}", error);
    LayerFailure {
        layer: classed.to_string(),
        error,
    }
}

/// Every layer with its classed name; layers are numbered across plots from 1
fn enumerate_layers(visualization: &Visualization) -> Vec<LayerRef<'_>> {
    visualization
        .plots
        .iter()
        .flat_map(|plot| plot.layers.iter().map(move |layer| (plot, layer)))
        .enumerate()
        .map(|(i, (plot, layer))| LayerRef {
            classed: naming::classed(i + 1, layer.geom.name(), &plot.name),
            plot,
            layer,
        })
        .collect()
}

/// Classify a layer and merge its selector references into the registry
fn register_layer(registry: &mut SelectorRegistry, layer: &LayerRef<'_>) -> Result<Classified> {
    let source = layer.layer;
    let classified = classify(&source.mapping)?;
    let declared = source
        .selector_types
        .iter()
        .map(|(name, kind)| Ok((name.clone(), kind.parse::<SelectorType>()?)))
        .collect::<Result<BTreeMap<_, _>>>()?;
    let references = selector_references(&classified, &source.data)?;

    for reference in &references {
        registry.check_reference(&reference.name, declared.get(&reference.name).copied())?;
    }
    for reference in references {
        registry.register_reference(
            &reference.name,
            reference.click,
            reference.show,
            declared.get(&reference.name).copied(),
        )?;
        registry.record_values(&reference.name, &layer.classed, reference.values);
        registry.associate_layer(&reference.name, &layer.classed);
    }
    Ok(classified)
}

/// Selectors a layer references, with the values it shows for each
fn selector_references(
    classified: &Classified,
    data: &DataFrame,
) -> Result<Vec<SelectorReference>> {
    let mut references: Vec<SelectorReference> = Vec::new();
    let mut add = |name: &str, click: bool, mut values: Vec<String>| {
        match references.iter_mut().find(|r| r.name == name) {
            Some(existing) => {
                existing.click |= click;
                existing.show |= !click;
                values.append(&mut existing.values);
            }
            None => references.push(SelectorReference {
                name: name.to_string(),
                click,
                show: !click,
                values: Vec::new(),
            }),
        }
        values.sort_by(|a, b| compare_keys(a, b));
        values.dedup();
        if let Some(reference) = references.iter_mut().find(|r| r.name == name) {
            reference.values = values;
        }
    };

    for (group, click) in [(&classified.click_selects, true), (&classified.show_selected, false)] {
        for one in &group.one {
            add(&one.selector, click, distinct_keys(data, &one.aesthetic)?);
        }
        for pair in &group.several {
            for (name, values) in pair_values(data, &pair.variable, &pair.value)? {
                add(&name, click, values);
            }
        }
    }
    Ok(references)
}

/// Values of a `.value` column grouped by the selector named in `.variable`
fn pair_values(
    data: &DataFrame,
    variable: &str,
    value: &str,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut by_selector: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in column_keys(data, variable)?
        .into_iter()
        .zip(column_keys(data, value)?)
    {
        if let (Some(name), Some(value)) = (name, value) {
            by_selector.entry(name).or_default().push(value);
        }
    }
    Ok(by_selector)
}

/// Selectors named by the values of the layer's `.variable` columns
fn pair_selectors(classified: &Classified, data: &DataFrame) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for pair in classified
        .click_selects
        .several
        .iter()
        .chain(&classified.show_selected.several)
    {
        for name in distinct_keys(data, &pair.variable)? {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Selectors changed by clicking the layer's marks
fn update_selectors(classified: &Classified, data: &DataFrame) -> Result<Vec<String>> {
    let mut names: Vec<String> = classified
        .click_selects
        .one
        .iter()
        .map(|s| s.selector.clone())
        .collect();
    for pair in &classified.click_selects.several {
        for name in distinct_keys(data, &pair.variable)? {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Nest levels of a layer: nest columns, panel, pairs, then group
fn nest_keys(
    nest_columns: &[String],
    classified: &Classified,
    plot: &Plot,
    data: &DataFrame,
    nest_group: bool,
) -> Vec<NestKey> {
    let mut keys: Vec<NestKey> = nest_columns.iter().cloned().map(NestKey::Column).collect();
    if plot.panels > 1 && has_column(data, PANEL_COLUMN) {
        keys.push(NestKey::Column(PANEL_COLUMN.to_string()));
    }
    keys.extend(classified.show_selected.several.iter().map(|pair| NestKey::Pair {
        variable: pair.variable.clone(),
        value: pair.value.clone(),
    }));
    if nest_group {
        keys.push(NestKey::Column(GROUP_COLUMN.to_string()));
    }
    keys
}
