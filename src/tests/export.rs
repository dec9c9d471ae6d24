//! End-to-end exports of small visualizations

use animint::{
    AnimintError, DataFrame, DirectoryWriter, ExportOptions, ExportReport, Exporter, GeomKind,
    Layer, MemoryWriter, Node, PanelRange, ParameterValue, Plot, Visualization,
};
use polars::prelude::*;

fn export(visualization: &Visualization, options: ExportOptions) -> (ExportReport, MemoryWriter) {
    let writer = MemoryWriter::new();
    let report = Exporter::new(options, &writer).export(visualization).unwrap();
    (report, writer)
}

/// Header and rows of a TSV artifact
fn read_tsv(writer: &MemoryWriter, name: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let text = writer
        .get_string(name)
        .unwrap_or_else(|| panic!("missing artifact {}", name));
    let mut lines = text.lines();
    let header = lines
        .next()
        .unwrap()
        .split('\t')
        .map(|s| s.to_string())
        .collect();
    let rows = lines
        .map(|line| line.split('\t').map(|s| s.to_string()).collect())
        .collect();
    (header, rows)
}

fn tsv_column(writer: &MemoryWriter, name: &str, column: &str) -> Vec<String> {
    let (header, rows) = read_tsv(writer, name);
    let i = header.iter().position(|h| h == column).unwrap();
    rows.into_iter().map(|row| row[i].clone()).collect()
}

/// `years` years of `rows_per_year` rows, each row padded to about `width` bytes
fn yearly(years: i64, rows_per_year: usize, width: usize) -> DataFrame {
    let mut year = Vec::new();
    let mut x = Vec::new();
    let mut label = Vec::new();
    for y in 0..years {
        for i in 0..rows_per_year {
            year.push(2000 + y);
            x.push((y as usize * rows_per_year + i) as f64);
            label.push(format!("{}{}", i, "z".repeat(width)));
        }
    }
    df! { "x" => x, "showSelected" => year, "label" => label }.unwrap()
}

fn year_layer(data: DataFrame) -> Layer {
    Layer::new(GeomKind::Point, data)
        .with_aesthetic("x", "gdp")
        .with_aesthetic("showSelected", "year")
        .with_aesthetic("label", "country")
}

#[test]
fn test_large_years_get_one_chunk_each() {
    let plot = Plot::new("scatter").with_layer(year_layer(yearly(11, 100, 500)));
    let visualization = Visualization::new().with_plot(plot);
    let (report, writer) = export(&visualization, ExportOptions::default());

    assert!(report.is_success(), "{:?}", report.failures);
    let layer = &report.manifest.geoms["geom1_point_scatter"];
    assert_eq!(layer.chunk_order, vec!["year"]);
    assert_eq!(layer.total, 11);
    assert!(layer.common.is_none());
    assert!(layer.nest_order.is_empty());

    let chunks: Vec<String> = writer
        .names()
        .into_iter()
        .filter(|n| n.ends_with(".tsv"))
        .collect();
    assert_eq!(chunks.len(), 11);
    assert_eq!(
        layer.chunks.get(&["2003"]),
        Some(&Node::Leaf("geom1_point_scatter_chunk4.tsv".to_string()))
    );
    assert_eq!(
        tsv_column(&writer, "geom1_point_scatter_chunk4.tsv", "showSelected"),
        vec!["2003".to_string(); 100]
    );

    let year = &report.manifest.selectors["year"];
    assert_eq!(year.chunks, vec!["year"]);
    assert_eq!(year.levels.len(), 11);
    assert_eq!(year.selected, vec!["2000"]);
    assert!(year.show && !year.click);
}

#[test]
fn test_small_years_are_nested_in_one_file() {
    let plot = Plot::new("scatter").with_layer(year_layer(yearly(11, 2, 10)));
    let visualization = Visualization::new().with_plot(plot);
    let (report, writer) = export(&visualization, ExportOptions::default());

    let layer = &report.manifest.geoms["geom1_point_scatter"];
    assert!(layer.chunk_order.is_empty());
    assert_eq!(layer.nest_order, vec!["showSelected"]);
    assert_eq!(layer.subset_order, vec!["showSelected"]);
    assert_eq!(layer.total, 1);
    assert_eq!(
        layer.chunks,
        Node::Leaf("geom1_point_scatter_chunk1.tsv".to_string())
    );
    assert_eq!(read_tsv(&writer, "geom1_point_scatter_chunk1.tsv").1.len(), 22);
    assert!(report.manifest.selectors["year"].chunks.is_empty());
}

#[test]
fn test_variable_value_pair_registers_selectors() {
    let data = df! {
        "x" => &[1.0, 2.0, 3.0, 4.0],
        "clickSelects.variable" => &["a", "b", "a", "b"],
        "clickSelects.value" => &["1", "2", "3", "4"],
    }
    .unwrap();
    let layer = Layer::new(GeomKind::Point, data)
        .with_aesthetic("x", "score")
        .with_aesthetic("clickSelects.variable", "metric")
        .with_aesthetic("clickSelects.value", "score");
    let visualization = Visualization::new().with_plot(Plot::new("p").with_layer(layer));
    let (report, _) = export(&visualization, ExportOptions::default());

    let selectors = &report.manifest.selectors;
    assert_eq!(selectors.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(selectors["a"].levels, vec!["1", "3"]);
    assert_eq!(selectors["b"].layers, vec!["geom1_point_p"]);
    assert!(selectors["b"].click);
    assert_eq!(
        report.manifest.geoms["geom1_point_p"].update_selectors,
        vec!["a", "b"]
    );
}

#[test]
fn test_path_gap_splits_group() {
    let y: Vec<Option<f64>> = (1..=10)
        .map(|i| if i == 5 { None } else { Some(i as f64 * 2.0) })
        .collect();
    let data = df! {
        "x" => (1..=10).map(|i| i as f64).collect::<Vec<_>>(),
        "y" => y,
        "group" => vec![1i64; 10],
    }
    .unwrap();
    let layer = Layer::new(GeomKind::Path, data)
        .with_aesthetic("x", "t")
        .with_aesthetic("y", "v")
        .with_aesthetic("group", "id");
    let visualization = Visualization::new().with_plot(Plot::new("ts").with_layer(layer));
    let (report, writer) = export(&visualization, ExportOptions::default());

    let layer = &report.manifest.geoms["geom1_path_ts"];
    assert_eq!(layer.nest_order, vec!["group"]);
    let groups = tsv_column(&writer, "geom1_path_ts_chunk1.tsv", "group");
    assert_eq!(groups, vec!["0", "0", "0", "0", "1", "1", "1", "1", "1"]);
    let x = tsv_column(&writer, "geom1_path_ts_chunk1.tsv", "x");
    assert!(!x.iter().any(|v| v.parse::<f64>().unwrap() == 5.0));
}

#[test]
fn test_empty_column_does_not_drop_rows() {
    let data = df! {
        "x" => (1..=10).map(|i| i as f64).collect::<Vec<_>>(),
        "y" => (1..=10).map(|i| i as f64 * 2.0).collect::<Vec<_>>(),
        "alpha" => vec![None::<f64>; 10],
        "group" => vec![1i64; 10],
    }
    .unwrap();
    let layer = Layer::new(GeomKind::Line, data)
        .with_aesthetic("x", "t")
        .with_aesthetic("y", "v")
        .with_aesthetic("group", "id");
    let visualization = Visualization::new().with_plot(Plot::new("ts").with_layer(layer));
    let (report, writer) = export(&visualization, ExportOptions::default());

    let layer = &report.manifest.geoms["geom1_line_ts"];
    assert_eq!(layer.total, 1);
    let groups = tsv_column(&writer, "geom1_line_ts_chunk1.tsv", "group");
    assert_eq!(groups, vec!["1"; 10]);
}

#[test]
fn test_chunks_are_sized_after_dropping_gaps() {
    // Two years of 100 rows; 90 of the second year's rows have no y
    let mut year = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut label = Vec::new();
    for i in 0..200usize {
        let second = i >= 100;
        year.push(if second { 2001i64 } else { 2000 });
        x.push(i as f64);
        y.push(if second && i % 10 != 0 { None } else { Some(i as f64) });
        label.push(format!("{}{}", i, "z".repeat(60)));
    }
    let data = df! {
        "x" => x,
        "y" => y,
        "showSelected" => year.clone(),
        "group" => year,
        "label" => label,
    }
    .unwrap();
    let layer = Layer::new(GeomKind::Line, data)
        .with_aesthetic("x", "t")
        .with_aesthetic("y", "v")
        .with_aesthetic("showSelected", "year")
        .with_aesthetic("group", "year")
        .with_aesthetic("label", "name");
    let visualization = Visualization::new().with_plot(Plot::new("ts").with_layer(layer));
    let (report, writer) = export(&visualization, ExportOptions::default());

    assert!(report.is_success(), "{:?}", report.failures);
    let layer = &report.manifest.geoms["geom1_line_ts"];
    assert!(layer.chunk_order.is_empty());
    assert_eq!(layer.nest_order, vec!["showSelected", "group"]);
    assert_eq!(read_tsv(&writer, "geom1_line_ts_chunk1.tsv").1.len(), 110);
}

#[test]
fn test_panels_are_nested_but_not_selectable() {
    let data = df! {
        "x" => &[1.0, 2.0, 3.0, 4.0],
        "y" => &[1.0, 2.0, 3.0, 4.0],
        "showSelected" => &[2000i64, 2001, 2000, 2001],
        "PANEL" => &[1i64, 1, 2, 2],
    }
    .unwrap();
    let layer = Layer::new(GeomKind::Point, data)
        .with_aesthetic("x", "a")
        .with_aesthetic("y", "b")
        .with_aesthetic("showSelected", "year");
    let plot = Plot::new("facets")
        .with_range(PanelRange::new((0.0, 10.0), (0.0, 10.0)))
        .with_range(PanelRange::new((0.0, 10.0), (0.0, 10.0)))
        .with_layer(layer);
    let (report, _) = export(&Visualization::new().with_plot(plot), ExportOptions::default());

    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.manifest.plots["facets"].panels, 2);
    let layer = &report.manifest.geoms["geom1_point_facets"];
    assert_eq!(layer.nest_order, vec!["showSelected", "PANEL"]);
    assert_eq!(layer.subset_order, vec!["showSelected"]);
}

#[test]
fn test_show_selected_pair_orders() {
    let data = df! {
        "x" => &[1.0, 2.0, 3.0, 4.0],
        "showSelected.variable" => &["a", "b", "a", "b"],
        "showSelected.value" => &["1", "2", "3", "4"],
    }
    .unwrap();
    let layer = Layer::new(GeomKind::Point, data)
        .with_aesthetic("x", "score")
        .with_aesthetic("showSelected.variable", "metric")
        .with_aesthetic("showSelected.value", "score");
    let visualization = Visualization::new().with_plot(Plot::new("p").with_layer(layer));
    let (report, _) = export(&visualization, ExportOptions::default());

    let layer = &report.manifest.geoms["geom1_point_p"];
    assert_eq!(
        layer.nest_order,
        vec!["showSelected.variable showSelected.value"]
    );
    assert_eq!(layer.subset_order, vec!["showSelected.variable"]);
}

#[test]
fn test_group_is_not_nested_for_points() {
    let data = df! {
        "x" => &[1.0, 2.0, 3.0],
        "y" => &[1.0, 2.0, 3.0],
        "group" => &[1i64, 2, 2],
    }
    .unwrap();
    let layer = Layer::new(GeomKind::Point, data)
        .with_aesthetic("x", "a")
        .with_aesthetic("y", "b")
        .with_aesthetic("group", "id");
    let visualization = Visualization::new().with_plot(Plot::new("p").with_layer(layer));
    let (report, _) = export(&visualization, ExportOptions::default());

    let layer = &report.manifest.geoms["geom1_point_p"];
    assert!(!layer.nest_order.contains(&"group".to_string()));
    assert!(layer.nest_order.is_empty());
}

#[test]
fn test_pair_selectors_join_the_chunk_group() {
    let mut data = yearly(11, 100, 500);
    let n = data.height();
    data.with_column(Series::new(
        "clickSelects.variable".into(),
        (0..n).map(|i| if i % 2 == 0 { "a" } else { "b" }).collect::<Vec<_>>(),
    ))
    .unwrap();
    data.with_column(Series::new(
        "clickSelects.value".into(),
        (0..n).map(|i| (i % 3).to_string()).collect::<Vec<_>>(),
    ))
    .unwrap();
    let layer = year_layer(data)
        .with_aesthetic("clickSelects.variable", "metric")
        .with_aesthetic("clickSelects.value", "score");
    let visualization = Visualization::new().with_plot(Plot::new("p").with_layer(layer));
    let (report, _) = export(&visualization, ExportOptions::default());

    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.manifest.geoms["geom1_point_p"].chunk_order, vec!["year"]);
    let selectors = &report.manifest.selectors;
    assert_eq!(selectors["a"].chunks, vec!["year"]);
    assert_eq!(selectors["b"].chunks, vec!["year"]);
    assert_eq!(selectors["year"].chunks, vec!["year"]);
}

#[test]
fn test_infinite_position_is_clamped() {
    let data = df! { "x" => &[f64::INFINITY, 50.0], "y" => &[1.0, 2.0] }.unwrap();
    let layer = Layer::new(GeomKind::Point, data)
        .with_aesthetic("x", "a")
        .with_aesthetic("y", "b");
    let plot = Plot::new("p")
        .with_range(PanelRange::new((0.0, 100.0), (0.0, 10.0)))
        .with_layer(layer);
    let (report, writer) = export(&Visualization::new().with_plot(plot), ExportOptions::default());

    assert!(report.is_success());
    let x: Vec<f64> = tsv_column(&writer, "geom1_point_p_chunk1.tsv", "x")
        .iter()
        .map(|v| v.parse().unwrap())
        .collect();
    assert_eq!(x, vec![100.0, 50.0]);
}

#[test]
fn test_common_columns_rejoin_chunks() {
    let mut data = yearly(3, 100, 200);
    data.with_column(Series::new("colour".into(), vec!["red"; 300]))
        .unwrap();
    let visualization =
        Visualization::new().with_plot(Plot::new("scatter").with_layer(year_layer(data.clone())));
    let (report, writer) = export(&visualization, ExportOptions::default());

    let layer = &report.manifest.geoms["geom1_point_scatter"];
    assert_eq!(layer.total, 3);
    assert_eq!(
        layer.common.as_deref(),
        Some("geom1_point_scatter_chunk_common.tsv")
    );
    // Points fill with their colour, so both are shared
    assert_eq!(layer.columns.common, vec!["colour", "fill"]);
    assert_eq!(layer.types["colour"], "rgb");

    let (header, rows) = read_tsv(&writer, "geom1_point_scatter_chunk_common.tsv");
    assert_eq!(header, vec!["colour", "fill"]);
    assert_eq!(rows, vec![vec!["#ff0000".to_string(), "#ff0000".to_string()]]);

    // Chunks hold every row exactly once and no common column
    let mut xs: Vec<f64> = Vec::new();
    for n in 1..=3 {
        let name = format!("geom1_point_scatter_chunk{}.tsv", n);
        let (header, _) = read_tsv(&writer, &name);
        assert!(!header.contains(&"colour".to_string()));
        xs.extend(
            tsv_column(&writer, &name, "x")
                .iter()
                .map(|v| v.parse::<f64>().unwrap()),
        );
    }
    xs.sort_by(|a, b| a.total_cmp(b));
    let expected: Vec<f64> = (0..300).map(|i| i as f64).collect();
    assert_eq!(xs, expected);
}

#[test]
fn test_export_is_idempotent() {
    let visualization = Visualization::new()
        .with_plot(Plot::new("scatter").with_layer(year_layer(yearly(4, 50, 300))))
        .with_time("year", 1000);

    let (first, first_writer) = export(&visualization, ExportOptions::default());
    let (second, second_writer) = export(&visualization, ExportOptions::default());

    assert_eq!(first.manifest, second.manifest);
    assert_eq!(first_writer.into_artifacts(), second_writer.into_artifacts());
    let time = first.manifest.time.unwrap();
    assert_eq!(time.sequence, vec!["2000", "2001", "2002", "2003"]);
}

#[test]
fn test_parallel_matches_sequential() {
    let mut scatter = Plot::new("scatter");
    for years in 2..6 {
        scatter = scatter.with_layer(year_layer(yearly(years, 40, 150)));
    }
    let visualization = Visualization::new()
        .with_plot(scatter)
        .with_plot(Plot::new("small").with_layer(year_layer(yearly(3, 1, 5))));

    let (sequential, sequential_writer) = export(&visualization, ExportOptions::default());
    let (parallel, parallel_writer) = export(
        &visualization,
        ExportOptions {
            parallel: true,
            ..ExportOptions::default()
        },
    );

    assert_eq!(sequential.manifest, parallel.manifest);
    assert_eq!(
        sequential_writer.into_artifacts(),
        parallel_writer.into_artifacts()
    );
    assert_eq!(parallel.manifest.plots["scatter"].geoms.len(), 4);
}

#[test]
fn test_type_conflict_fails_only_its_layer() {
    let first = year_layer(yearly(2, 2, 5)).with_selector_type("year", "single");
    let second = year_layer(yearly(2, 2, 5)).with_selector_type("year", "multiple");
    let visualization =
        Visualization::new().with_plot(Plot::new("p").with_layer(first).with_layer(second));
    let (report, _) = export(&visualization, ExportOptions::default());

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].layer, "geom2_point_p");
    assert!(matches!(
        report.failures[0].error.root(),
        AnimintError::ConfigurationError(_)
    ));
    assert!(report.manifest.geoms.contains_key("geom1_point_p"));
    assert_eq!(report.manifest.selectors["year"].layers, vec!["geom1_point_p"]);
}

#[test]
fn test_bad_chunk_vars_fail_their_layer() {
    let good = year_layer(yearly(2, 2, 5));
    let bad = year_layer(yearly(2, 2, 5)).with_param("chunk_vars", ParameterValue::Number(1.0));
    let unknown = year_layer(yearly(2, 2, 5)).with_param("chunk_vars", "country");
    let visualization = Visualization::new().with_plot(
        Plot::new("p")
            .with_layer(good)
            .with_layer(bad)
            .with_layer(unknown),
    );
    let (report, _) = export(&visualization, ExportOptions::default());

    let failed: Vec<&str> = report.failures.iter().map(|f| f.layer.as_str()).collect();
    assert_eq!(failed, vec!["geom2_point_p", "geom3_point_p"]);
    assert!(report.failures[1].error.to_string().contains("country"));
    assert_eq!(report.manifest.plots["p"].geoms, vec!["geom1_point_p"]);
}

#[test]
fn test_explicit_chunk_vars_override_size() {
    let layer = year_layer(yearly(3, 2, 5)).with_param("chunk_vars", "year");
    let visualization = Visualization::new().with_plot(Plot::new("p").with_layer(layer));
    let (report, writer) = export(&visualization, ExportOptions::default());

    let layer = &report.manifest.geoms["geom1_point_p"];
    assert_eq!(layer.chunk_order, vec!["year"]);
    assert_eq!(layer.total, 3);
    assert!(writer.get("geom1_point_p_chunk3.tsv").is_some());
    assert!(!layer.params.contains_key("chunk_vars"));
}

#[test]
fn test_warnings_are_reported() {
    let layer = year_layer(yearly(2, 2, 5))
        .with_stat("bin")
        .with_param("alpha_off", 0.5);
    let visualization = Visualization::new().with_plot(Plot::new("p").with_layer(layer));
    let (report, _) = export(&visualization, ExportOptions::default());

    assert!(report.is_success());
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings.iter().all(|w| w.layer == "geom1_point_p"));
}

#[test]
fn test_directory_export_writes_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let writer = DirectoryWriter::new(dir.path()).unwrap();
    let plot = Plot::new("scatter").with_layer(year_layer(yearly(2, 3, 5)));
    let visualization = Visualization::new().with_plot(plot);
    let report = Exporter::new(ExportOptions::default(), &writer)
        .export(&visualization)
        .unwrap();
    assert!(report.is_success());

    let json = std::fs::read_to_string(dir.path().join("plot.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        manifest["geoms"]["geom1_point_scatter"]["chunks"],
        serde_json::json!("geom1_point_scatter_chunk1.tsv")
    );
    assert_eq!(manifest["plots"]["scatter"]["panels"], serde_json::json!(1));
    assert_eq!(manifest["selectors"]["year"]["type"], serde_json::json!("single"));
    assert!(dir.path().join("geom1_point_scatter_chunk1.tsv").exists());
}
