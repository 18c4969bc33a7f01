use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing_subscriber::fmt::SubscriberBuilder;

use space_syntax::analysis::{Analysis, AnalysisResult, AngularAnalysis, MetricAnalysis, SegmentAnalysis, VisualAnalysis};
use space_syntax::axial::allline::make_all_line_map;
use space_syntax::axial::reduce_fewest_line;
use space_syntax::comm::NullCommunicator;
use space_syntax::grid::{build_visibility, PointMap};
use space_syntax::traversal::segment::write_segment_columns;
use space_syntax::Vec2;

mod provenance;
mod run_spec;

use run_spec::{AnalysisSpec, RunSpec};

#[derive(Parser)]
#[command(name = "space_syntax_cli")]
#[command(about = "Spatial network analysis over architectural floor plans")]
struct Cmd {
    /// Optional VK ticket UUID; logged with tracing spans for easy correlation
    #[arg(long)]
    vk: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Build a visibility/axial/segment map from a run-spec and run the
    /// configured analyses, writing the merged attribute table as JSON.
    Analyze {
        #[arg(long)]
        config: String,
        #[arg(long)]
        out: String,
    },
    /// Print a small provenance JSON block.
    Report,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Analyze { config, out } => analyze(config, out, cmd.vk),
        Action::Report => report(cmd.vk),
    }
}

fn analyze(config: String, out: String, vk: Option<String>) -> Result<()> {
    tracing::info!(config, out, vk = ?vk, "analyze");
    let text = std::fs::read_to_string(&config).with_context(|| format!("reading {config}"))?;
    let spec: RunSpec = serde_json::from_str(&text).with_context(|| format!("parsing {config}"))?;

    let region = spec.region.to_region();
    let mut map = PointMap::new(region, spec.spacing).context("constructing PointMap")?;
    map.fill_region(&region);

    let walls: Vec<_> = spec.walls.iter().map(|w| w.to_line()).collect();
    let comm = NullCommunicator;
    build_visibility(&mut map, &walls, &comm).context("building visibility graph")?;
    tracing::info!(open_cells = map.open_cells().count(), "visibility graph built");

    let needs_segments = spec.analyses.iter().any(|a| matches!(a, AnalysisSpec::Segment { .. }));
    let mut segment_graph = if needs_segments {
        let [sx, sy] = spec
            .axial_seed
            .context("axial_seed is required when analyses include a segment entry")?;
        let all_line = make_all_line_map(&map, &walls, Vec2::new(sx, sy), &comm).context("building all-line map")?;
        let reduced = reduce_fewest_line(&all_line, 1e-9);
        tracing::info!(vital = reduced.vital.len(), "fewest-line reduction complete");
        Some(reduced.minimal.to_segment_graph(1e-9))
    } else {
        None
    };

    let mut grid_columns = Vec::new();
    let mut segment_columns: Vec<String> = Vec::new();

    for entry in &spec.analyses {
        match entry {
            AnalysisSpec::Visual { radius, parallel } => {
                let a = VisualAnalysis {
                    map: &map,
                    radius: radius.to_radius(),
                    parallel: *parallel,
                };
                tracing::info!(name = %a.name(), "running analysis");
                if let AnalysisResult::Grid(bundle) = a.run(&comm)? {
                    grid_columns.extend(bundle.columns.clone());
                    bundle.merge_into(&mut map.attributes);
                }
            }
            AnalysisSpec::Metric { radius, parallel } => {
                let a = MetricAnalysis {
                    map: &map,
                    radius: radius.to_radius(),
                    parallel: *parallel,
                };
                tracing::info!(name = %a.name(), "running analysis");
                if let AnalysisResult::Grid(bundle) = a.run(&comm)? {
                    grid_columns.extend(bundle.columns.clone());
                    bundle.merge_into(&mut map.attributes);
                }
            }
            AnalysisSpec::Angular { radius, tulip_bins, parallel } => {
                let a = AngularAnalysis {
                    map: &map,
                    tulip_bins: *tulip_bins,
                    radius: radius.to_radius(),
                    parallel: *parallel,
                };
                tracing::info!(name = %a.name(), "running analysis");
                if let AnalysisResult::Grid(bundle) = a.run(&comm)? {
                    grid_columns.extend(bundle.columns.clone());
                    bundle.merge_into(&mut map.attributes);
                }
            }
            AnalysisSpec::Segment {
                metric,
                radius,
                tulip_bins,
                weight_col,
            } => {
                let graph = segment_graph
                    .as_mut()
                    .expect("segment_graph built above whenever analyses includes a segment entry");
                let a = SegmentAnalysis {
                    graph,
                    metric: metric.to_metric(),
                    tulip_bins: *tulip_bins,
                    radius: radius.to_radius(),
                    weight_col: weight_col.as_deref(),
                };
                tracing::info!(name = %a.name(), "running analysis");
                if let AnalysisResult::Segment(seg_result) = a.run(&comm)? {
                    let has_weighted_choice = seg_result.weighted_choice.is_some();
                    write_segment_columns(graph, *tulip_bins, radius.to_radius(), weight_col.as_deref(), &seg_result);
                    let weight_part = weight_col.as_deref().map(|w| format!(" {w}")).unwrap_or_default();
                    let prefix = format!("T{tulip_bins}{weight_part} {}", radius.to_radius().suffix());
                    segment_columns.push(format!("{prefix} Node Count"));
                    segment_columns.push(format!("{prefix} Total Depth"));
                    segment_columns.push(format!("{prefix} Mean Depth"));
                    segment_columns.push(format!("{prefix} Integration"));
                    segment_columns.push(format!("{prefix} Choice"));
                    if has_weighted_choice {
                        segment_columns.push(format!("{prefix} Weighted Choice"));
                    }
                }
            }
        }
    }

    let grid_json = attribute_table_to_json(&map.attributes, |p| format!("{},{}", p.x, p.y));
    let segment_json = segment_graph
        .as_ref()
        .map(|g| attribute_table_to_json(&g.map.attributes, |r: i32| r.to_string()));

    let out_path = Path::new(&out);
    write_output(out_path, &grid_json, segment_json.as_ref())?;

    provenance::write_sidecar(
        out_path,
        provenance::Payload::new(json!({
            "config": config,
            "grid_columns": grid_columns,
            "segment_columns": segment_columns,
        })),
    )?;

    Ok(())
}

/// Flattens an `AttributeTable` into a JSON object keyed by `key_fmt(row
/// key)`, each value an object of column name to `f64` (written as a
/// JSON number, or `null` for `NaN` since JSON has no NaN literal).
fn attribute_table_to_json<K: Copy + Eq + std::hash::Hash>(
    table: &space_syntax::attribute::AttributeTable<K>,
    key_fmt: impl Fn(K) -> String,
) -> Value {
    let columns: Vec<&str> = (0..table.column_count()).filter_map(|i| table.column_name(i)).collect();
    let mut rows = Map::new();
    for (key, row) in table.rows() {
        let mut obj = Map::new();
        for (i, name) in columns.iter().enumerate() {
            let v = row.get(i);
            obj.insert((*name).to_string(), if v.is_nan() { Value::Null } else { json!(v) });
        }
        rows.insert(key_fmt(key), Value::Object(obj));
    }
    Value::Object(rows)
}

fn write_output(out_path: &Path, grid: &Value, segment: Option<&Value>) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let doc = json!({
        "grid": grid,
        "segments": segment,
    });
    std::fs::write(out_path, serde_json::to_vec_pretty(&doc)?).with_context(|| format!("writing {}", out_path.display()))?;
    Ok(())
}

fn report(vk: Option<String>) -> Result<()> {
    let obj = json!({
        "code_rev": provenance::current_git_rev(),
        "vk": vk,
        "space_syntax_version": space_syntax::VERSION,
        "params": {},
        "outputs": []
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}
