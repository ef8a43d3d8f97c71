//! End-to-end tests over a job-output tree built in a temp directory:
//! summary tables, hosting capacity, impact files and upgrade costs.

use disco_core::costs::{aggregate_costs, load_all_upgrades, load_unit_costs, RatedCost, UnitCostDatabase};
use disco_core::costs::{EquipmentType, UpgradeAction};
use disco_core::error::DiscoError;
use disco_core::loaders::load_tables_dir;
use disco_core::thresholds::builtin::load_preset;
use disco_core::{
    compute_hosting_capacity, compute_upgrade_costs, make_summary_tables, writers, HostingCapacityOptions,
};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

fn unit_costs_fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/unit_costs.xlsx")
}

const THERMAL_PASS: &str = "\
time_point,line_max_instantaneous_loading_pct,transformer_max_instantaneous_loading_pct
t1,50,40
t2,80,60
";

const THERMAL_FAIL: &str = "\
time_point,line_max_instantaneous_loading_pct,transformer_max_instantaneous_loading_pct
t1,50,40
t2,120,60
";

const VOLTAGE_PASS: &str = "\
time_point,node_type,min_voltage,max_voltage
t1,primaries,0.98,1.02
t1,secondaries,0.96,1.03
t2,primaries,0.99,1.01
";

const VOLTAGE_SECONDARY_FAIL: &str = "\
time_point,node_type,min_voltage,max_voltage
t1,primaries,0.98,1.02
t1,secondaries,0.93,1.03
t2,primaries,0.99,1.01
";

fn write_job(root: &Path, sample: u32, penetration: u32, thermal: &str, voltage: &str) {
    let dir = root
        .join("job-outputs")
        .join(format!("f1__random__{sample}__{penetration}"));
    fs::create_dir_all(&dir).unwrap();
    let metadata = format!(
        r#"{{"feeder": "f1", "substation": "s1", "placement": "random", "sample": {sample},
            "penetration_level": {penetration}, "scenario": "pf1",
            "pv_capacity_kw": {pv}, "load_capacity_kw": 1000.0}}"#,
        pv = penetration * 10
    );
    fs::write(dir.join("job_metadata.json"), metadata).unwrap();
    fs::write(dir.join("thermal_metrics.csv"), thermal).unwrap();
    fs::write(dir.join("voltage_metrics.csv"), voltage).unwrap();
}

/// Sample 1 fails thermal at 20% only; sample 2 fails voltage on secondaries at 30%.
fn build_batch(root: &Path) {
    for sample in [1, 2] {
        for penetration in [10, 20, 30] {
            let thermal = if sample == 1 && penetration == 20 {
                THERMAL_FAIL
            } else {
                THERMAL_PASS
            };
            let voltage = if sample == 2 && penetration == 30 {
                VOLTAGE_SECONDARY_FAIL
            } else {
                VOLTAGE_PASS
            };
            write_job(root, sample, penetration, thermal, voltage);
        }
    }
}

fn tables_dir(root: &Path) -> PathBuf {
    let tables = make_summary_tables(root, 2).unwrap();
    let out = root.join("tables");
    writers::prepare_output_dir(&out, false).unwrap();
    writers::write_summary_tables(&tables, &out).unwrap();
    out
}

// ---------------------------------------------------------------------------
// Test 1: Summary tables survive a write/read cycle with dimension columns
// ---------------------------------------------------------------------------
#[test]
fn summary_tables_written_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    build_batch(dir.path());
    let out = tables_dir(dir.path());

    assert!(out.join("thermal_metrics_table.csv").is_file());
    assert!(out.join("voltage_metrics_table.csv").is_file());
    assert!(out.join("metadata_table.csv").is_file());

    let tables = load_tables_dir(&out).unwrap();
    let voltage = &tables.metrics["voltage"];
    assert!(voltage.has_time_point);
    assert!(voltage.has_node_type);
    assert_eq!(voltage.rows.len(), 18);
    assert_eq!(tables.metrics["thermal"].rows.len(), 12);
    assert_eq!(tables.metadata.len(), 6);
    assert_eq!(tables.metadata[0].sample, "1");
}

// ---------------------------------------------------------------------------
// Test 2: Hosting capacity per class and overall with the snapshot preset
// ---------------------------------------------------------------------------
#[test]
fn hosting_capacity_with_non_monotonic_violations() {
    let dir = tempfile::tempdir().unwrap();
    build_batch(dir.path());
    let tables = load_tables_dir(&tables_dir(dir.path())).unwrap();
    let thresholds = load_preset("snapshot").unwrap();

    let analysis =
        compute_hosting_capacity(&tables, &thresholds, &HostingCapacityOptions::default()).unwrap();
    let report = &analysis.report;

    let thermal = &report.classes[0];
    assert_eq!(thermal.metric_class, "thermal");
    let f1 = &thermal.feeders[0];
    assert_eq!(f1.violation_starting_penetration, Some(20.0));
    assert_eq!(f1.min_hc_pct, 10.0);
    // sample 1 passes again at 30%
    assert_eq!(f1.max_hc_pct, 30.0);
    assert_eq!(f1.min_hc_kw, Some(100.0));
    assert_eq!(f1.candidate_cba_samples, vec!["1".to_string()]);

    let voltage = &report.classes[1].feeders[0];
    assert_eq!(voltage.violation_starting_penetration, Some(30.0));
    assert_eq!(voltage.min_hc_pct, 20.0);
    assert_eq!(voltage.recommended_cba_sample.as_deref(), Some("2"));

    let overall = &report.overall.feeders[0];
    assert_eq!(overall.total_rows, 6);
    assert_eq!(overall.failing_rows, 2);
    assert_eq!(overall.violation_starting_penetration, Some(20.0));
    // one failure each: tie goes to the first sample
    assert_eq!(overall.recommended_cba_sample.as_deref(), Some("1"));
    assert!(report.overall.query.contains("min_voltage >= 0.95"));
}

// ---------------------------------------------------------------------------
// Test 3: Node-type filter drops the secondary-bus violation
// ---------------------------------------------------------------------------
#[test]
fn node_type_filter_limits_voltage_rows() {
    let dir = tempfile::tempdir().unwrap();
    build_batch(dir.path());
    let tables = load_tables_dir(&tables_dir(dir.path())).unwrap();
    let thresholds = load_preset("snapshot").unwrap();

    let options = HostingCapacityOptions {
        scenario: Some("pf1".into()),
        node_types: vec!["primaries".into()],
    };
    let analysis = compute_hosting_capacity(&tables, &thresholds, &options).unwrap();
    let voltage = &analysis.report.classes[1].feeders[0];
    assert_eq!(voltage.violation_starting_penetration, None);
    assert_eq!(voltage.max_hc_pct, 30.0);
}

// ---------------------------------------------------------------------------
// Test 4: Result files, including one impact table per feeder
// ---------------------------------------------------------------------------
#[test]
fn hosting_capacity_outputs_written() {
    let dir = tempfile::tempdir().unwrap();
    build_batch(dir.path());
    let tables = load_tables_dir(&tables_dir(dir.path())).unwrap();
    let thresholds = load_preset("snapshot").unwrap();
    let analysis =
        compute_hosting_capacity(&tables, &thresholds, &HostingCapacityOptions::default()).unwrap();

    let out = dir.path().join("hc");
    writers::prepare_output_dir(&out, false).unwrap();
    writers::write_hc_summary(&analysis.report.summary_rows(), &out).unwrap();
    writers::write_class_results(analysis.report.all_results(), &out).unwrap();
    writers::write_impact_summaries(&analysis.impact, &out).unwrap();

    let summary = fs::read_to_string(out.join("hc_summary.csv")).unwrap();
    // header + thermal + voltage + overall
    assert_eq!(summary.lines().count(), 4);
    assert!(out.join("hosting_capacity_overall.json").is_file());

    let thermal: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out.join("hosting_capacity_thermal.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(thermal["feeders"][0]["feeder"], "f1");

    let impact = fs::read_to_string(out.join("impact_summary_f1.csv")).unwrap();
    let mut lines = impact.lines();
    assert_eq!(
        lines.next().unwrap(),
        "feeder,substation,placement,sample,penetration_level,scenario,thermal_pass,voltage_pass,overall_pass,violations"
    );
    let failing = impact
        .lines()
        .find(|l| l.starts_with("f1,s1,random,1,20,"))
        .unwrap();
    assert!(failing.contains("false"));
    assert!(failing.contains("thermal:line_max_instantaneous_loading_pct=120"));
}

// ---------------------------------------------------------------------------
// Test 5: Empty batch is a typed error
// ---------------------------------------------------------------------------
#[test]
fn empty_job_tree_reports_no_matches() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("job-outputs")).unwrap();
    let err = make_summary_tables(dir.path(), 1).unwrap_err();
    assert!(matches!(err, DiscoError::NoMatches));
}

// ---------------------------------------------------------------------------
// Test 6: Upgrade costs from extracted and archived upgrade results
// ---------------------------------------------------------------------------
#[test]
fn upgrade_costs_from_directories_and_archives() {
    let dir = tempfile::tempdir().unwrap();
    let jobs = dir.path().join("job-outputs");

    let job_a = jobs.join("job_a").join("upgrades");
    fs::create_dir_all(&job_a).unwrap();
    fs::write(
        job_a.join("thermal_upgrades.json"),
        r#"[{"equipment_type": "line", "name": "Line.l1", "action": "upgrade", "count": 1,
             "phases": 3, "ampacity": 400.0, "length_ft": 2640.0}]"#,
    )
    .unwrap();

    let zip_dir = jobs.join("job_b").join("pydss_project");
    fs::create_dir_all(&zip_dir).unwrap();
    let mut writer = zip::ZipWriter::new(fs::File::create(zip_dir.join("project.zip")).unwrap());
    writer
        .start_file(
            "Exports/upgrades/voltage_upgrades.json",
            zip::write::FileOptions::default(),
        )
        .unwrap();
    writer
        .write_all(
            br#"[{"equipment_type": "capacitor", "name": "Capacitor.c1", "action": "new", "count": 2}]"#,
        )
        .unwrap();
    writer.finish().unwrap();

    let db = UnitCostDatabase {
        lines: vec![RatedCost {
            phases: Some(3),
            rating: 400.0,
            cost: dec!(200000),
        }],
        transformers: vec![],
        regulators: vec![],
        capacitors: BTreeMap::from([(UpgradeAction::New, dec!(12000.50))]),
    };

    let upgrades = load_all_upgrades(dir.path(), 2).unwrap();
    assert!(jobs.join("job_b/upgrades/voltage_upgrades.json").is_file());
    let report = aggregate_costs(&upgrades, &db).unwrap();

    assert_eq!(report.totals[0].job, "job_a");
    assert_eq!(report.totals[0].total_cost, dec!(100000));
    assert_eq!(report.totals[1].total_cost, dec!(24001.00));
    assert_eq!(report.categories[1].equipment_type, EquipmentType::Capacitor);

    let out = dir.path().join("costs");
    writers::prepare_output_dir(&out, false).unwrap();
    writers::write_cost_report(&report, &out).unwrap();
    let items = fs::read_to_string(out.join("upgrade_costs.csv")).unwrap();
    assert!(items.starts_with("job,equipment_type,name,action,count,matched_rating,unit_cost,total_cost"));
    assert!(out.join("upgrade_cost_summary.csv").is_file());
    assert!(out.join("upgrade_costs.json").is_file());
}

// ---------------------------------------------------------------------------
// Test 7: Unit cost workbook fixture, mixed header spelling and money text
// ---------------------------------------------------------------------------
#[test]
fn unit_cost_workbook_loaded_from_fixture() {
    let db = load_unit_costs(&unit_costs_fixture()).unwrap();

    assert_eq!(db.lines.len(), 3);
    assert_eq!(
        db.lines[0],
        RatedCost {
            phases: Some(3),
            rating: 300.0,
            cost: dec!(150000),
        }
    );
    assert_eq!(db.lines[2].phases, Some(1));

    // "Cost per unit" header and "$3,400.50" text cell
    assert_eq!(db.transformers.len(), 3);
    assert_eq!(db.transformers[1].rating, 50.0);
    assert_eq!(db.transformers[1].cost, dec!(3400.50));

    assert_eq!(db.regulators.len(), 2);
    assert_eq!(db.regulators[0].phases, None);
    assert_eq!(db.regulators[1].cost, dec!(62000));

    assert_eq!(db.capacitors.len(), 2);
    assert_eq!(db.capacitors[&UpgradeAction::New], dec!(12000));
    assert_eq!(db.capacitors[&UpgradeAction::ControlChange], dec!(500));
}

// ---------------------------------------------------------------------------
// Test 8: Upgrade costs priced against the fixture workbook
// ---------------------------------------------------------------------------
#[test]
fn upgrade_costs_priced_from_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let upgrades = dir.path().join("job-outputs/job_a/upgrades");
    fs::create_dir_all(&upgrades).unwrap();
    fs::write(
        upgrades.join("thermal_upgrades.json"),
        r#"[
            {"equipment_type": "line", "name": "Line.l1", "action": "upgrade", "count": 1,
             "phases": 3, "ampacity": 450.0, "length_ft": 5280.0},
            {"equipment_type": "transformer", "name": "Transformer.t1", "action": "upgrade",
             "count": 2, "phases": 1, "kva": 45.0}
        ]"#,
    )
    .unwrap();
    fs::write(
        upgrades.join("voltage_upgrades.json"),
        r#"[{"equipment_type": "capacitor", "name": "Capacitor.c1", "action": "control_change", "count": 1}]"#,
    )
    .unwrap();

    let report = compute_upgrade_costs(dir.path(), &unit_costs_fixture(), 1).unwrap();

    // 450 A sits halfway between 300 and 600; the tie goes to 600
    let line = report.items.iter().find(|i| i.name == "Line.l1").unwrap();
    assert_eq!(line.total_cost, dec!(250000));
    let transformer = report.items.iter().find(|i| i.name == "Transformer.t1").unwrap();
    assert_eq!(transformer.total_cost, dec!(6801.00));
    assert_eq!(report.totals.len(), 1);
    assert_eq!(report.totals[0].total_cost, dec!(257301.00));
}
