use disco_core::costs::CostReport;
use disco_core::hosting_capacity::HostingCapacityReport;

fn pct(value: f64) -> String {
    format!("{value}%")
}

fn kw(value: Option<f64>) -> String {
    match value {
        Some(kw) => format!("{kw:.1}"),
        None => "-".into(),
    }
}

pub fn print_hosting_capacity(report: &HostingCapacityReport) {
    match &report.scenario {
        Some(scenario) => println!("=== {} [{}] ===\n", report.thresholds_name, scenario),
        None => println!("=== {} ===\n", report.thresholds_name),
    }

    for result in report.all_results() {
        println!("  {}", result.metric_class);
        if !result.query.is_empty() {
            println!("    {}", result.query);
        }
        println!();

        let width = result
            .feeders
            .iter()
            .map(|s| s.feeder.len())
            .max()
            .unwrap_or(6)
            .max(6);

        println!(
            "    {:<width$}  {:>8}  {:>8}  {:>10}  {:>10}  {:>9}  {}",
            "Feeder", "Min HC", "Max HC", "Min kW", "Max kW", "Viol. at", "CBA sample",
            width = width
        );
        println!("    {}", "-".repeat(width + 66));

        for s in &result.feeders {
            println!(
                "    {:<width$}  {:>8}  {:>8}  {:>10}  {:>10}  {:>9}  {}",
                s.feeder,
                pct(s.min_hc_pct),
                pct(s.max_hc_pct),
                kw(s.min_hc_kw),
                kw(s.max_hc_kw),
                s.violation_starting_penetration
                    .map(pct)
                    .unwrap_or_else(|| "-".into()),
                s.recommended_cba_sample.as_deref().unwrap_or("-"),
                width = width
            );
        }
        println!();
    }
}

pub fn print_costs(report: &CostReport) {
    if report.totals.is_empty() {
        println!("No upgrades found.");
        return;
    }

    let width = report
        .totals
        .iter()
        .map(|t| t.job.len())
        .max()
        .unwrap_or(3)
        .max(3);

    println!(
        "  {:<width$}  {:<12}  {:>6}  {:>14}",
        "Job", "Equipment", "Count", "Cost",
        width = width
    );
    println!("  {}", "-".repeat(width + 38));

    for total in &report.totals {
        for category in report.categories.iter().filter(|c| c.job == total.job) {
            println!(
                "  {:<width$}  {:<12}  {:>6}  {:>14}",
                category.job,
                category.equipment_type.to_string(),
                category.count,
                category.total_cost.round_dp(2).to_string(),
                width = width
            );
        }
        println!(
            "  {:<width$}  {:<12}  {:>6}  {:>14}",
            total.job,
            "total",
            "",
            total.total_cost.round_dp(2).to_string(),
            width = width
        );
        println!();
    }
}
