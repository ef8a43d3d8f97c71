use disco_core::error::DiscoError;
use disco_core::thresholds::builtin;
use disco_core::thresholds::query::ComparisonOp;
use disco_core::thresholds::schema::ThresholdConfig;
use std::path::Path;

pub fn list() -> Result<(), DiscoError> {
    println!("Available predefined threshold sets:\n");
    for name in builtin::PRESETS {
        let config = builtin::load_preset(name)?;
        println!("  {:<12} {} (v{})", name, config.name, config.version);
        if let Some(ref desc) = config.description {
            println!("               {}", desc);
        }
        println!();
    }
    Ok(())
}

pub fn show(preset: &str) -> Result<(), DiscoError> {
    let config = builtin::load_preset(preset)?;

    println!("{} (version {})\n", config.name, config.version);
    if let Some(ref desc) = config.description {
        println!("{}\n", desc);
    }
    print_limits(&config);
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), DiscoError> {
    let config = disco_core::thresholds::load_thresholds(file)?;

    println!("Thresholds '{}' (v{}) are valid.", config.name, config.version);
    println!(
        "  Classes: {}",
        config.classes().collect::<Vec<_>>().join(", ")
    );
    println!();
    print_limits(&config);
    Ok(())
}

fn print_limits(config: &ThresholdConfig) {
    let width = config
        .thresholds
        .values()
        .flat_map(|limits| limits.keys().map(String::len))
        .max()
        .unwrap_or(20);

    for (class, limits) in &config.thresholds {
        println!("  [{}]", class);
        for (metric, limit) in limits {
            println!(
                "    {:<width$}  {}  {}",
                metric,
                ComparisonOp::for_metric(metric),
                limit,
                width = width
            );
        }
        println!();
    }
}
