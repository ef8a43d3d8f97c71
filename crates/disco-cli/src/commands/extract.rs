use disco_core::archive;
use disco_core::error::DiscoError;
use std::path::Path;

pub fn run(project_zip: &Path, output_dir: &Path) -> Result<(), DiscoError> {
    let files = archive::extract_upgrades(project_zip, output_dir)?;
    if files.is_empty() {
        println!("No upgrade results found in {}", project_zip.display());
        return Ok(());
    }
    for file in &files {
        println!("  {}", file.display());
    }
    Ok(())
}
