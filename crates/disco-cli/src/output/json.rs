use disco_core::error::DiscoError;
use serde::Serialize;

pub fn print<T: Serialize>(result: &T) -> Result<(), DiscoError> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}
