use crate::model::ScanOutcome;
use anyhow::Result;

pub fn print_json(outcome: &ScanOutcome) -> Result<()> {
    let json = serde_json::to_string_pretty(outcome)?;
    println!("{}", json);
    Ok(())
}
