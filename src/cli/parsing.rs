//! CLI parsing helpers for clap value parsers.

pub(super) fn parse_fetch_retries(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("{s} is not a valid number"))?;
    if value <= super::MAX_FETCH_RETRIES {
        Ok(value)
    } else {
        Err(format!(
            "fetch retries must be between 0 and {}",
            super::MAX_FETCH_RETRIES
        ))
    }
}
