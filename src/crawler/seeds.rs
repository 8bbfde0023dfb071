use crate::url::normalize_url;
use crate::CrawlError;
use std::path::Path;
use url::Url;

/// Reads the seed file: one URL per line
///
/// Blank lines and lines starting with `#` are skipped. Lines that do not
/// normalize to an HTTP(S) URL are logged and skipped. Only an unreadable
/// file is an error.
pub fn load_seeds(path: &Path) -> Result<Vec<Url>, CrawlError> {
    let content = std::fs::read_to_string(path).map_err(|source| CrawlError::Seeds {
        path: path.display().to_string(),
        source,
    })?;

    let mut seeds = Vec::new();
    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match normalize_url(line) {
            Ok(url) => seeds.push(url),
            Err(e) => tracing::warn!(
                "Skipping invalid seed on line {}: {} ({})",
                line_number + 1,
                line,
                e
            ),
        }
    }

    Ok(seeds)
}
