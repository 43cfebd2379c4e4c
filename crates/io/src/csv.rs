// CSV input: encoding fallback, separator checks, table loading

use std::io::Read;
use std::path::Path;

use parcelmerge_recon::CsvTable;

/// Read a CSV file into a table using `delimiter`.
pub fn read_table(path: &Path, delimiter: u8) -> Result<CsvTable, String> {
    let content = read_file_as_utf8(path)?;
    CsvTable::parse(&content, delimiter).map_err(|e| e.to_string())
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
/// A leading byte order mark is dropped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            log::warn!("{} is not valid UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// True if the first non-blank line contains `delimiter`.
/// A file with no non-blank line passes: there is no header to check.
pub fn separator_in_header(content: &str, delimiter: u8) -> bool {
    match content.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => line.as_bytes().contains(&delimiter),
        None => true,
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins. `None` when no
/// candidate splits the first line.
pub fn sniff_delimiter(content: &str) -> Option<u8> {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return None;
    }

    let mut best = None;
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = Some(delim);
        }
    }

    best
}

/// Human-readable name of a separator byte, matching the config syntax.
pub fn separator_name(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "tab".to_string(),
        other => (other as char).to_string(),
    }
}
