const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";
const MAX_FILENAME_LEN: usize = 120;

/// Media type sent for an upload, chosen by extension.
pub fn spreadsheet_mime_type(name: &str) -> &'static str {
    match name.rsplit_once('.') {
        Some((_, ext)) if ext.eq_ignore_ascii_case("xls") => XLS_MIME,
        _ => XLSX_MIME,
    }
}

/// Local filename for an artifact reference: last path component only, with
/// characters that are unsafe on common filesystems replaced.
pub fn safe_filename(artifact_ref: &str) -> String {
    let last = artifact_ref
        .rsplit(['/', '\\'])
        .find(|part| !part.trim().is_empty())
        .unwrap_or("");

    let cleaned: String = last
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    if compacted.is_empty() {
        return "translated.xlsx".to_string();
    }
    if compacted.len() > MAX_FILENAME_LEN {
        compacted = truncate_keeping_extension(&compacted, MAX_FILENAME_LEN);
    }
    if is_reserved_windows_name(&compacted) {
        compacted.insert(0, '_');
    }
    compacted
}

fn truncate_keeping_extension(name: &str, max: usize) -> String {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if ext.len() < 10 => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };
    let mut budget = max.saturating_sub(ext.len());
    while !stem.is_char_boundary(budget.min(stem.len())) {
        budget -= 1;
    }
    format!("{}{}", &stem[..budget.min(stem.len())], ext)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}
