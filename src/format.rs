const UNITS: [(u64, &str); 6] = [
    (1 << 50, "PB"),
    (1 << 40, "TB"),
    (1 << 30, "GB"),
    (1 << 20, "MB"),
    (1 << 10, "KB"),
    (1, "bytes"),
];

/// Render a byte count in the largest binary unit it fills, two decimals.
pub fn format_bytes(bytes: u64) -> String {
    match bytes {
        0 => "0 bytes".to_string(),
        1 => "1 byte".to_string(),
        _ => {
            let (factor, suffix) = UNITS
                .iter()
                .copied()
                .find(|(factor, _)| bytes >= *factor)
                .unwrap_or((1, "bytes"));
            format!("{:.2} {}", bytes as f64 / factor as f64, suffix)
        }
    }
}
