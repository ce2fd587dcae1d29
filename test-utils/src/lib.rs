/// Asserts that two byte buffers are equal, showing an annotated hex diff if
/// they differ.
///
/// # Arguments
/// * `actual` - The actual bytes
/// * `expected` - The expected bytes
/// * `context_name` - Name to use in the panic message (e.g., "Serialized
///   container", "Section header")
pub fn assert_bytes_with_diff(actual: &[u8], expected: &[u8], context_name: &str) {
    if actual == expected {
        return;
    }

    eprintln!("=== Expected ===\n{}\n", hex_rows(expected));
    eprintln!("=== Actual ===\n{}\n", hex_rows(actual));
    eprintln!("=== Diff ===");

    let rows = expected.len().max(actual.len()).div_ceil(ROW_WIDTH);
    for row in 0..rows {
        let range = row * ROW_WIDTH..((row + 1) * ROW_WIDTH);
        let expected_row = slice_row(expected, range.clone());
        let actual_row = slice_row(actual, range.clone());
        if expected_row != actual_row {
            eprintln!("{:#06x}: - {}", range.start, hex_or_missing(expected_row));
            eprintln!("{:#06x}: + {}", range.start, hex_or_missing(actual_row));
        }
    }

    if expected.len() != actual.len() {
        eprintln!("Length mismatch: expected {} bytes, got {} bytes", expected.len(), actual.len());
    }

    panic!("{} mismatch", context_name);
}

const ROW_WIDTH: usize = 16;

fn slice_row(bytes: &[u8], range: std::ops::Range<usize>) -> &[u8] {
    let start = range.start.min(bytes.len());
    let end = range.end.min(bytes.len());
    &bytes[start..end]
}

fn hex_or_missing(row: &[u8]) -> String {
    if row.is_empty() { "<missing>".to_string() } else { hex_row(row) }
}

fn hex_row(row: &[u8]) -> String {
    row.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}

fn hex_rows(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "<empty>".to_string();
    }
    bytes
        .chunks(ROW_WIDTH)
        .enumerate()
        .map(|(i, row)| format!("{:#06x}: {}", i * ROW_WIDTH, hex_row(row)))
        .collect::<Vec<_>>()
        .join("\n")
}
