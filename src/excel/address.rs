//! A1-style cell address helpers

/// Largest column index accepted by Excel (XFD)
pub const MAX_COLUMN: u16 = 16_383;

/// Largest row index accepted by Excel
pub const MAX_ROW: u32 = 1_048_575;

/// Convert a 0-based column index to an Excel column letter
///
/// Examples:
/// - 0 → A
/// - 25 → Z
/// - 26 → AA
pub fn column_letter(index: u16) -> String {
    let mut result = String::new();
    let mut idx = index as usize;

    loop {
        let remainder = idx % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// Parse an Excel column letter ("A", "ab") to a 0-based index
pub fn column_index(letters: &str) -> Option<u16> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut value: u32 = 0;
    for c in letters.chars() {
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }

    let index = value - 1;
    if index > MAX_COLUMN as u32 {
        return None;
    }
    Some(index as u16)
}

/// Parse an A1 reference ("B2") into a 0-based (row, column) pair
pub fn parse_cell(reference: &str) -> Option<(u32, u16)> {
    let reference = reference.trim().replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);

    let col = column_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 || row - 1 > MAX_ROW {
        return None;
    }
    Some((row - 1, col))
}

/// Format a 0-based (row, column) pair as an A1 reference
pub fn cell_name(row: u32, col: u16) -> String {
    format!("{}{}", column_letter(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(1), "B");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("XFD"), Some(MAX_COLUMN));
        assert_eq!(column_index("XFE"), None);
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("A1"), Some((0, 0)));
        assert_eq!(parse_cell("B2"), Some((1, 1)));
        assert_eq!(parse_cell("$C$10"), Some((9, 2)));
        assert_eq!(parse_cell("A0"), None);
        assert_eq!(parse_cell("12"), None);
        assert_eq!(parse_cell("B"), None);
    }

    #[test]
    fn test_cell_name_round_trip() {
        assert_eq!(cell_name(1, 1), "B2");
        assert_eq!(parse_cell(&cell_name(41, 30)), Some((41, 30)));
    }
}
