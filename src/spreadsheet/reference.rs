//! Conversions between A1-style cell references and 0-based indexes.

/// Converts column letters to a 0-based column index: `A` = 0, `Z` = 25, `AA` = 26.
pub(crate) fn col_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.bytes().all(|byte| byte.is_ascii_alphabetic()) {
        return None;
    }
    letters
        .bytes()
        .map(|byte| (byte.to_ascii_uppercase() - b'A') as usize + 1)
        .try_fold(0usize, |index, digit| index.checked_mul(26)?.checked_add(digit))
        .map(|column| column - 1)
}

/// Converts a 1-based row number to a 0-based row index.
pub(crate) fn row_to_index(number: &str) -> Option<usize> {
    number
        .parse::<usize>()
        .ok()
        .filter(|row| *row > 0)
        .map(|row| row - 1)
}

/// Parses a reference such as `C7` into 0-based `(row, col)`.
pub(crate) fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    Some((row_to_index(digits)?, col_to_index(letters)?))
}

/// Parses a range such as `B2:D5` into its 0-based top-left and
/// bottom-right corners. A single reference is a one-cell range.
pub(crate) fn range_to_indexes(range: &str) -> Option<((usize, usize), (usize, usize))> {
    let (first, last) = match range.split_once(':') {
        Some((first, last)) => (reference_to_index(first)?, reference_to_index(last)?),
        None => {
            let cell = reference_to_index(range)?;
            (cell, cell)
        }
    };
    Some((
        (first.0.min(last.0), first.1.min(last.1)),
        (first.0.max(last.0), first.1.max(last.1)),
    ))
}

/// Formats 0-based `(row, col)` as an A1-style reference.
pub(crate) fn index_to_reference(row: usize, col: usize) -> String {
    let mut letters = Vec::new();
    let mut col = col + 1;
    while col > 0 {
        let digit = (col - 1) % 26;
        letters.push(b'A' + digit as u8);
        col = (col - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}
