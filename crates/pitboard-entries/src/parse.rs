//! Comma/tab separated entry list parsing.

use pitboard_types::roster::Entrant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// Tab wins when the first line contains one.
    pub fn detect(text: &str) -> Self {
        let first = text.lines().next().unwrap_or_default();
        if first.contains('\t') {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }

    fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
        }
    }
}

/// Row that could not be turned into an entrant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDiagnostic {
    /// 1-based line number in the source text.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEntries {
    pub entrants: Vec<Entrant>,
    pub header_skipped: bool,
    pub diagnostics: Vec<RowDiagnostic>,
}

pub fn parse_entries(text: &str) -> ParsedEntries {
    let delimiter = Delimiter::detect(text);
    let mut parsed = ParsedEntries::default();

    let mut rows = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .peekable();

    if let Some((_, first)) = rows.peek() {
        let cells = split_row(first, delimiter);
        if !is_entry_number(cells.first().map(String::as_str).unwrap_or_default()) {
            parsed.header_skipped = true;
            rows.next();
        }
    }

    for (line, row) in rows {
        let cells = split_row(row, delimiter);
        if cells.len() < 2 {
            parsed.diagnostics.push(RowDiagnostic {
                line,
                reason: format!("expected at least 2 columns, found {}", cells.len()),
            });
            continue;
        }
        parsed.entrants.push(Entrant::new(
            normalize_number(&cells[0]),
            cells[1].clone(),
            cells.get(2).cloned().unwrap_or_default(),
        ));
    }

    parsed
}

fn split_row(row: &str, delimiter: Delimiter) -> Vec<String> {
    row.split(delimiter.as_char())
        .map(|cell| cell.trim().replace('"', ""))
        .collect()
}

/// Bare digits or `#` followed by digits.
pub fn is_entry_number(cell: &str) -> bool {
    let digits = cell.trim().strip_prefix('#').unwrap_or(cell.trim());
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Numeric-only entry numbers become `#NNN`; anything else is kept verbatim.
pub fn normalize_number(cell: &str) -> String {
    let cell = cell.trim();
    if !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit()) {
        match cell.parse::<u64>() {
            Ok(n) => format!("#{n:03}"),
            Err(_) => format!("#{cell}"),
        }
    } else {
        cell.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_row_is_detected_and_skipped() {
        let parsed = parse_entries("No,Team,Robot\n1,Alpha,Rover\n#2,Beta,\n");
        assert!(parsed.header_skipped);
        assert_eq!(
            parsed.entrants,
            vec![
                Entrant::new("#001", "Alpha", "Rover"),
                Entrant::new("#2", "Beta", ""),
            ]
        );
    }

    #[test]
    fn headerless_file_keeps_first_row() {
        let parsed = parse_entries("7,Gamma\n12,Delta,Dart");
        assert!(!parsed.header_skipped);
        assert_eq!(parsed.entrants.len(), 2);
        assert_eq!(parsed.entrants[0].number, "#007");
        assert_eq!(parsed.entrants[1].robot_name, "Dart");
    }

    #[test]
    fn tab_delimiter_is_detected() {
        let parsed = parse_entries("番号\t名前\tロボット\n3\tチームA\t赤\n");
        assert_eq!(parsed.entrants, vec![Entrant::new("#003", "チームA", "赤")]);
    }

    #[test]
    fn quotes_are_stripped_and_short_rows_reported() {
        let parsed = parse_entries("\"1\",\"Alpha\"\nlonely\n\n2,Beta\r\n");
        assert_eq!(parsed.entrants.len(), 2);
        assert_eq!(parsed.entrants[0], Entrant::new("#001", "Alpha", ""));
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].line, 2);
    }

    #[test]
    fn entry_number_rules() {
        assert!(is_entry_number("12"));
        assert!(is_entry_number("#012"));
        assert!(!is_entry_number("#"));
        assert!(!is_entry_number("No."));
        assert_eq!(normalize_number("5"), "#005");
        assert_eq!(normalize_number("1234"), "#1234");
        assert_eq!(normalize_number("#9"), "#9");
        assert_eq!(normalize_number("A-1"), "A-1");
    }
}
