use log::debug;

use crate::config::*;

/// Finds the row holding the column labels in a sheet read without headers.
///
/// Published spreadsheets often start with a few rows of titles and notes.
/// The header is the first row whose flattened text contains one of the
/// keywords, compared without regard to case.
pub fn locate_header(rows: &[Vec<Cell>], keywords: &[String]) -> Result<usize, PipelineError> {
    let lowered: Vec<String> = keywords
        .iter()
        .filter(|k| !k.is_empty())
        .map(|k| k.to_lowercase())
        .collect();
    if lowered.is_empty() {
        return Err(PipelineError::HeaderNotFound);
    }
    for (idx, row) in rows.iter().enumerate() {
        let text = flatten_row(row).to_lowercase();
        if lowered.iter().any(|k| text.contains(k.as_str())) {
            debug!("locate_header: header found at row {}: {:?}", idx, text);
            return Ok(idx);
        }
    }
    Err(PipelineError::HeaderNotFound)
}

fn flatten_row(row: &[Cell]) -> String {
    row.iter()
        .map(|c| c.as_text())
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(xs: &[&str]) -> Vec<Cell> {
        xs.iter()
            .map(|s| {
                if s.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(s.to_string())
                }
            })
            .collect()
    }

    fn keywords() -> Vec<String> {
        vec!["BMP".to_string(), "EMP".to_string()]
    }

    #[test]
    fn header_after_title_rows() {
        let rows = vec![
            text_row(&["Annual Average Daily Traffic", ""]),
            text_row(&["Published 2023", ""]),
            vec![Cell::Empty, Cell::Number(3.0)],
            text_row(&["Route", "BMP", "EMP"]),
            text_row(&["I-5", "0", "1"]),
        ];
        assert_eq!(locate_header(&rows, &keywords()), Ok(3));
    }

    #[test]
    fn header_on_first_row() {
        let rows = vec![text_row(&["Route", "EMP"]), text_row(&["I-5", "1"])];
        assert_eq!(locate_header(&rows, &keywords()), Ok(0));
    }

    #[test]
    fn keywords_ignore_case_and_match_substrings() {
        let rows = vec![
            text_row(&["notes"]),
            text_row(&["route", "bmp_mile", "end"]),
        ];
        assert_eq!(locate_header(&rows, &keywords()), Ok(1));
    }

    #[test]
    fn missing_header() {
        let rows = vec![text_row(&["Route", "Start"]), text_row(&["I-5", "Main St"])];
        assert_eq!(
            locate_header(&rows, &keywords()),
            Err(PipelineError::HeaderNotFound)
        );
        assert_eq!(locate_header(&[], &keywords()), Err(PipelineError::HeaderNotFound));
    }

    #[test]
    fn no_keywords_never_match() {
        let rows = vec![text_row(&["Route", "BMP"])];
        assert_eq!(locate_header(&rows, &[]), Err(PipelineError::HeaderNotFound));
    }
}
