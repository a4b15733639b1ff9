use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::CreateMovieInput;

/// A rejected import row, indexed by its line number in the file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// Outcome of parsing an import file: the rows that parsed and the rows that
/// were rejected. A bad row never aborts the rest of the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedImport {
    pub movies: Vec<CreateMovieInput>,
    pub errors: Vec<RowError>,
}

/// Parses comma-delimited import text.
///
/// The first line is the header and must include a `title` column. Optional
/// columns: `year`, `director`, `genre` (pipe-separated sub-list), `rating`,
/// `posterUrl`, `watchedDate` (ISO date), `notes`. Blank lines are skipped;
/// a row whose column count differs from the header, or whose numeric/date
/// values do not parse, is rejected with its line number.
pub fn parse_import(content: &str) -> AppResult<ParsedImport> {
    let mut lines = content.lines();
    let header_line = lines
        .next()
        .ok_or_else(|| AppError::InvalidInput("Import file is empty".to_string()))?;

    let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();
    if !headers.contains(&"title") {
        return Err(AppError::InvalidInput(
            "Import file must include a 'title' column".to_string(),
        ));
    }

    let mut parsed = ParsedImport::default();

    for (index, line) in lines.enumerate() {
        // Header is line 1; data starts on line 2.
        let row = index + 2;
        if line.trim().is_empty() {
            continue;
        }

        let values: Vec<&str> = line.split(',').map(str::trim).collect();
        if values.len() != headers.len() {
            parsed.errors.push(RowError {
                row,
                message: format!(
                    "Row {} has {} columns, expected {}",
                    row,
                    values.len(),
                    headers.len()
                ),
            });
            continue;
        }

        match parse_row(&headers, &values) {
            Ok(movie) => parsed.movies.push(movie),
            Err(message) => parsed.errors.push(RowError {
                row,
                message: format!("Row {}: {}", row, message),
            }),
        }
    }

    Ok(parsed)
}

fn parse_row(headers: &[&str], values: &[&str]) -> Result<CreateMovieInput, String> {
    let field = |name: &str| -> Option<&str> {
        headers
            .iter()
            .position(|h| *h == name)
            .map(|i| values[i])
            .filter(|v| !v.is_empty())
    };

    let title = field("title").ok_or("missing title")?;

    let year = field("year")
        .map(|v| v.parse::<i32>().map_err(|_| format!("invalid year '{v}'")))
        .transpose()?;

    let user_rating = field("rating")
        .map(|v| v.parse::<f64>().map_err(|_| format!("invalid rating '{v}'")))
        .transpose()?;

    let watched_date = field("watchedDate")
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map_err(|_| format!("invalid watched date '{v}'"))
        })
        .transpose()?;

    let genres = field("genre")
        .map(|v| {
            v.split('|')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(CreateMovieInput {
        title: title.to_string(),
        year,
        director: field("director").map(str::to_string),
        user_rating,
        poster_url: field("posterUrl").map(str::to_string),
        watched: true,
        watched_date: Some(watched_date.unwrap_or_else(|| Utc::now().date_naive())),
        notes: field("notes").map(str::to_string),
        imdb_id: None,
        genres,
    })
}
