//! Projection of the cache into table rows, and their text rendering.
//!
//! [`project`] is the only place rows are filtered and sorted. It never
//! touches the cache; the caller passes a slice and gets an owned view back.
//! Every call recomputes the view from scratch.

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::Result;
use crate::person::Person;

/// Line shown instead of a table when no row is visible.
pub const EMPTY_STATE: &str = "No people to show.";

const HEADERS: [&str; 3] = ["NAME", "DNI", "AGE"];

/// The rows currently visible, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableView {
    /// Visible rows, sorted by name.
    pub rows: Vec<Person>,
    /// Normalized query the rows were filtered with; empty means no filter.
    pub query: String,
}

impl TableView {
    /// Whether the empty-state placeholder should be shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Identifiers of the visible rows, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|p| p.dni.as_str()).collect()
    }
}

/// Trim and lowercase a raw search query.
#[must_use]
pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Build the visible rows from `people`.
///
/// Rows whose `name` or `dni` contains the query (case-insensitively) are
/// kept, then stably sorted by lowercased name.
#[must_use]
pub fn project(people: &[Person], query: &str) -> TableView {
    let query = normalize_query(query);
    let mut rows: Vec<Person> = if query.is_empty() {
        people.to_vec()
    } else {
        people.iter().filter(|p| p.matches(&query)).cloned().collect()
    };
    rows.sort_by_cached_key(Person::sort_key);
    TableView { rows, query }
}

/// How a [`TableView`] is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Aligned columns with a header.
    #[default]
    Table,
    /// One tab-separated line per row.
    Plain,
    /// A JSON array of rows.
    Json,
}

/// Render `view` as text in `format`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(view: &TableView, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(&view.rows)),
        OutputFormat::Plain => Ok(render_plain(&view.rows)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&view.rows)?),
    }
}

fn render_table(rows: &[Person]) -> String {
    if rows.is_empty() {
        return format!("{EMPTY_STATE}\n");
    }

    let ages: Vec<String> = rows.iter().map(|p| p.age.to_string()).collect();
    let name_width = column_width(HEADERS[0], rows.iter().map(|p| p.name.as_str()));
    let dni_width = column_width(HEADERS[1], rows.iter().map(|p| p.dni.as_str()));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<name_width$}  {:<dni_width$}  {}",
        HEADERS[0], HEADERS[1], HEADERS[2]
    );
    for (person, age) in rows.iter().zip(&ages) {
        let _ = writeln!(
            out,
            "{:<name_width$}  {:<dni_width$}  {age:>3}",
            person.name, person.dni
        );
    }
    out
}

fn render_plain(rows: &[Person]) -> String {
    rows.iter()
        .map(|p| format!("{}\t{}\t{}\n", p.name, p.dni, p.age))
        .collect()
}

fn column_width<'a>(header: &str, cells: impl Iterator<Item = &'a str>) -> usize {
    cells
        .map(|c| c.chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Vec<Person> {
        vec![
            Person::new("bob", "2", 40),
            Person::new("Carla", "X9", 25),
            Person::new("Ana", "1", 30),
        ]
    }

    fn names(view: &TableView) -> Vec<&str> {
        view.rows.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_sorted_case_insensitively() {
        let view = project(&people(), "");
        assert_eq!(names(&view), ["Ana", "bob", "Carla"]);
    }

    #[test]
    fn test_ana_before_bob() {
        let list = vec![Person::new("bob", "2", 40), Person::new("Ana", "1", 30)];
        assert_eq!(names(&project(&list, "")), ["Ana", "bob"]);
    }

    #[test]
    fn test_projection_is_idempotent() {
        let list = people();
        assert_eq!(project(&list, "a"), project(&list, "a"));
        let rendered = render(&project(&list, ""), OutputFormat::Table).unwrap();
        assert_eq!(rendered, render(&project(&list, ""), OutputFormat::Table).unwrap());
    }

    #[test]
    fn test_filter_by_name_or_dni() {
        let list = people();
        let view = project(&list, "  x9 ");
        assert_eq!(view.query, "x9");
        assert_eq!(names(&view), ["Carla"]);

        let view = project(&list, "A");
        // "Ana" and "Carla" contain an "a"; bob does not.
        assert_eq!(names(&view), ["Ana", "Carla"]);
    }

    #[test]
    fn test_every_match_appears_exactly_once() {
        let list = people();
        let query = "a";
        let view = project(&list, query);
        for person in &list {
            let count = view.rows.iter().filter(|r| *r == person).count();
            let expected = usize::from(person.matches(query));
            assert_eq!(count, expected, "{person:?}");
        }
    }

    #[test]
    fn test_filter_does_not_touch_input() {
        let list = people();
        let before = list.clone();
        let _ = project(&list, "zzz");
        assert_eq!(list, before);
    }

    #[test]
    fn test_empty_view_renders_placeholder() {
        let view = project(&people(), "nobody");
        assert!(view.is_empty());
        assert_eq!(render(&view, OutputFormat::Table).unwrap(), format!("{EMPTY_STATE}\n"));
        assert_eq!(render(&view, OutputFormat::Plain).unwrap(), "");
        assert_eq!(render(&view, OutputFormat::Json).unwrap(), "[]");
    }

    #[test]
    fn test_table_layout() {
        let view = project(&people(), "");
        let table = render(&view, OutputFormat::Table).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "NAME   DNI  AGE");
        assert_eq!(lines[1], "Ana    1     30");
        assert_eq!(lines[3], "Carla  X9    25");
    }

    #[test]
    fn test_plain_layout() {
        let view = project(&[Person::new("Ana", "1", 30)], "");
        assert_eq!(render(&view, OutputFormat::Plain).unwrap(), "Ana\t1\t30\n");
    }

    #[test]
    fn test_json_layout() {
        let view = project(&[Person::new("Ana", "1", 30)], "");
        let json: serde_json::Value =
            serde_json::from_str(&render(&view, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!([{"name": "Ana", "dni": "1", "age": 30}]));
    }

    #[test]
    fn test_keys() {
        assert_eq!(project(&people(), "").keys(), ["1", "2", "X9"]);
    }
}
