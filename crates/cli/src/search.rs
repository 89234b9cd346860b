use crate::SnapshotFile;
use sift_core::{IndexView, SearchResult};
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "#")]
    row: usize,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn run(
    file: &SnapshotFile,
    key: &str,
    query: &str,
    start: i64,
    stop: i64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = file.open()?;
    let view = index.read();
    let result = view.search(key, query, start, stop);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render(&view, &result));
    }
    Ok(())
}

fn render(view: &IndexView<'_>, result: &SearchResult) -> String {
    let summary = format!(
        "{} of {} matches in '{}' (rows {}..{}, {})",
        result.found.len(),
        result.count,
        result.key,
        result.start,
        result.stop,
        result.elapsed_string()
    );

    if result.found.is_empty() {
        return summary;
    }

    let rows: Vec<MatchRow> = result
        .found
        .iter()
        .enumerate()
        .map(|(i, id)| MatchRow {
            row: result.start + i,
            id: id.clone(),
            value: view.get(&result.key, id).unwrap_or_default().to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{}\n{}", table, summary)
}
