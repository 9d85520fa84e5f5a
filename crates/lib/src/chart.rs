//! # Chart Rendering
//!
//! Builds a Plotly figure, as JSON, directly from a [`DataFrame`]. The chart type
//! is chosen from the shape of the data; the model-generated Plotly code travels
//! along in `layout.meta.code` so a front-end with a Python runtime can still use it.

use crate::constants::PIE_MAX_CATEGORIES;
use crate::types::{cell_text, DataFrame};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A Plotly figure: traces plus layout, ready for `Plotly.newPlot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotlyFigure {
    pub data: Vec<Value>,
    pub layout: Value,
}

/// Picks a chart for `df` and returns its figure, or `None` for an empty frame.
///
/// - a single numeric cell becomes an indicator
/// - two or more numeric columns: scatter of the first two
/// - one numeric and a categorical column: bar
/// - a categorical column with few distinct values: pie of value counts
/// - anything else: line of the first column
pub fn build_figure(df: &DataFrame, code: &str, dark_mode: bool) -> Option<PlotlyFigure> {
    if df.is_empty() || df.columns.is_empty() {
        return None;
    }

    let numeric = df.numeric_columns();
    let categorical = df.categorical_columns();

    let (trace, x_title, y_title) = if df.len() == 1 && df.columns.len() == 1 && numeric.len() == 1
    {
        let trace = json!({
            "type": "indicator",
            "mode": "number",
            "value": df.rows[0][0],
            "title": { "text": df.columns[0] },
        });
        (trace, None, None)
    } else if numeric.len() >= 2 {
        let (x, y) = (numeric[0], numeric[1]);
        let trace = json!({
            "type": "scatter",
            "mode": "markers",
            "x": column_values(df, x),
            "y": column_values(df, y),
        });
        (trace, Some(&df.columns[x]), Some(&df.columns[y]))
    } else if numeric.len() == 1 && !categorical.is_empty() {
        let (x, y) = (categorical[0], numeric[0]);
        let trace = json!({
            "type": "bar",
            "x": column_values(df, x),
            "y": column_values(df, y),
        });
        (trace, Some(&df.columns[x]), Some(&df.columns[y]))
    } else if let Some(counts) = categorical
        .first()
        .map(|&c| value_counts(df, c))
        .filter(|counts| counts.len() < PIE_MAX_CATEGORIES)
    {
        let (labels, values): (Vec<String>, Vec<usize>) = counts.into_iter().unzip();
        let trace = json!({ "type": "pie", "labels": labels, "values": values });
        (trace, None, None)
    } else {
        let trace = json!({
            "type": "scatter",
            "mode": "lines",
            "x": (0..df.len()).collect::<Vec<_>>(),
            "y": column_values(df, 0),
        });
        (trace, None, Some(&df.columns[0]))
    };

    let mut layout = json!({ "meta": { "code": code } });
    if let Some(title) = x_title {
        layout["xaxis"] = json!({ "title": { "text": title } });
    }
    if let Some(title) = y_title {
        layout["yaxis"] = json!({ "title": { "text": title } });
    }
    if dark_mode {
        // The colours of Plotly's `plotly_dark` template.
        layout["paper_bgcolor"] = json!("rgb(17,17,17)");
        layout["plot_bgcolor"] = json!("rgb(17,17,17)");
        layout["font"] = json!({ "color": "#f2f5fa" });
    }

    Some(PlotlyFigure {
        data: vec![trace],
        layout,
    })
}

fn column_values(df: &DataFrame, index: usize) -> Vec<Value> {
    df.column(index).cloned().collect()
}

fn value_counts(df: &DataFrame, index: usize) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in df.column(index) {
        *counts.entry(cell_text(value)).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: &[&str], rows: Vec<Vec<Value>>) -> DataFrame {
        DataFrame::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn single_value_is_an_indicator() {
        let df = frame(&["total"], vec![vec![json!(42)]]);
        let fig = build_figure(&df, "", false).unwrap();
        assert_eq!(fig.data[0]["type"], "indicator");
        assert_eq!(fig.data[0]["value"], 42);
    }

    #[test]
    fn category_and_number_make_a_bar() {
        let df = frame(
            &["region", "sales"],
            vec![vec![json!("north"), json!(10)], vec![json!("south"), json!(7)]],
        );
        let fig = build_figure(&df, "fig = px.bar(df)", true).unwrap();
        assert_eq!(fig.data[0]["type"], "bar");
        assert_eq!(fig.data[0]["x"], json!(["north", "south"]));
        assert_eq!(fig.layout["meta"]["code"], "fig = px.bar(df)");
        assert_eq!(fig.layout["paper_bgcolor"], "rgb(17,17,17)");
    }

    #[test]
    fn two_numbers_make_a_scatter() {
        let df = frame(
            &["price", "qty", "label"],
            vec![
                vec![json!(1.5), json!(3), json!("a")],
                vec![json!(2.0), json!(4), json!("b")],
            ],
        );
        let fig = build_figure(&df, "", false).unwrap();
        assert_eq!(fig.data[0]["type"], "scatter");
        assert_eq!(fig.data[0]["mode"], "markers");
    }

    #[test]
    fn few_categories_make_a_pie() {
        let df = frame(
            &["status"],
            vec![vec![json!("open")], vec![json!("closed")], vec![json!("open")]],
        );
        let fig = build_figure(&df, "", false).unwrap();
        assert_eq!(fig.data[0]["type"], "pie");
        assert_eq!(fig.data[0]["labels"], json!(["closed", "open"]));
        assert_eq!(fig.data[0]["values"], json!([1, 2]));
    }

    #[test]
    fn empty_frame_has_no_figure() {
        assert!(build_figure(&DataFrame::default(), "", false).is_none());
    }
}
