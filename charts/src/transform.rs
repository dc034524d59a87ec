//! Row transforms.

use serde_json::{Map, Value};

use crate::config::Transform;

/// A chart data row.
pub type DataRow = Map<String, Value>;

/// Applies rename, then keep, then compute to every row, preserving row order.
pub fn apply(rows: &[DataRow], transform: Option<&Transform>) -> Vec<DataRow> {
    let Some(transform) = transform else {
        return rows.to_vec();
    };
    rows.iter()
        .map(|row| {
            let mut out: DataRow = row
                .iter()
                .map(|(k, v)| {
                    let key = transform.rename.get(k).unwrap_or(k);
                    (key.clone(), v.clone())
                })
                .collect();
            if let Some(keep) = &transform.keep {
                out.retain(|k, _| keep.contains(k));
            }
            for (field, expr) in &transform.compute {
                let value = substitute(expr, &out);
                out.insert(field.clone(), Value::String(value));
            }
            out
        })
        .collect()
}

/// Replaces `${key}` with each row value's text.
pub fn substitute(expr: &str, row: &DataRow) -> String {
    let mut result = expr.to_string();
    for (key, value) in row {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        result = result.replace(&format!("${{{key}}}"), &text);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> DataRow {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn rename_keep_compute_in_order() {
        let transform: Transform = serde_yaml::from_str(
            "rename: {categoryLabel: category}\nkeep: [category, count]\ncompute: {caption: '${category} (${count})'}\n",
        )
        .unwrap();
        let rows = vec![
            row(json!({"categoryLabel": "Activation", "count": 3, "category_uri": "x"})),
            row(json!({"categoryLabel": "Arithmetic", "count": 1})),
        ];
        let out = apply(&rows, Some(&transform));
        assert_eq!(out[0], row(json!({"category": "Activation", "count": 3, "caption": "Activation (3)"})));
        assert_eq!(out[1]["caption"], "Arithmetic (1)");
    }

    #[test]
    fn computed_fields_can_use_earlier_ones() {
        let transform: Transform =
            serde_yaml::from_str("compute:\n  label: '${name}-x'\n  caption: '${label}?'\n").unwrap();
        let out = apply(&[row(json!({"name": "n"}))], Some(&transform));
        assert_eq!(out[0]["caption"], "n-x?");
    }

    #[test]
    fn no_transform_is_identity() {
        let rows = vec![row(json!({"a": 1}))];
        assert_eq!(apply(&rows, None), rows);
    }

    #[test]
    fn unknown_placeholders_stay() {
        assert_eq!(substitute("${x}-${y}", &row(json!({"x": "1"}))), "1-${y}");
    }
}
