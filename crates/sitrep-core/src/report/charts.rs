use serde_json::{json, Value};

/// House palette applied to every figure.
pub const COLOR_SEQUENCE: [&str; 9] = [
    "#c98b2d", "#152c44", "#919daa", "#931d1d", "#e9e8e4", "#5e6063", "#c1997c", "#e8cd90",
    "#3e74c4",
];

const BACKGROUND: &str = "#fafafa";

/// Every figure title carries its attribution on a second line.
pub fn chart_title(title: &str, source: &str) -> String {
    format!("{title} <br>Source: {source}")
}

fn base_layout(title: &str) -> Value {
    json!({
        "title": { "text": title },
        "colorway": COLOR_SEQUENCE,
        "paper_bgcolor": BACKGROUND,
        "plot_bgcolor": BACKGROUND,
        "margin": { "t": 80 }
    })
}

pub fn area(
    title: &str,
    x_title: &str,
    y_title: &str,
    x: &[Option<String>],
    y: &[Option<f64>],
) -> Value {
    let mut layout = base_layout(title);
    layout["xaxis"] = json!({ "title": { "text": x_title } });
    layout["yaxis"] = json!({ "title": { "text": y_title } });
    json!({
        "data": [{
            "type": "scatter",
            "mode": "lines",
            "fill": "tozeroy",
            "line": { "color": COLOR_SEQUENCE[0] },
            "x": x,
            "y": y
        }],
        "layout": layout
    })
}

/// Vertical bars, optionally shaded by a second numeric series rendered as
/// a horizontal color bar under the plot.
pub fn vbar(
    title: &str,
    x_title: &str,
    y_title: &str,
    x: &[Option<String>],
    y: &[Option<f64>],
    color_by: Option<(&str, &[Option<f64>])>,
) -> Value {
    let marker = match color_by {
        Some((label, values)) => json!({
            "color": values,
            "showscale": true,
            "colorbar": { "orientation": "h", "title": { "text": label } }
        }),
        None => json!({ "color": COLOR_SEQUENCE[0] }),
    };
    let mut layout = base_layout(title);
    layout["xaxis"] = json!({ "title": { "text": x_title } });
    layout["yaxis"] = json!({ "title": { "text": y_title } });
    json!({
        "data": [{ "type": "bar", "x": x, "y": y, "marker": marker }],
        "layout": layout
    })
}

pub fn hbar(title: &str, x_title: &str, x: &[Option<f64>], y: &[Option<String>]) -> Value {
    let mut layout = base_layout(title);
    layout["xaxis"] = json!({ "title": { "text": x_title } });
    layout["yaxis"] = json!({ "categoryorder": "total ascending" });
    json!({
        "data": [{
            "type": "bar",
            "orientation": "h",
            "marker": { "color": COLOR_SEQUENCE[0] },
            "x": x,
            "y": y
        }],
        "layout": layout
    })
}

/// Horizontal bars with one trace per group, groups in first-seen order.
/// Rows are `(group, label, value)`.
pub fn grouped_hbar(title: &str, x_title: &str, rows: &[(String, String, f64)]) -> Value {
    let mut groups: Vec<String> = Vec::new();
    for row in rows {
        if !groups.contains(&row.0) {
            groups.push(row.0.clone());
        }
    }

    let data: Vec<Value> = groups
        .iter()
        .map(|group| {
            let x: Vec<f64> = rows
                .iter()
                .filter(|row| &row.0 == group)
                .map(|row| row.2)
                .collect();
            let y: Vec<&str> = rows
                .iter()
                .filter(|row| &row.0 == group)
                .map(|row| row.1.as_str())
                .collect();
            json!({
                "type": "bar",
                "orientation": "h",
                "name": group,
                "x": x,
                "y": y
            })
        })
        .collect();

    let mut layout = base_layout(title);
    layout["xaxis"] = json!({ "title": { "text": x_title } });
    layout["yaxis"] = json!({ "categoryorder": "total ascending" });
    layout["legend"] = json!({ "orientation": "h", "y": -0.2 });
    json!({ "data": data, "layout": layout })
}

/// Two-level treemap rooted at `All`. Rows are `(branch, leaf, value)`;
/// branch totals are derived so `branchvalues: total` holds.
pub fn treemap(title: &str, rows: &[(String, String, f64)]) -> Value {
    let mut branches: Vec<(String, f64)> = Vec::new();
    for row in rows {
        match branches.iter_mut().find(|(name, _)| name == &row.0) {
            Some((_, total)) => *total += row.2,
            None => branches.push((row.0.clone(), row.2)),
        }
    }
    let grand_total: f64 = branches.iter().map(|(_, total)| *total).sum();

    let mut ids = vec!["All".to_string()];
    let mut labels = vec!["All".to_string()];
    let mut parents = vec![String::new()];
    let mut values = vec![grand_total];
    for (name, total) in &branches {
        ids.push(format!("All/{name}"));
        labels.push(name.clone());
        parents.push("All".to_string());
        values.push(*total);
    }
    for (branch, leaf, value) in rows {
        ids.push(format!("All/{branch}/{leaf}"));
        labels.push(leaf.clone());
        parents.push(format!("All/{branch}"));
        values.push(*value);
    }

    json!({
        "data": [{
            "type": "treemap",
            "branchvalues": "total",
            "ids": ids,
            "labels": labels,
            "parents": parents,
            "values": values
        }],
        "layout": base_layout(title)
    })
}
