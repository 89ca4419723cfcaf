use serde_json::Value;

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.32.0.min.js";

const STYLE: &str = "\
body{margin:0;background:#fff;color:#1d2733;font-family:'Segoe UI',system-ui,sans-serif;line-height:1.5;}\
main{max-width:980px;margin:0 auto;padding:24px 16px 64px;}\
h1{font-size:2.1em;margin-bottom:0.4em;}\
h2{margin-top:1.6em;}\
hr{border:none;border-top:1px solid #d8dce1;margin:32px 0;}\
.tiles{display:grid;grid-template-columns:repeat(auto-fit,minmax(200px,1fr));gap:16px;margin:16px 0;}\
.tile{background:#fafafa;border:1px solid #e3e6ea;border-radius:8px;padding:12px 16px;}\
.tile-label{font-size:0.85em;color:#5e6063;}\
.tile-value{font-size:1.8em;font-weight:600;}\
.tile-delta{font-size:0.9em;}\
.delta-good{color:#09ab3b;}\
.delta-bad{color:#ff2b2b;}\
.delta-neutral{color:#5e6063;}\
.chart-row{display:grid;grid-template-columns:1fr 1fr;gap:16px;}\
.chart{min-height:400px;margin:16px 0;}\
.placeholder{display:flex;align-items:center;justify-content:center;background:#fafafa;border:1px dashed #b9bec6;color:#5e6063;}\
blockquote{border-left:4px solid #c98b2d;background:#fafafa;margin:12px 0;padding:8px 16px;}\
details.note{background:#fafafa;border:1px solid #e3e6ea;border-radius:8px;padding:8px 16px;margin:12px 0;}\
details.note summary{cursor:pointer;font-weight:600;}\
iframe{width:100%;border:none;margin:16px 0;}";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Anchor id for a heading, lowercased with hyphens for whitespace.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// The news feed stores links as `[Link](url)`; anything that does not
/// parse is shown as plain text.
pub fn markdown_link(cell: &str) -> String {
    if let Some(rest) = cell.strip_prefix('[') {
        if let Some((label, target)) = rest.split_once("](") {
            if let Some(url) = target.strip_suffix(')') {
                return format!("<a href=\"{}\">{}</a>", escape(url), escape(label));
            }
        }
    }
    escape(cell)
}

pub fn tile(label: &str, value: &str, delta: Option<(&'static str, String)>) -> String {
    let mut out = format!(
        "<div class=\"tile\"><div class=\"tile-label\">{}</div><div class=\"tile-value\">{}</div>",
        escape(label),
        escape(value)
    );
    if let Some((class, text)) = delta {
        out.push_str(&format!(
            "<div class=\"tile-delta {class}\">{}</div>",
            escape(&text)
        ));
    }
    out.push_str("</div>");
    out
}

/// Accumulates the report body and the plotly figures embedded in it.
pub struct Page {
    title: String,
    body: String,
    charts: usize,
}

impl Page {
    pub fn new(title: &str) -> Self {
        Page {
            title: title.to_string(),
            body: String::new(),
            charts: 0,
        }
    }

    pub fn heading(&mut self, text: &str) {
        self.body
            .push_str(&format!("<h2 id=\"{}\">{}</h2>\n", slug(text), escape(text)));
    }

    pub fn subheading(&mut self, text: &str) {
        self.body
            .push_str(&format!("<h3 id=\"{}\">{}</h3>\n", slug(text), escape(text)));
    }

    pub fn divider(&mut self) {
        self.body.push_str("<hr>\n");
    }

    pub fn italic(&mut self, text: &str) {
        self.body
            .push_str(&format!("<p><em>{}</em></p>\n", escape(text)));
    }

    pub fn chapters(&mut self, names: &[&str]) {
        self.body
            .push_str("<details class=\"note\"><summary>Chapters</summary><ul>\n");
        for name in names {
            self.body.push_str(&format!(
                "<li><a href=\"#{}\">{}</a></li>\n",
                slug(name),
                escape(name)
            ));
        }
        self.body.push_str("</ul></details>\n");
    }

    pub fn note(&mut self, title: &str, body: &str) {
        self.body.push_str(&format!(
            "<details class=\"note\"><summary>{}</summary><p>{}</p></details>\n",
            escape(title),
            escape(body)
        ));
    }

    pub fn tiles(&mut self, tiles: &[String]) {
        self.body.push_str("<div class=\"tiles\">\n");
        for tile in tiles {
            self.body.push_str(tile);
            self.body.push('\n');
        }
        self.body.push_str("</div>\n");
    }

    /// `inner` is already-rendered HTML, not text.
    pub fn blockquote(&mut self, inner: &str) {
        self.body
            .push_str(&format!("<blockquote>{inner}</blockquote>\n"));
    }

    pub fn begin_row(&mut self) {
        self.body.push_str("<div class=\"chart-row\">\n");
    }

    pub fn end_row(&mut self) {
        self.body.push_str("</div>\n");
    }

    pub fn chart(&mut self, spec: &Value) {
        let id = format!("chart-{}", self.charts);
        self.charts += 1;
        self.body.push_str(&format!(
            "<div id=\"{id}\" class=\"chart\"></div>\n<script>Plotly.newPlot(\"{id}\", {spec});</script>\n"
        ));
    }

    pub fn placeholder(&mut self, label: &str) {
        self.body.push_str(&format!(
            "<div class=\"chart placeholder\">{} unavailable</div>\n",
            escape(label)
        ));
    }

    pub fn iframe(&mut self, title: &str, url: &str, height: u32) {
        self.body.push_str(&format!(
            "<h3 id=\"{}\">{}</h3>\n<iframe src=\"{}\" height=\"{}\" loading=\"lazy\"></iframe>\n",
            slug(title),
            escape(title),
            escape(url),
            height
        ));
    }

    pub fn link_list(&mut self, items: &[(&str, &str)]) {
        self.body.push_str("<ul>\n");
        for (label, url) in items {
            self.body.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                escape(url),
                escape(label)
            ));
        }
        self.body.push_str("</ul>\n");
    }

    pub fn finish(self) -> String {
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{title}</title>\n\
             <script src=\"{cdn}\" charset=\"utf-8\"></script>\n\
             <style>{style}</style>\n</head>\n<body>\n<main>\n<h1>{title}</h1>\n{body}</main>\n</body>\n</html>\n",
            title = escape(&self.title),
            cdn = PLOTLY_CDN,
            style = STYLE,
            body = self.body,
        )
    }
}
