//! Server-side HTML for the dashboard page.
//!
//! Charts are drawn client-side by Plotly; the series are embedded as JSON.

use serde_json::json;
use std::fmt::Write;

use crate::analysis::{PopulationAnalysis, growth_series};
use crate::api::PopulationData;
use crate::config::DashboardConfig;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

pub const NO_DATA_MESSAGE: &str = "No data available for the selected parameters.";
pub const NO_GROWTH_MESSAGE: &str = "No growth rate data available for the selected period.";

/// Values shown in the settings form.
#[derive(Debug, Clone)]
pub struct FormValues {
    pub country: String,
    pub start: i32,
    pub end: i32,
}

/// What to render below the title.
pub enum PageBody<'a> {
    Intro,
    Error(&'a str),
    NoData,
    Results {
        data: &'a [PopulationData],
        analysis: &'a PopulationAnalysis,
    },
}

pub fn render_page(config: &DashboardConfig, form: &FormValues, body: PageBody<'_>) -> String {
    let mut html = String::with_capacity(8 * 1024);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>World Population Analysis</title>
<script src="{PLOTLY_CDN}"></script>
<style>
body {{ font-family: system-ui, sans-serif; margin: 0; display: flex; color: #262730; }}
aside {{ width: 260px; min-height: 100vh; padding: 1.5rem; background: #f0f2f6; box-sizing: border-box; }}
main {{ flex: 1; padding: 1.5rem 2.5rem; }}
label {{ display: block; margin-top: .8rem; font-size: .9rem; }}
input {{ width: 100%; padding: .35rem; box-sizing: border-box; }}
button {{ margin-top: 1.2rem; padding: .5rem 1rem; }}
.metrics {{ display: flex; gap: 1.5rem; margin: 1rem 0; }}
.metric {{ flex: 1; }}
.metric .label {{ font-size: .85rem; color: #555; }}
.metric .value {{ font-size: 1.8rem; }}
.error {{ background: #ffe5e5; padding: .8rem; border-radius: 4px; }}
.warning {{ background: #fff6d6; padding: .8rem; border-radius: 4px; }}
table {{ border-collapse: collapse; width: 100%; }}
th, td {{ border-bottom: 1px solid #ddd; padding: .3rem .6rem; text-align: right; }}
</style>
</head>
<body>
<aside>
<h2>Settings</h2>
<form method="get" action="/">
<label>Country Code (e.g., USA, CHN, IND)
<input name="country" value="{country}" maxlength="3"></label>
<label>Start Year
<input type="number" name="start" value="{start}" min="{min}" max="{max}"></label>
<label>End Year
<input type="number" name="end" value="{end}" min="{min}" max="{max}"></label>
<button type="submit">Analyze</button>
</form>
</aside>
<main>
<h1>&#127757; World Population Analysis</h1>
<p>This dashboard analyzes population data from the World Bank API.
Select a country and date range to view population trends and statistics.</p>
"#,
        country = escape_html(&form.country),
        start = form.start,
        end = form.end,
        min = config.min_year,
        max = config.max_year,
    );

    match body {
        PageBody::Intro => {}
        PageBody::Error(msg) => {
            let _ = writeln!(html, r#"<div class="error">{}</div>"#, escape_html(msg));
        }
        PageBody::NoData => {
            let _ = writeln!(html, r#"<div class="error">{NO_DATA_MESSAGE}</div>"#);
        }
        PageBody::Results { data, analysis } => render_results(&mut html, form, data, analysis),
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_results(
    html: &mut String,
    form: &FormValues,
    data: &[PopulationData],
    analysis: &PopulationAnalysis,
) {
    let country = escape_html(&analysis.country);

    let _ = write!(
        html,
        r#"<div class="metrics">
{}{}{}{}</div>
"#,
        metric(
            "Average Growth Rate",
            &format!("{:.2}%", analysis.average_growth_rate)
        ),
        metric("Total Change", &format_thousands(analysis.total_change)),
        metric(
            "Percentage Change",
            &format!("{:.2}%", analysis.percentage_change)
        ),
        metric("Current Population", &format_thousands(analysis.max_population)),
    );

    html.push_str("<h3>Population Trend</h3>\n<div id=\"population-chart\"></div>\n");
    let trace = json!([{
        "x": data.iter().map(|d| d.year).collect::<Vec<_>>(),
        "y": data.iter().map(|d| d.population).collect::<Vec<_>>(),
        "type": "scatter",
        "mode": "lines",
        "hovertemplate": "Year: %{x}<br>Population: %{y:,.0f}<br><extra></extra>",
    }]);
    let layout = chart_layout(
        &format!("Population Trend for {}", analysis.country),
        "Population",
        ",.0f",
    );
    push_plot(html, "population-chart", &trace, &layout);

    html.push_str("<h3>Growth Rate</h3>\n");
    let growth = growth_series(data);
    if growth.is_empty() {
        let _ = writeln!(html, r#"<div class="warning">{NO_GROWTH_MESSAGE}</div>"#);
    } else {
        html.push_str("<div id=\"growth-chart\"></div>\n");
        let trace = json!([{
            "x": growth.iter().map(|(year, _)| *year).collect::<Vec<_>>(),
            "y": growth.iter().map(|(_, rate)| *rate).collect::<Vec<_>>(),
            "type": "scatter",
            "mode": "lines",
            "hovertemplate": "Year: %{x}<br>Growth Rate: %{y:.2f}%<br><extra></extra>",
        }]);
        let layout = chart_layout(
            &format!("Population Growth Rate for {}", analysis.country),
            "Growth Rate (%)",
            ".2f",
        );
        push_plot(html, "growth-chart", &trace, &layout);
    }

    html.push_str(
        "<h3>Raw Data</h3>\n<table>\n<tr><th>Year</th><th>Population</th><th>Growth Rate (%)</th></tr>\n",
    );
    for d in data {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            d.year,
            format_thousands(d.population),
            format_rate(d.growth_rate)
        );
    }
    html.push_str("</table>\n");

    let _ = writeln!(
        html,
        r#"<p><a href="/export.csv?country={country}&amp;start={}&amp;end={}" download="population_data_{country}.csv"><button type="button">Export to CSV</button></a></p>"#,
        form.start, form.end
    );
}

fn metric(label: &str, value: &str) -> String {
    format!(
        "<div class=\"metric\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>\n",
        escape_html(label),
        escape_html(value)
    )
}

fn chart_layout(title: &str, y_title: &str, tickformat: &str) -> serde_json::Value {
    json!({
        "title": { "text": title },
        "template": "plotly_white",
        "xaxis": { "title": { "text": "Year" }, "dtick": 5 },
        "yaxis": { "title": { "text": y_title }, "tickformat": tickformat },
    })
}

fn push_plot(html: &mut String, id: &str, trace: &serde_json::Value, layout: &serde_json::Value) {
    let _ = writeln!(
        html,
        "<script>Plotly.newPlot(\"{id}\", {}, {}, {{\"responsive\": true}});</script>",
        script_json(trace),
        script_json(layout)
    );
}

/// JSON that is safe to inline in a `<script>` element.
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

/// Formats an integer with `,` thousands separators.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Growth rate with two decimals, or `N/A` when absent.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{r:.2}"),
        None => "N/A".to_string(),
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze_population_trends;

    fn form() -> FormValues {
        FormValues {
            country: "USA".into(),
            start: 2000,
            end: 2001,
        }
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(331_501_080), "331,501,080");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(Some(1.23456)), "1.23");
        assert_eq!(format_rate(Some(-0.5)), "-0.50");
        assert_eq!(format_rate(None), "N/A");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"x\"</b>"), "&lt;b&gt;&quot;x&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_intro_page_has_form_bounds() {
        let html = render_page(&DashboardConfig::default(), &form(), PageBody::Intro);
        assert!(html.contains(r#"min="1960""#));
        assert!(html.contains(r#"max="2023""#));
        assert!(html.contains(r#"value="USA""#));
        assert!(!html.contains("population-chart"));
    }

    #[test]
    fn test_results_page_without_growth_shows_warning() {
        let data = vec![PopulationData::new("USA", 2000, 282_162_411)];
        let analysis = analyze_population_trends(&data).unwrap();

        let html = render_page(
            &DashboardConfig::default(),
            &form(),
            PageBody::Results {
                data: &data,
                analysis: &analysis,
            },
        );

        assert!(html.contains("282,162,411"));
        assert!(html.contains("population-chart"));
        assert!(html.contains(NO_GROWTH_MESSAGE));
        assert!(html.contains("N/A"));
        assert!(html.contains("population_data_USA.csv"));
    }

    #[test]
    fn test_results_page_with_growth_has_chart() {
        let mut data = vec![
            PopulationData::new("USA", 2000, 100),
            PopulationData::new("USA", 2001, 102),
        ];
        crate::api::apply_growth_rates(&mut data);
        let analysis = analyze_population_trends(&data).unwrap();

        let html = render_page(
            &DashboardConfig::default(),
            &form(),
            PageBody::Results {
                data: &data,
                analysis: &analysis,
            },
        );

        assert!(html.contains("growth-chart"));
        assert!(html.contains("2.00%"));
        assert!(!html.contains(NO_GROWTH_MESSAGE));
    }
}
