//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders a snapshot of the test tree as a standalone HTML page: per-status
//! totals followed by one table per module with localized descriptions and,
//! for failed methods, the captured error text.
//!
//! 将测试树快照渲染为独立的 HTML 页面：先是按状态统计的总数，然后是每个模块一张表格，
//! 包含本地化描述以及失败方法捕获的错误文本。

use anyhow::Result;
use chrono::Local;
use maud::{DOCTYPE, Markup, html};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::models::{Status, TestTree};
use crate::infra::{fs, t};

const HTML_STYLE: &str = r#"
body { font-family: sans-serif; margin: 2em; color: #222; }
table { border-collapse: collapse; width: 100%; margin-bottom: 2em; }
th, td { border: 1px solid #ddd; padding: 6px 10px; text-align: left; }
th { background: #f4f4f4; }
.summary-container { display: flex; gap: 1.5em; margin-bottom: 2em; }
.summary-item { display: flex; flex-direction: column; align-items: center; }
.count { font-size: 1.6em; font-weight: bold; }
.duration-cell { text-align: right; white-space: nowrap; }
pre.output-content { white-space: pre-wrap; margin: 0; font-size: 0.85em; }
.status-pass { color: #28C025; }
.status-fail { color: #E32C2E; }
.status-error { color: #E4742C; }
.status-skip { color: #259EBF; }
.status-expected { color: #3C25BF; }
.status-unexpected { color: #C82788; }
.status-cancelled { color: #B8860B; }
.status-running, .status-not-run { color: #888; }
"#;

/// Renders the report markup.
pub fn render_html_report(tree: &TestTree, locale: &str) -> Markup {
    let mut totals: BTreeMap<Status, usize> = BTreeMap::new();
    for module in tree.module_names() {
        for (status, count) in tree.counts(module) {
            *totals.entry(status).or_insert(0) += count;
        }
    }
    let total: usize = totals.values().sum();

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (maud::PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                p { (t!("html_report.generated_at", locale = locale, time = Local::now().format("%Y-%m-%d %H:%M:%S"))) }

                div class="summary-container" {
                    div class="summary-item" {
                        span class="count" { (total) }
                        span class="label" { (t!("html_report.total", locale = locale)) }
                    }
                    @for (status, count) in &totals {
                        div class="summary-item" {
                            span class={ "count " (status.css_class()) } { (count) }
                            span class="label" { (status.label(locale)) }
                        }
                    }
                }

                @for module in tree.modules() {
                    h2 { (module.description(locale)) " (" (module.name()) ")" }
                    table {
                        thead {
                            tr {
                                th { (t!("html_report.header.path", locale = locale)) }
                                th { (t!("html_report.header.description", locale = locale)) }
                                th { (t!("html_report.header.status", locale = locale)) }
                                th class="duration-cell" { (t!("html_report.header.duration", locale = locale)) }
                            }
                        }
                        tbody {
                            @for method in module.methods() {
                                tr {
                                    td { code { (method.path()) } }
                                    td { (method.description(locale)) }
                                    td class=(method.status().css_class()) { (method.status().label(locale)) }
                                    td class="duration-cell" {
                                        @match method.duration() {
                                            Some(d) => { (format!("{:.2}s", d.as_secs_f64())) }
                                            None => { "N/A" }
                                        }
                                    }
                                }
                                @if method.status().is_failure() {
                                    @if let Some(error) = method.error() {
                                        tr {
                                            td colspan="4" { pre class="output-content" { (error) } }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Generates an HTML report of the current state of `tree` at `output_path`.
///
/// # Errors / 错误
/// Returns an error if the file or its parent directory cannot be written.
/// 如果无法写入文件或其父目录，则返回错误。
pub fn generate_html_report(tree: &TestTree, output_path: &Path, locale: &str) -> Result<()> {
    let markup = render_html_report(tree, locale);
    fs::write_file(output_path, markup.into_string())
}
