use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../../templates/index.html");

/// Render the index page, injecting the storage summary.
pub fn render_index(storage_display: &str) -> Html<String> {
    let html = INDEX_HTML.replace("{{ storage_display }}", storage_display);
    Html(html)
}
