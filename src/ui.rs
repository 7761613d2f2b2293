use axum::response::Html;

static DASHBOARD_HTML: &str = include_str!("../assets/dashboard.html");

/// Serve the embedded dashboard page.
pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}
