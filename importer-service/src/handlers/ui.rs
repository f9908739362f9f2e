//! 静态页面

use axum::response::Html;

/// Serves the single-page tabbed UI.
pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}
