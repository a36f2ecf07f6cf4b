//! Public URLs derived from an app's image name.

use reqwest::Url;

const APP_HOST_SENTINEL: &str = "app.";
const THEME_PARAM: &str = "__theme";

/// Per-app embed URL: the first `app` in `app_url` replaced by `image_name`.
///
/// Empty when the app has no image yet or `app_url` lacks the `app.` host segment.
/// Existing deployed links depend on this exact substitution.
pub fn embed_url(app_url: &str, image_name: &str) -> String {
    if image_name.is_empty() || !app_url.contains(APP_HOST_SENTINEL) {
        return String::new();
    }
    app_url.replacen("app", image_name, 1)
}

/// Sets the `__theme` query parameter, replacing any previous value.
pub fn themed_embed_url(src: &str, theme: &str) -> Option<String> {
    let mut url = Url::parse(src).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != THEME_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(THEME_PARAM, theme);
    Some(url.to_string())
}
