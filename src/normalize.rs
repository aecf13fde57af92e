use url::Url;

/// Rewrites a watch-page URL carrying a `v` query parameter into the short
/// `https://youtu.be/<id>` form, keeping a non-empty `t` timestamp when one
/// is present. Inputs that do not parse as a URL, or that carry no usable
/// `v` parameter, come back unchanged.
pub fn normalize(input: &str) -> String {
    let Ok(parsed) = Url::parse(input) else {
        return input.to_string();
    };

    let video_id = parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty());

    let Some(video_id) = video_id else {
        return input.to_string();
    };

    let timestamp = parsed
        .query_pairs()
        .find(|(key, _)| key == "t")
        .map(|(_, value)| value.into_owned())
        .filter(|t| !t.is_empty());

    match timestamp {
        Some(t) => format!("https://youtu.be/{video_id}?t={t}"),
        None => format!("https://youtu.be/{video_id}"),
    }
}
