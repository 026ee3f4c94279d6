use url::Url;

/// Pulls the video id out of the YouTube URL shapes users actually paste:
/// `youtube.com/watch?v=`, `youtu.be/` and `youtube.com/embed/`.
pub fn extract_video_id(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?;

    if host == "youtu.be" {
        let id = parsed.path_segments()?.next()?;
        return non_empty(id);
    }

    if host == "youtube.com" || host.ends_with(".youtube.com") {
        if parsed.path() == "/watch" {
            let id = parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())?;
            return non_empty(&id);
        }
        let mut segments = parsed.path_segments()?;
        if segments.next() == Some("embed") {
            return non_empty(segments.next()?);
        }
    }

    None
}

/// Watch link with autoplay, used when handing the video off to the
/// browser.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}&autoplay=1")
}

fn non_empty(id: &str) -> Option<String> {
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
