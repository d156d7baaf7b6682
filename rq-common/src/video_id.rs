//! Video identifier normalization
//!
//! Maps raw locators (watch URLs, short links, embed links, percent-encoded
//! links, bare ids) to the canonical 11-character video id. Normalization never
//! fails: input that matches no known locator shape is returned unchanged, so
//! callers must tolerate non-canonical output.

/// Length of a canonical video id
pub const VIDEO_ID_LEN: usize = 11;

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Locator markers that immediately precede a video id
const ID_MARKERS: &[&str] = &[
    "watch?v=",
    "/videos/",
    "/embed/",
    "youtu.be/",
    "/v/",
    "/e/",
    "watch?v%3D",
    "watch?feature=player_embedded&v=",
    "%2Fvideos%2F",
    "embed%2F",
    "youtu.be%2F",
    "%2Fv%2F",
];

/// Characters that end an id inside a locator
const ID_TERMINATORS: &[char] = &['#', '&', '?', '\n'];

/// Normalize a raw locator to a video id
///
/// - Empty or whitespace-only input yields an empty string.
/// - An 11-character input without `/` or `?` is returned as-is.
/// - Otherwise the text after the leftmost known marker, up to the first
///   `#`, `&`, `?` or newline, is returned.
/// - With no marker the input is returned unchanged.
///
/// # Examples
///
/// ```
/// use rq_common::video_id::normalize;
///
/// assert_eq!(normalize("https://youtu.be/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
/// assert_eq!(normalize("dQw4w9WgXcQ"), "dQw4w9WgXcQ");
/// assert_eq!(normalize("not-a-url-or-id"), "not-a-url-or-id");
/// ```
pub fn normalize(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    if is_bare_id(input) {
        return input.to_string();
    }

    match id_start(input) {
        Some(start) => {
            let rest = &input[start..];
            let end = rest.find(ID_TERMINATORS).unwrap_or(rest.len());
            rest[..end].to_string()
        }
        None => input.to_string(),
    }
}

/// Canonical watch URL for a video id
pub fn canonical_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL_PREFIX, video_id)
}

fn is_bare_id(input: &str) -> bool {
    input.chars().count() == VIDEO_ID_LEN && !input.contains('/') && !input.contains('?')
}

/// Byte offset where the id begins: the end of the marker occurrence whose
/// id starts leftmost. Ties go to the earlier marker in `ID_MARKERS`.
fn id_start(input: &str) -> Option<usize> {
    ID_MARKERS
        .iter()
        .filter_map(|marker| input.find(marker).map(|pos| pos + marker.len()))
        .min()
}
