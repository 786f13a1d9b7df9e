//! Joining an entry name onto a location string

use std::path::Path;

use url::Url;

/// Append `name` to `location` as its last path segment
///
/// URLs keep their query string (`s3://b/?region=x` + `a.yml` gives
/// `s3://b/a.yml?region=x`). Bare paths use a platform path join.
pub fn join_location(location: &str, name: &str) -> String {
    if let Ok(mut url) = Url::parse(location) {
        // Single-letter schemes are Windows drive letters
        if url.scheme().len() > 1 {
            let pushed = match url.path_segments_mut() {
                Ok(mut segments) => {
                    segments.pop_if_empty().push(name);
                    true
                }
                Err(()) => false,
            };
            if pushed {
                return url.to_string();
            }
        }
    }
    Path::new(location).join(name).to_string_lossy().into_owned()
}
