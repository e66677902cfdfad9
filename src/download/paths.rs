use std::path::{Path, PathBuf};

/// English month name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    u8::try_from(month)
        .ok()
        .and_then(|m| chrono::Month::try_from(m).ok())
        .map(|m| m.name())
}

/// Clean a filename by removing characters that are invalid on common
/// filesystems: `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
pub fn clean_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

/// Final path segment of a remote clip address, cleaned for local use.
pub fn clip_basename(address: &str) -> String {
    let segment = address
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(address);
    clean_filename(segment)
}

/// Build the local destination for a feed record:
/// `{output_root}/{year}/{month}/{day}/{basename}`.
///
/// The date components are split straight out of the `created_at` string
/// (`YYYY-MM-DDTHH:MM:SS+00:00`). The month directory uses the English
/// month name when the numeric month is 1–12; otherwise the raw component
/// is kept unchanged rather than guessing.
pub fn local_destination(output_root: &Path, created_at: &str, address: &str) -> PathBuf {
    let date = created_at.split('T').next().unwrap_or(created_at);
    let mut parts = date.splitn(3, '-');
    let year = parts.next().unwrap_or_default();
    let month = parts.next().unwrap_or_default();
    let day = parts.next().unwrap_or_default();

    let month_dir = month
        .parse::<u32>()
        .ok()
        .and_then(month_name)
        .map(str::to_string)
        .unwrap_or_else(|| month.to_string());

    output_root
        .join(year)
        .join(month_dir)
        .join(day)
        .join(clip_basename(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_names_cover_year() {
        assert_eq!(month_name(1), Some("January"));
        assert_eq!(month_name(6), Some("June"));
        assert_eq!(month_name(12), Some("December"));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn clean_filename_strips_invalid_chars() {
        assert_eq!(clean_filename("clip:1.mp4"), "clip1.mp4");
        assert_eq!(clean_filename("a/b\\c*d?e\"f<g>h|i"), "abcdefghi");
        assert_eq!(clean_filename("normal.mp4"), "normal.mp4");
    }

    #[test]
    fn basename_takes_last_segment() {
        assert_eq!(clip_basename("/media/clips/front-door.mp4"), "front-door.mp4");
        assert_eq!(clip_basename("front-door.mp4"), "front-door.mp4");
        assert_eq!(clip_basename("/media/clips/"), "clips");
    }

    #[test]
    fn destination_uses_month_name() {
        let path = local_destination(
            Path::new("/out"),
            "2023-04-05T06:07:08+00:00",
            "/media/clips/yard.mp4",
        );
        assert_eq!(path, Path::new("/out/2023/April/05/yard.mp4"));
    }

    #[test]
    fn destination_keeps_raw_month_when_out_of_range() {
        let path = local_destination(
            Path::new("/out"),
            "2023-13-05T06:07:08+00:00",
            "/media/clips/yard.mp4",
        );
        assert_eq!(path, Path::new("/out/2023/13/05/yard.mp4"));
    }

    #[test]
    fn destination_keeps_raw_month_when_not_numeric() {
        let path = local_destination(
            Path::new("/out"),
            "2023-??-05T06:07:08+00:00",
            "clip.mp4",
        );
        assert_eq!(path, Path::new("/out/2023/??/05/clip.mp4"));
    }

    #[test]
    fn destination_cleans_basename() {
        let path = local_destination(
            Path::new("/out"),
            "2023-01-02T03:04:05+00:00",
            "/media/cam:1/clip*.mp4",
        );
        assert_eq!(path, Path::new("/out/2023/January/02/clip.mp4"));
    }
}
