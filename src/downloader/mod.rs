mod simple;

pub use simple::SimpleDownloader;

/// File names for a selection of `count` media URLs.
///
/// A single URL keeps the supplied name (`.mp4` appended when missing),
/// falling back to `output.mp4`. Multiple URLs become `<base>-<n>.mp4`
/// with a 1-based index, where `<base>` is the supplied name minus any
/// `.mp4` suffix, or `output` when empty.
pub fn output_file_names(file_name: Option<&str>, count: usize) -> Vec<String> {
    let name = file_name.unwrap_or("");

    if count == 1 {
        let single = if name.is_empty() || name == ".mp4" {
            "output.mp4".to_string()
        } else if name.ends_with(".mp4") {
            name.to_string()
        } else {
            format!("{name}.mp4")
        };
        return vec![single];
    }

    let base = name.strip_suffix(".mp4").unwrap_or(name);
    let base = if base.is_empty() { "output" } else { base };
    (1..=count).map(|i| format!("{base}-{i}.mp4")).collect()
}
