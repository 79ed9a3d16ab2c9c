/// Format seconds as `HH:MM:SS.mmm`, the range syntax yt-dlp understands
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Format seconds as an SRT timestamp, `HH:MM:SS,mmm`
pub fn format_srt_timestamp(seconds: f64) -> String {
    format_timestamp(seconds).replacen('.', ",", 1)
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Turn free text into a lowercase, underscore-separated file name stem
pub fn sanitize_for_filename(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    if joined.is_empty() {
        "clip".to_string()
    } else {
        joined
    }
}

/// Default clip name: query stem plus the clip start in whole seconds
pub fn default_clip_name(query: &str, clip_start: f64, extension: &str) -> String {
    let stem: String = sanitize_for_filename(query).chars().take(40).collect();
    format!("{}_{}.{}", stem, clip_start.max(0.0).floor() as u64, extension)
}

/// Check if the current environment has the ffmpeg tools
pub async fn check_dependencies() -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available("ffmpeg", "-version").await {
        missing.push("ffmpeg - required for trimming and section downloads".to_string());
    }

    if !check_command_available("ffprobe", "-version").await {
        missing.push("ffprobe - recommended for checking clip durations".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00.000");
        assert_eq!(format_timestamp(-3.0), "00:00:00.000");
        assert_eq!(format_timestamp(61.5), "00:01:01.500");
        assert_eq!(format_timestamp(3723.0456), "01:02:03.046");
        assert_eq!(format_timestamp(59.9996), "00:01:00.000");
    }

    #[test]
    fn test_format_srt_timestamp() {
        assert_eq!(format_srt_timestamp(2.25), "00:00:02,250");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_sanitize_for_filename() {
        assert_eq!(sanitize_for_filename("Never Gonna Give You Up!"), "never_gonna_give_you_up");
        assert_eq!(sanitize_for_filename("test/file?name"), "testfilename");
        assert_eq!(sanitize_for_filename("  spaced  out "), "spaced_out");
        assert_eq!(sanitize_for_filename("?!"), "clip");
    }

    #[test]
    fn test_default_clip_name() {
        assert_eq!(default_clip_name("Hello, world", 12.9, "mp4"), "hello_world_12.mp4");
        let long = "a ".repeat(50);
        let name = default_clip_name(&long, 0.0, "mkv");
        assert_eq!(name.len(), 40 + "_0.mkv".len());
    }
}
