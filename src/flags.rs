use std::path::PathBuf;
use std::sync::OnceLock;

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(default)
}

// Install env_logger on session start (console redirection equivalent)
pub fn console() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("AI_CONSOLE", false))
}

pub fn quiet() -> bool {
    static ON: OnceLock<bool> = OnceLock::new();
    *ON.get_or_init(|| env_flag("AI_QUIET", false))
}

pub fn config_path() -> PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        std::env::var("AI_CONFIG")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("ai_audio.json"))
    })
    .clone()
}

pub fn audio_buffer_frames() -> usize {
    static N: OnceLock<usize> = OnceLock::new();
    *N.get_or_init(|| env_usize("AUDIO_BUFFER_FRAMES", 32768))
}

pub fn audio_chunk_frames() -> usize {
    static N: OnceLock<usize> = OnceLock::new();
    *N.get_or_init(|| env_usize("AUDIO_CHUNK_FRAMES", 256))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_accepts_common_truthy_spellings() {
        std::env::set_var("AI_TEST_FLAG_ON", "on");
        std::env::set_var("AI_TEST_FLAG_ZERO", "0");
        assert!(env_flag("AI_TEST_FLAG_ON", false));
        assert!(!env_flag("AI_TEST_FLAG_ZERO", true));
        assert!(env_flag("AI_TEST_FLAG_MISSING", true));
    }

    #[test]
    fn env_usize_rejects_zero_and_garbage() {
        std::env::set_var("AI_TEST_USIZE_ZERO", "0");
        std::env::set_var("AI_TEST_USIZE_BAD", "lots");
        std::env::set_var("AI_TEST_USIZE_OK", "512");
        assert_eq!(env_usize("AI_TEST_USIZE_ZERO", 7), 7);
        assert_eq!(env_usize("AI_TEST_USIZE_BAD", 7), 7);
        assert_eq!(env_usize("AI_TEST_USIZE_OK", 7), 512);
    }
}
