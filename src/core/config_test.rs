#[cfg(test)]
mod tests {

    use crate::core::{PlayerConfig, VideoMode};
    use std::path::PathBuf;

    #[test]
    fn test_player_config_default() {
        let config = PlayerConfig::default();
        assert_eq!(config.player_path, PathBuf::from("mplayer"));
        assert_eq!(config.video_mode, VideoMode::Pipe);
        assert!(config.video_output.is_none());
        assert_eq!(config.fifo_directory, std::env::temp_dir());
    }

    #[test]
    fn test_player_config_serialization() {
        let mut config = PlayerConfig::default();
        config.player_path = PathBuf::from("/opt/mplayer/bin/mplayer");
        config.video_mode = VideoMode::Embedded { window_id: 0x2e00007 };
        config.video_output = Some("xv".to_string());

        let serialized = serde_json::to_string(&config).expect("Failed to serialize config");
        let deserialized: PlayerConfig =
            serde_json::from_str(&serialized).expect("Failed to deserialize config");

        assert_eq!(config.player_path, deserialized.player_path);
        assert_eq!(config.video_mode, deserialized.video_mode);
        assert_eq!(config.video_output, deserialized.video_output);
        assert_eq!(config.fifo_directory, deserialized.fifo_directory);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");

        let mut config = PlayerConfig::default();
        config.video_output = Some("gl".to_string());
        config.save_to(&path).expect("Failed to save config");

        let loaded = PlayerConfig::load_from(&path).expect("Failed to load config");
        assert_eq!(loaded.video_output, Some("gl".to_string()));
        assert_eq!(loaded.player_path, config.player_path);
    }

    #[test]
    fn test_load_missing_file_creates_default() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.json");

        let config = PlayerConfig::load_from(&path).expect("Failed to load config");
        assert_eq!(config.player_path, PathBuf::from("mplayer"));
        assert!(path.exists(), "load_from should write the default config");
    }

    #[test]
    fn test_load_corrupt_file_recovers_with_defaults() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").expect("Failed to write corrupt config");

        let config = PlayerConfig::load_from(&path).expect("Failed to recover config");
        assert_eq!(config.video_mode, VideoMode::Pipe);

        // The corrupt file must have been replaced with a parseable one
        let reloaded = PlayerConfig::load_from(&path).expect("Failed to reload config");
        assert_eq!(reloaded.player_path, config.player_path);
    }
}
