use crate::camera::CameraSpec;
use crate::config::JscrConfig;
use std::path::PathBuf;

/// Filename timestamp, expanded by the recorder for every new segment
const SEGMENT_TIMESTAMP: &str = "%Y-%m-%d_%H-%M-%S";

/// A fully resolved recorder launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Append-mode file receiving the recorder's stdout and stderr
    pub log_path: PathBuf,
}

impl RecorderInvocation {
    /// Value following `flag` in the argument list
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|index| self.args.get(index + 1))
            .map(String::as_str)
    }

    /// Command line for logs with `secret` masked
    pub fn redacted_command_line(&self, secret: &str) -> String {
        let line = std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        if secret.is_empty() {
            line
        } else {
            line.replace(secret, "***")
        }
    }
}

/// Builds the segmenting ffmpeg command line shared by every camera
#[derive(Debug, Clone)]
pub struct RecorderCommand {
    program: String,
    segment_seconds: u64,
    output_directory: PathBuf,
    log_directory: PathBuf,
    segment_format: String,
    video_codec: String,
    audio_codec: String,
}

impl RecorderCommand {
    pub fn from_config(config: &JscrConfig) -> Self {
        Self {
            program: config.main.ffmpeg_binary.clone(),
            segment_seconds: config.segment_seconds(),
            output_directory: config.main.output_directory.clone(),
            log_directory: config.log_directory().to_path_buf(),
            segment_format: config.main.segment_format.clone(),
            video_codec: config.main.video_codec.clone(),
            audio_codec: config.main.audio_codec.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `<output>/<camera>-%Y-%m-%d_%H-%M-%S.<format>`
    pub fn output_template(&self, camera: &CameraSpec) -> PathBuf {
        self.output_directory.join(format!(
            "{}-{}.{}",
            camera.name(),
            SEGMENT_TIMESTAMP,
            self.segment_format
        ))
    }

    pub fn log_path(&self, camera: &CameraSpec) -> PathBuf {
        self.log_directory.join(format!("{}.log", camera.name()))
    }

    pub fn invocation(&self, camera: &CameraSpec) -> RecorderInvocation {
        let args = vec![
            "-i".to_string(),
            camera.url(),
            "-vcodec".to_string(),
            self.video_codec.clone(),
            "-acodec".to_string(),
            self.audio_codec.clone(),
            "-map".to_string(),
            "0".to_string(),
            "-f".to_string(),
            "segment".to_string(),
            "-segment_time".to_string(),
            self.segment_seconds.to_string(),
            "-reset_timestamps".to_string(),
            "1".to_string(),
            "-strftime".to_string(),
            "1".to_string(),
            "-segment_format".to_string(),
            self.segment_format.clone(),
            self.output_template(camera).to_string_lossy().into_owned(),
        ];

        RecorderInvocation {
            program: self.program.clone(),
            args,
            log_path: self.log_path(camera),
        }
    }
}
