use std::path::PathBuf;

use crate::downloader::tools::{ToolManager, ToolType};
use crate::downloader::traits::Transcoder;

/// ffmpeg as found by the tool manager
pub struct FfmpegTranscoder {
    tools: ToolManager,
}

impl FfmpegTranscoder {
    pub fn new(tools: ToolManager) -> Self {
        Self { tools }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &'static str {
        ToolType::Ffmpeg.as_str()
    }

    fn locate(&self) -> Option<PathBuf> {
        self.tools.locate(ToolType::Ffmpeg)
    }
}
