//! 多米诺骨牌扫描器

use std::path::Path;
use std::sync::Arc;

use crate::core::domino::{
    ClassificationModel, CycleReport, DetectionModel, DominoError, DominoPipeline,
    DominoScanManager, Frame, ScanConfig, ScanStats, ScoreSnapshot, YuvFrame,
};
use flutter_rust_bridge::frb;
use log::info;

pub const CONFIG_FILE: &str = "scanner.json5";

/// Reads `<models_dir>/scanner.json5`, or the defaults when there is none.
fn load_config(models_dir: &Path) -> Result<ScanConfig, DominoError> {
    let path = models_dir.join(CONFIG_FILE);
    if path.exists() {
        ScanConfig::load(&path)
    } else {
        Ok(ScanConfig::default())
    }
}

/// 骨牌扫描器 - 检测 + 点数识别 + 计分
///
/// ```dart
/// final scanner = await DominoScanner.create(modelsDir: "/path/to/models");
/// scanner.start();
/// final report = await scanner.processYuvFrame(frame: yuv);
/// final total = scanner.score().totalPoints;
/// scanner.stop();
/// ```
#[frb(opaque)]
pub struct DominoScanner {
    manager: DominoScanManager,
}

impl DominoScanner {
    /// 创建扫描器并加载模型
    ///
    /// models_dir 下需要包含：
    /// - detector.onnx
    /// - pip_classifier.onnx (可选，缺失时使用启发式计数)
    /// - scanner.json5 (可选)
    #[frb(dart_async)]
    pub async fn create(models_dir: String) -> Result<Self, DominoError> {
        crate::init_logging();
        info!("🎲 DominoScanner: initializing with models_dir: {}", models_dir);
        Self::open(Path::new(&models_dir))
    }

    #[frb(ignore)]
    pub fn open(dir: &Path) -> Result<Self, DominoError> {
        let config = load_config(dir)?;
        let (detector, pip_model) = Self::load_models(dir, &config)?;

        let scanner = Self::with_models(detector, pip_model, config);
        info!(
            "✅ DominoScanner ready (detector: {}, pips: {})",
            scanner.manager.pipeline().detector_name(),
            scanner.manager.pipeline().classifier().strategy_name()
        );
        Ok(scanner)
    }

    #[cfg(feature = "backend-tract")]
    fn load_models(
        dir: &Path,
        config: &ScanConfig,
    ) -> Result<(Arc<dyn DetectionModel>, Option<Arc<dyn ClassificationModel>>), DominoError> {
        crate::core::domino::tract::load_models(
            dir,
            config.detector_input_size,
            config.pip_input_size,
        )
    }

    #[cfg(not(feature = "backend-tract"))]
    fn load_models(
        _dir: &Path,
        _config: &ScanConfig,
    ) -> Result<(Arc<dyn DetectionModel>, Option<Arc<dyn ClassificationModel>>), DominoError> {
        Err(DominoError::BackendUnavailable(
            "built without the backend-tract feature".to_string(),
        ))
    }

    /// Builds a scanner around already-loaded models.
    #[frb(ignore)]
    pub fn with_models(
        detector: Arc<dyn DetectionModel>,
        pip_model: Option<Arc<dyn ClassificationModel>>,
        config: ScanConfig,
    ) -> Self {
        Self {
            manager: DominoScanManager::new(DominoPipeline::new(detector, pip_model, config)),
        }
    }

    /// 开始扫描会话（清空得分）
    #[frb(sync)]
    pub fn start(&self) -> Result<(), DominoError> {
        self.manager.start()
    }

    /// 结束扫描会话
    #[frb(sync)]
    pub fn stop(&self) -> Result<(), DominoError> {
        self.manager.stop()
    }

    #[frb(sync, getter)]
    pub fn is_active(&self) -> bool {
        self.manager.is_active()
    }

    /// 处理 RGB 帧
    #[frb]
    pub fn process_rgb_frame(&self, frame: Frame) -> CycleReport {
        self.manager.process_frame(&frame)
    }

    /// 处理相机 YUV420 帧
    #[frb]
    pub fn process_yuv_frame(&self, frame: YuvFrame) -> CycleReport {
        self.manager.process_yuv_frame(&frame)
    }

    /// 当前得分
    #[frb(sync)]
    pub fn score(&self) -> Result<ScoreSnapshot, DominoError> {
        self.manager.snapshot()
    }

    /// 得分 JSON，交给持久化层保存
    #[frb(sync)]
    pub fn score_json(&self) -> Result<String, DominoError> {
        self.manager.snapshot()?.to_json()
    }

    /// 获取扫描统计
    #[frb(sync, getter)]
    pub fn stats(&self) -> ScanStats {
        self.manager.stats()
    }

    #[frb(sync)]
    pub fn reset_stats(&self) {
        self.manager.reset_stats()
    }
}

impl Drop for DominoScanner {
    fn drop(&mut self) {
        info!("🗑️ DominoScanner: released");
    }
}
