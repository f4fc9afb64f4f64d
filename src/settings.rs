use std::fs;
use std::path::Path;

use crate::error::AppError;
use crate::photo_validator::ValidatorConfig;

/// 读取 JSON 设置文件；缺失字段使用默认值。
pub fn load_config(path: &Path) -> Result<ValidatorConfig, AppError> {
    if !path.exists() {
        return Err(AppError::Settings(format!("设置文件不存在: {}", path.display())));
    }

    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str::<ValidatorConfig>(&content)
        .map_err(|e| AppError::Settings(format!("解析设置文件失败: {}", e)))?;
    config.validate()?;

    log::info!("⚙️ 已加载设置文件: {}", path.display());
    Ok(config)
}

/// 以缩进格式写入设置文件，必要时创建父目录。
pub fn save_config(path: &Path, config: &ValidatorConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Settings(format!("创建设置目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Settings(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}
