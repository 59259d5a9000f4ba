pub mod cli;
pub mod errors;
pub mod loader;
pub mod svg;

use fdfwkt_config::AppConfig;
use tracing::info;

use cli::CliRequest;
use errors::FrontendError;

/// 执行一次命令行转换：加载、输出报告、可选绘图。
pub fn run_cli(request: &CliRequest, config: &AppConfig) -> Result<(), FrontendError> {
    info!(input = %request.input.display(), "开始转换 FDF 标注");
    cli::run(request, config)
}
