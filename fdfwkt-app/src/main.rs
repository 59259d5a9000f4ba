use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fdfwkt_config::{AppConfig, ConfigError, OutputFormat};
use fdfwkt_frontend::cli::CliRequest;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(name = "fdfwkt")]
#[command(version, about = "Extract FDF markup annotations as WKT geometry", long_about = None)]
struct Args {
    /// 输入 FDF 文件
    input: PathBuf,

    /// 配置文件路径，缺省时按 FDFWKT_CONFIG 与 ./config/default.toml 查找
    #[arg(long)]
    config: Option<PathBuf>,

    /// 报告格式，覆盖配置文件中的 output.format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// 将标注绘制为 SVG 并写入该路径
    #[arg(long = "svg", value_name = "OUT.svg")]
    svg: Option<PathBuf>,

    /// 画布边长（英寸）
    #[arg(long)]
    size: Option<f64>,

    #[arg(long)]
    dpi: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Wkt,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Wkt => OutputFormat::Wkt,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    let args = Args::parse();

    let (mut config, config_error) = load_configuration(args.config.clone());
    init_logging(&config);
    if let Some(err) = &config_error {
        report_config_error(err);
    }
    info!("启动 fdfwkt");

    if let Some(size) = args.size {
        config.render.size_inches = size;
    }
    if let Some(dpi) = args.dpi {
        config.render.dpi = dpi;
    }

    let request = CliRequest {
        input: args.input,
        format: args.format.map(OutputFormat::from).unwrap_or(config.output.format),
        svg_output: args.svg,
    };

    if let Err(err) = fdfwkt_frontend::run_cli(&request, &config) {
        error!(error = %err, "转换失败");
        std::process::exit(1);
    }
}

/// 加载配置。失败时回退为默认配置，并把错误交给调用方在日志初始化之后记录。
fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

fn report_config_error(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载配置失败，使用内建默认值");
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
