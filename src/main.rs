use anyhow::Result;
use clap::Parser;

use grade_pilot::cli::Cli;
use grade_pilot::utils::logging;
use grade_pilot::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let mut app = App::initialize(config)?;
    app.run(cli.command).await
}
