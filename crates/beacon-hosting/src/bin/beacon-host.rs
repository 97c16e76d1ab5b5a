use std::process::ExitCode;

use beacon_hosting::{
    HeartbeatService, HostBuilder, HostError, SettingsLoader, install_logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Host terminated unexpectedly");
            // 配置加载失败时 Subscriber 尚未安装，标准错误是唯一可见出口。
            eprintln!("beacon-host: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), HostError> {
    let loader = SettingsLoader::from_env();
    let settings = loader.load()?;
    install_logging(&settings.logging)?;

    tracing::info!(
        application = %settings.application.name,
        environment = loader.environment(),
        "Getting the motors running..."
    );

    let mut builder = HostBuilder::new(settings.clone());
    if settings.heartbeat.enabled {
        builder = builder.add_service(HeartbeatService::new(&settings.heartbeat));
    }
    builder.build().run().await
}
