use anyhow::{anyhow, Context};
use goal_client::GoalClient;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use stepper_core::builder::DefinitionBuilder;
use stepper_core::catalog::Catalog;
use stepper_core::config::{Config, WarnLevel};
use stepper_core::dispatcher::Dispatcher;
use stepper_core::driver::{DrivingLoop, LoopHandle};
use stepper_core::remote::ExecutionHandle;

pub fn run(root: &Path, port: Option<u16>, action_server: Option<&str>) -> anyhow::Result<()> {
    let mut config = Config::load(root).context("failed to load config")?;
    if let Some(server) = action_server {
        config.action_server = server.to_string();
    }
    for w in config.validate_at(root) {
        match w.level {
            WarnLevel::Error => anyhow::bail!("invalid config: {}", w.message),
            WarnLevel::Warning => tracing::warn!("{}", w.message),
        }
    }

    let client = GoalClient::new(&config.action_server, config.request_timeout())
        .with_context(|| format!("invalid action server '{}'", config.action_server))?;
    let handle: Arc<dyn ExecutionHandle> = Arc::new(client);

    let catalog = Catalog::open(config.catalog_roots(root));
    let builder = DefinitionBuilder::new(handle.clone(), config.script_timeout());
    let dispatcher = Arc::new(Dispatcher::new(catalog, Box::new(builder), handle));

    let driver = DrivingLoop::new(dispatcher.clone(), config.tick_period())
        .spawn()
        .context("failed to start driving loop")?;

    let port = port.unwrap_or(config.server.port);
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!(
            "stepper → http://localhost:{actual_port}  ({} actions, execution service {})",
            dispatcher.list_actions(None).len(),
            config.action_server
        );

        tokio::select! {
            res = stepper_server::serve_on(listener, dispatcher.clone(), std::future::pending::<()>()) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
            _ = loop_exited(&driver) => Err(anyhow!("driving loop stopped unexpectedly")),
        }
    });

    driver
        .shutdown(&dispatcher)
        .context("driving loop failed")?;
    result
}

async fn loop_exited(driver: &LoopHandle) {
    while !driver.is_finished() {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}
