//! Wiring of the real executor, health poller and stage actions

use crate::executor::{CommandExecutor, ExecutorConfig, WorkingContext};
use crate::health::HealthPoller;
use crate::infrastructure::{Config, DockerCli, HttpProbe};
use crate::pipeline::{
    PipelineController, PipelineReport, PipelineState, RunOptions, ServiceStages, StageEnvironment,
};

/// Runs the pipeline for `options` against the project described by `config`
pub fn run_pipeline(config: &Config, options: RunOptions) -> (PipelineState, PipelineReport) {
    let executor = CommandExecutor::with_config(ExecutorConfig {
        cwd: config.project_root.clone(),
        default_timeout: config.timeouts.default,
        monitor: options.monitor,
        ..ExecutorConfig::default()
    });

    let status = DockerCli::new(executor.clone(), config.timeouts.status_query);
    let poller = HealthPoller::new(status, HttpProbe::new(), config.health);

    let stages = ServiceStages::new(
        executor,
        poller,
        StageEnvironment {
            profile: options.service.profile(),
            root: WorkingContext::new(&config.project_root),
            local: options.local,
            timeouts: config.timeouts,
            log_tail_lines: config.log_tail_lines,
        },
    );

    tracing::debug!(
        project_root = %config.project_root.display(),
        local = options.local,
        skip_prerequisites = options.skip_prerequisites,
        "Resolved run options"
    );

    PipelineController::new(stages)
        .with_monitor(options.monitor)
        .run(options.service, &options.plan())
}
