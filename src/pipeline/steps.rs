//! Stage actions
//!
//! [`StageActions`] is the seam between the pipeline controller and the work a
//! stage performs. [`ServiceStages`] is the real implementation: it drives the
//! external build and deploy tools for one service through a
//! [`CommandRunner`] and waits for local deployments with a [`HealthPoller`].

use super::errors::PipelineError;
use super::options::TimeoutPolicy;
use super::service::ServiceProfile;
use super::stage::{Stage, StagePlan};
use crate::executor::{CommandRunner, ExecOptions, WorkingContext};
use crate::health::{ContainerStatus, EndpointProbe, HealthPoller, PollOutcome};
use crate::infrastructure::docker::{DockerCli, compose_command};
use crate::infrastructure::find_latest_artifact;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").expect("valid version regex"));

/// Performs the work of a single stage
pub trait StageActions {
    /// Runs `stage` as part of `plan`.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] that ends the run.
    fn run_stage(&mut self, stage: Stage, plan: &StagePlan) -> Result<(), PipelineError>;
}

impl<T: StageActions + ?Sized> StageActions for &mut T {
    fn run_stage(&mut self, stage: Stage, plan: &StagePlan) -> Result<(), PipelineError> {
        (**self).run_stage(stage, plan)
    }
}

/// Where and how the stages of one service run
#[derive(Debug, Clone)]
pub struct StageEnvironment {
    /// Deployment parameters of the service
    pub profile: &'static ServiceProfile,
    /// Project root; every relative path resolves against it
    pub root: WorkingContext,
    /// Deploy to the local container engine
    pub local: bool,
    /// Command timeouts
    pub timeouts: TimeoutPolicy,
    /// Lines of container output collected when a health check fails
    pub log_tail_lines: u32,
}

/// A tool the prerequisite check looks for
struct Tool {
    name: &'static str,
    version_command: &'static str,
}

const DOCKER: Tool = Tool {
    name: "docker",
    version_command: "docker --version",
};
const NPM: Tool = Tool {
    name: "npm",
    version_command: "npm --version",
};
const MAVEN: Tool = Tool {
    name: "mvn",
    version_command: "mvn --version",
};
#[cfg(not(windows))]
const POWERSHELL: Tool = Tool {
    name: "pwsh",
    version_command: "pwsh --version",
};
#[cfg(windows)]
const POWERSHELL: Tool = Tool {
    name: "powershell",
    version_command: "powershell -NoProfile -Command $PSVersionTable.PSVersion.ToString()",
};

fn required_tools(plan: &StagePlan) -> Vec<Tool> {
    let mut tools = vec![DOCKER];
    if plan.contains(Stage::FrontendBuild) {
        tools.push(NPM);
    }
    if plan.contains(Stage::BackendBuild) {
        tools.push(MAVEN);
    }
    if plan.contains(Stage::AwsDeploy) {
        tools.push(POWERSHELL);
    }
    tools
}

/// Extracts the first dotted version number from tool output
fn parse_version(output: &str) -> Option<&str> {
    VERSION_PATTERN
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Returns false for a missing or empty directory
fn is_non_empty_dir(path: &Path) -> Result<bool, PipelineError> {
    match std::fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Builds and deploys one service with the external toolchain
pub struct ServiceStages<R, S, P> {
    runner: R,
    poller: HealthPoller<S, P>,
    env: StageEnvironment,
}

impl<R, S, P> ServiceStages<R, S, P>
where
    R: CommandRunner,
    S: ContainerStatus,
    P: EndpointProbe,
{
    /// Creates the stage actions
    #[must_use]
    pub fn new(runner: R, poller: HealthPoller<S, P>, env: StageEnvironment) -> Self {
        Self { runner, poller, env }
    }

    fn options(&self, stage: Stage) -> ExecOptions {
        ExecOptions::new()
            .timeout(self.env.timeouts.for_stage(stage))
            .within(&self.env.root)
    }

    fn run(&self, command: &str, options: &ExecOptions) -> Result<(), PipelineError> {
        self.runner.execute(command, options).into_result(command)?;
        Ok(())
    }

    fn check_prerequisites(&self, plan: &StagePlan) -> Result<(), PipelineError> {
        let options = self.options(Stage::PrerequisiteCheck);
        let mut missing = Vec::new();
        let mut details = Vec::new();

        for tool in required_tools(plan) {
            let result = self.runner.execute(tool.version_command, &options);
            if result.succeeded() {
                let output = format!("{}{}", result.stdout(), result.stderr());
                tracing::info!(
                    tool = tool.name,
                    version = parse_version(&output).unwrap_or("unknown"),
                    "Tool available"
                );
            } else {
                tracing::error!(tool = tool.name, "Tool not available");
                missing.push(tool.name.to_string());
                details.extend(result.errors().iter().map(|e| format!("{}: {e}", tool.name)));
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Prerequisite { missing, details })
        }
    }

    fn build_frontend(&self) -> Result<(), PipelineError> {
        let profile = self.env.profile;
        let frontend = self.env.root.enter(profile.frontend_dir)?;
        let options = ExecOptions::new()
            .timeout(self.env.timeouts.for_stage(Stage::FrontendBuild))
            .within(&frontend);

        let install = self
            .runner
            .execute("npm install", &options.clone().ignore_errors(true));
        if !install.succeeded() || !install.warnings().is_empty() {
            tracing::warn!("npm install failed, continuing with the build");
        }

        self.run("npm run build", &options)?;

        let dist = frontend.join(profile.frontend_dist);
        if !is_non_empty_dir(&dist)? {
            return Err(PipelineError::MissingPath {
                what: "Frontend build output".to_string(),
                path: dist,
            });
        }

        tracing::info!(output = %dist.display(), "Frontend built");
        Ok(())
    }

    fn build_backend(&self) -> Result<(), PipelineError> {
        let profile = self.env.profile;
        let command = format!(
            "mvn clean package -DskipTests -f {}",
            shell_words::quote(profile.backend_pom)
        );
        self.run(&command, &self.options(Stage::BackendBuild))?;

        match find_latest_artifact(self.env.root.path(), profile.artifact_glob) {
            Some(artifact) => {
                let size = artifact.metadata().map(|m| m.len()).unwrap_or(0);
                tracing::info!(artifact = %artifact.display(), size_bytes = size, "Backend packaged");
            }
            None => tracing::warn!(pattern = profile.artifact_glob, "Backend artifact not found"),
        }
        Ok(())
    }

    fn build_image(&self) -> Result<(), PipelineError> {
        let profile = self.env.profile;
        let compose = profile.compose_file(self.env.local);
        self.env.root.require_file(compose, "Docker Compose file")?;

        let command = compose_command(Path::new(compose), &["build", "--no-cache", profile.name]);
        self.run(&command, &self.options(Stage::ImageBuild))?;

        tracing::info!(service = profile.name, "Image built");
        Ok(())
    }

    fn deploy_local(&self) -> Result<(), PipelineError> {
        let profile = self.env.profile;
        let compose = Path::new(profile.compose_local);
        self.env.root.require_file(compose, "Docker Compose file")?;
        let options = self.options(Stage::LocalDeploy);

        // A failed teardown must not block the redeploy
        self.runner.execute(
            &compose_command(compose, &["down"]),
            &options.clone().ignore_errors(true),
        );
        self.run(&compose_command(compose, &["up", "-d", "--force-recreate"]), &options)?;

        let url = profile.local_health_url();
        match self.poller.poll(profile.container, Some(&url)) {
            PollOutcome::Healthy { attempts } => {
                tracing::info!(
                    container = profile.container,
                    ports = %profile.port_mapping(),
                    attempts,
                    "Service healthy"
                );
                self.log_access_points();
                Ok(())
            }
            outcome => {
                let docker = DockerCli::new(&self.runner, self.env.timeouts.default);
                let logs = docker.tail_logs(profile.container, self.env.log_tail_lines);
                for line in &logs {
                    tracing::error!(container = profile.container, "{line}");
                }
                Err(PipelineError::HealthCheck {
                    container: profile.container.to_string(),
                    reason: outcome.to_string(),
                    logs,
                })
            }
        }
    }

    fn log_access_points(&self) {
        let profile = self.env.profile;
        for (label, target) in profile.access_points {
            if target.starts_with('/') {
                tracing::info!("{label}: http://localhost:{}{target}", profile.local_port);
            } else {
                tracing::info!("{label}: {target}");
            }
        }
    }

    fn deploy_aws(&self) -> Result<(), PipelineError> {
        let script = self.env.profile.deploy_script;
        self.env.root.require_file(script, "Deploy script")?;

        let quoted = shell_words::quote(script);
        let command = if cfg!(windows) {
            format!("powershell -ExecutionPolicy Bypass -File {quoted}")
        } else {
            format!("pwsh -File {quoted}")
        };

        let options = self.options(Stage::AwsDeploy);
        tracing::info!(
            script,
            timeout_secs = options.timeout.map_or(0, |t| t.as_secs()),
            "Running remote deploy script; this may take a while"
        );
        self.run(&command, &options)
    }
}

impl<R, S, P> StageActions for ServiceStages<R, S, P>
where
    R: CommandRunner,
    S: ContainerStatus,
    P: EndpointProbe,
{
    fn run_stage(&mut self, stage: Stage, plan: &StagePlan) -> Result<(), PipelineError> {
        match stage {
            Stage::PrerequisiteCheck => self.check_prerequisites(plan),
            Stage::FrontendBuild => self.build_frontend(),
            Stage::BackendBuild => self.build_backend(),
            Stage::ImageBuild => self.build_image(),
            Stage::LocalDeploy => self.deploy_local(),
            Stage::AwsDeploy => self.deploy_aws(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{ContainerState, PollConfig, ProbeResponse};
    use crate::pipeline::{PlanOptions, Service, TargetStage};
    use crate::testing::{FixedProbe, FixedStatus, RecordingRunner};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Lays out a project tree with every file the stages look for
    fn project() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("client-frontend/dist")).unwrap();
        fs::write(root.join("client-frontend/dist/index.html"), "<html></html>").unwrap();
        fs::create_dir_all(root.join("docker")).unwrap();
        fs::write(root.join("docker/docker-compose.local.yml"), "services: {}").unwrap();
        fs::write(root.join("docker/docker-compose.aws.yml"), "services: {}").unwrap();
        fs::create_dir_all(root.join("scripts")).unwrap();
        fs::write(root.join("scripts/deploy-lotto-api-aws.ps1"), "Write-Host ok").unwrap();
        dir
    }

    fn fast_poll() -> PollConfig {
        PollConfig {
            timeout: Duration::from_secs(5),
            max_attempts: 2,
            interval: Duration::from_millis(1),
            probe_timeout: Duration::from_millis(10),
            report_every: 5,
        }
    }

    fn stages<'a>(
        runner: &'a RecordingRunner,
        root: &Path,
        probe: ProbeResponse,
    ) -> ServiceStages<&'a RecordingRunner, FixedStatus, FixedProbe> {
        let poller = HealthPoller::new(FixedStatus(ContainerState::Running), FixedProbe(probe), fast_poll());
        ServiceStages::new(
            runner,
            poller,
            StageEnvironment {
                profile: Service::LottoApi.profile(),
                root: WorkingContext::new(root),
                local: true,
                timeouts: TimeoutPolicy::default(),
                log_tail_lines: 50,
            },
        )
    }

    fn plan(target: TargetStage) -> StagePlan {
        target.plan(PlanOptions {
            local: true,
            skip_prerequisites: false,
        })
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("Docker version 24.0.7, build afdd53b"), Some("24.0.7"));
        assert_eq!(parse_version("10.2.4\n"), Some("10.2.4"));
        assert_eq!(parse_version("Apache Maven 3.9"), Some("3.9"));
        assert_eq!(parse_version("no digits"), None);
    }

    #[test]
    fn test_prerequisites_follow_plan() {
        let dir = project();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        actions
            .run_stage(Stage::PrerequisiteCheck, &plan(TargetStage::FrontendBuild))
            .unwrap();

        assert_eq!(runner.commands(), vec!["docker --version", "npm --version"]);
    }

    #[test]
    fn test_prerequisites_report_every_missing_tool() {
        let dir = project();
        let runner = RecordingRunner::new()
            .fail("npm --version", "npm: not found")
            .fail("mvn --version", "mvn: not found");
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::PrerequisiteCheck, &plan(TargetStage::Build))
            .unwrap_err();

        match err {
            PipelineError::Prerequisite { missing, details } => {
                assert_eq!(missing, vec!["npm", "mvn"]);
                assert!(details.iter().any(|d| d.starts_with("npm:")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_frontend_runs_in_frontend_dir() {
        let dir = project();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        actions
            .run_stage(Stage::FrontendBuild, &plan(TargetStage::FrontendBuild))
            .unwrap();

        assert_eq!(runner.commands(), vec!["npm install", "npm run build"]);
        assert_eq!(
            runner.options_for("npm run build").unwrap().cwd,
            Some(dir.path().join("client-frontend"))
        );
    }

    #[test]
    fn test_frontend_install_failure_is_a_warning() {
        let dir = project();
        let runner = RecordingRunner::new().fail("npm install", "ERESOLVE");
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        assert!(
            actions
                .run_stage(Stage::FrontendBuild, &plan(TargetStage::FrontendBuild))
                .is_ok()
        );
        assert!(runner.options_for("npm install").unwrap().ignore_errors);
        assert!(runner.ran("npm run build"));
    }

    #[test]
    fn test_frontend_build_failure() {
        let dir = project();
        let runner = RecordingRunner::new().fail("npm run build", "vite: error");
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::FrontendBuild, &plan(TargetStage::FrontendBuild))
            .unwrap_err();

        assert!(matches!(err, PipelineError::CommandFailed { ref command, .. } if command == "npm run build"));
    }

    #[test]
    fn test_frontend_empty_output() {
        let dir = project();
        fs::remove_file(dir.path().join("client-frontend/dist/index.html")).unwrap();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::FrontendBuild, &plan(TargetStage::FrontendBuild))
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingPath { .. }));
    }

    #[test]
    fn test_frontend_unreadable_output_is_io_error() {
        let dir = project();
        let dist = dir.path().join("client-frontend/dist");
        fs::remove_dir_all(&dist).unwrap();
        fs::write(&dist, "not a directory").unwrap();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::FrontendBuild, &plan(TargetStage::FrontendBuild))
            .unwrap_err();

        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_frontend_missing_dir_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::FrontendBuild, &plan(TargetStage::FrontendBuild))
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingPath { .. }));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_backend_uses_long_timeout() {
        let dir = project();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        actions
            .run_stage(Stage::BackendBuild, &plan(TargetStage::BackendBuild))
            .unwrap();

        assert_eq!(
            runner.commands(),
            vec!["mvn clean package -DskipTests -f lotto-api/pom.xml"]
        );
        assert_eq!(
            runner.options_for("mvn").unwrap().timeout,
            Some(Duration::from_secs(1800))
        );
    }

    #[test]
    fn test_backend_timeout() {
        let dir = project();
        let runner = RecordingRunner::new().time_out("mvn");
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::BackendBuild, &plan(TargetStage::BackendBuild))
            .unwrap_err();

        assert!(err.is_timeout());
    }

    #[test]
    fn test_image_build_command() {
        let dir = project();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        actions
            .run_stage(Stage::ImageBuild, &plan(TargetStage::DockerRebuild))
            .unwrap();

        assert_eq!(
            runner.commands(),
            vec!["docker compose -f docker/docker-compose.local.yml build --no-cache lotto-api"]
        );
    }

    #[test]
    fn test_image_build_missing_compose_file() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::ImageBuild, &plan(TargetStage::DockerRebuild))
            .unwrap_err();

        assert!(err.to_string().contains("Docker Compose file not found"));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_local_deploy_healthy() {
        let dir = project();
        let runner = RecordingRunner::new().fail("down", "no such network");
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(401));

        actions
            .run_stage(Stage::LocalDeploy, &plan(TargetStage::Deploy))
            .unwrap();

        assert!(runner.options_for("down").unwrap().ignore_errors);
        assert!(runner.ran("up -d --force-recreate"));
        assert!(!runner.ran("docker logs"));
    }

    #[test]
    fn test_local_deploy_unhealthy_collects_logs() {
        let dir = project();
        let runner = RecordingRunner::new().respond("docker logs", 0, "Caused by: connection refused\n");
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(503));

        let err = actions
            .run_stage(Stage::LocalDeploy, &plan(TargetStage::Deploy))
            .unwrap_err();

        assert!(runner.ran("docker logs --tail=50 lotto-api-local"));
        match err {
            PipelineError::HealthCheck { container, logs, .. } => {
                assert_eq!(container, "lotto-api-local");
                assert_eq!(logs, vec!["Caused by: connection refused"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_local_deploy_up_failure_skips_poll() {
        let dir = project();
        let runner = RecordingRunner::new().fail("up -d", "port is already allocated");
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::LocalDeploy, &plan(TargetStage::Deploy))
            .unwrap_err();

        assert!(matches!(err, PipelineError::CommandFailed { .. }));
        assert!(!runner.ran("docker logs"));
    }

    #[test]
    fn test_aws_deploy_runs_script() {
        let dir = project();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        actions
            .run_stage(Stage::AwsDeploy, &plan(TargetStage::AwsDeploy))
            .unwrap();

        assert!(runner.ran("-File scripts/deploy-lotto-api-aws.ps1"));
        assert_eq!(
            runner.options_for("-File").unwrap().timeout,
            Some(Duration::from_secs(1800))
        );
    }

    #[test]
    fn test_aws_deploy_missing_script() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let mut actions = stages(&runner, dir.path(), ProbeResponse::Status(200));

        let err = actions
            .run_stage(Stage::AwsDeploy, &plan(TargetStage::AwsDeploy))
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingPath { ref what, .. } if what == "Deploy script"));
        assert!(runner.commands().is_empty());
    }
}
