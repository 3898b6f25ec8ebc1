//! Stage pipeline controller
//!
//! Runs the stages of a [`StagePlan`] strictly in order and stops at the first
//! failure. A run moves through `NotStarted -> Running(stage) -> Completed |
//! Failed`, and no stage is entered twice.

use super::errors::StageFailure;
use super::service::Service;
use super::stage::StagePlan;
use super::steps::StageActions;
use super::types::{PipelineReport, PipelineState, StageRecord, StageResult};
use crate::infrastructure::MetricsCollector;
use std::time::Instant;

/// Drives one pipeline run
pub struct PipelineController<A> {
    actions: A,
    metrics: MetricsCollector,
    monitor: bool,
}

impl<A: StageActions> PipelineController<A> {
    /// Creates a controller around the given stage actions
    #[must_use]
    pub fn new(actions: A) -> Self {
        Self {
            actions,
            metrics: MetricsCollector::new(),
            monitor: false,
        }
    }

    /// Logs per-stage timings at info level
    #[must_use]
    pub fn with_monitor(mut self, monitor: bool) -> Self {
        self.monitor = monitor;
        self
    }

    /// Runs every stage of `plan` for `service` and reports the outcome.
    ///
    /// Consumes the controller; a run cannot be resumed or repeated.
    pub fn run(mut self, service: Service, plan: &StagePlan) -> (PipelineState, PipelineReport) {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        tracing::info!(
            run_id = %run_id,
            service = %service,
            target_stage = %plan.target(),
            stages_count = plan.stages().len(),
            "Starting pipeline execution"
        );
        for notice in plan.notices() {
            tracing::warn!("{notice}");
        }

        let mut state = PipelineState::NotStarted;

        for &stage in plan.stages() {
            state = PipelineState::Running(stage);
            tracing::info!(stage = %stage, "Executing stage");

            let start = Instant::now();
            let outcome = self.actions.run_stage(stage, plan);
            let duration = start.elapsed();

            let result = if outcome.is_ok() {
                StageResult::Success
            } else {
                StageResult::Failure
            };
            tracing::info!(
                stage = %stage,
                result = %result,
                duration_ms = duration.as_millis(),
                "Stage completed"
            );
            self.metrics.record(StageRecord {
                stage,
                result,
                duration,
            });

            if let Err(error) = outcome {
                tracing::error!(stage = %stage, "Stage failed, stopping pipeline");
                for line in error.diagnostics() {
                    tracing::error!(stage = %stage, "{line}");
                }
                state = PipelineState::Failed(StageFailure { stage, error });
                break;
            }
        }

        if !matches!(state, PipelineState::Failed(_)) {
            state = PipelineState::Completed;
            if plan.is_checkpoint() {
                tracing::info!(target_stage = %plan.target(), "Checkpoint reached, stopping here");
            }
        }

        self.metrics.log_summary(self.monitor);
        let total_duration = started.elapsed();

        let (failed_stage, diagnostics) = match &state {
            PipelineState::Failed(failure) => (Some(failure.stage), failure.error.diagnostics()),
            _ => (None, Vec::new()),
        };

        if state.is_completed() {
            tracing::info!(
                run_id = %run_id,
                duration_ms = total_duration.as_millis(),
                "Pipeline completed"
            );
        } else {
            tracing::error!(run_id = %run_id, "Pipeline failed");
        }

        let report = PipelineReport {
            run_id,
            service,
            target: plan.target(),
            success: state.is_completed(),
            checkpoint: plan.is_checkpoint(),
            stages: self.metrics.get_all(),
            failed_stage,
            diagnostics,
            total_duration,
        };

        (state, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineError, PlanOptions, Stage, TargetStage};
    use pretty_assertions::assert_eq;

    /// Records the stages it is asked to run and fails the configured one
    #[derive(Default)]
    struct FakeActions {
        ran: Vec<Stage>,
        fail_at: Option<Stage>,
    }

    impl StageActions for FakeActions {
        fn run_stage(&mut self, stage: Stage, _plan: &StagePlan) -> Result<(), PipelineError> {
            self.ran.push(stage);
            if self.fail_at == Some(stage) {
                return Err(PipelineError::CommandFailed {
                    command: format!("{stage} command"),
                    errors: vec!["exit code 1".to_string()],
                });
            }
            Ok(())
        }
    }

    fn plan(target: TargetStage, local: bool) -> StagePlan {
        target.plan(PlanOptions {
            local,
            skip_prerequisites: false,
        })
    }

    fn run(actions: &mut FakeActions, target: TargetStage, local: bool) -> (PipelineState, PipelineReport) {
        PipelineController::new(actions).run(Service::LottoApi, &plan(target, local))
    }

    #[test]
    fn test_frontend_checkpoint_stops_early() {
        let mut actions = FakeActions::default();

        let (state, report) = run(&mut actions, TargetStage::FrontendBuild, false);

        assert_eq!(actions.ran, vec![Stage::PrerequisiteCheck, Stage::FrontendBuild]);
        assert_eq!(state, PipelineState::Completed);
        assert!(report.success);
        assert!(report.checkpoint);
        assert_eq!(report.executed(), actions.ran);
    }

    #[test]
    fn test_full_local_run() {
        let mut actions = FakeActions::default();

        let (state, report) = run(&mut actions, TargetStage::All, true);

        assert_eq!(
            actions.ran,
            vec![
                Stage::PrerequisiteCheck,
                Stage::FrontendBuild,
                Stage::BackendBuild,
                Stage::ImageBuild,
                Stage::LocalDeploy,
            ]
        );
        assert!(state.is_completed());
        assert!(!report.checkpoint);
        assert!(report.failed_stage.is_none());
    }

    #[test]
    fn test_image_failure_blocks_remote_deploy() {
        let mut actions = FakeActions {
            fail_at: Some(Stage::ImageBuild),
            ..FakeActions::default()
        };

        let (state, report) = run(&mut actions, TargetStage::AwsDeploy, false);

        assert_eq!(
            actions.ran,
            vec![
                Stage::PrerequisiteCheck,
                Stage::FrontendBuild,
                Stage::BackendBuild,
                Stage::ImageBuild,
            ]
        );
        assert!(!actions.ran.contains(&Stage::AwsDeploy));
        assert!(matches!(state, PipelineState::Failed(ref f) if f.stage == Stage::ImageBuild));
        assert!(!report.success);
        assert_eq!(report.failed_stage, Some(Stage::ImageBuild));
        assert_eq!(report.stages.last().unwrap().result, StageResult::Failure);
    }

    #[test]
    fn test_backend_target_fails_at_frontend() {
        let mut actions = FakeActions {
            fail_at: Some(Stage::FrontendBuild),
            ..FakeActions::default()
        };

        let (_, report) = run(&mut actions, TargetStage::BackendBuild, false);

        assert_eq!(actions.ran, vec![Stage::PrerequisiteCheck, Stage::FrontendBuild]);
        assert_eq!(report.failed_stage, Some(Stage::FrontendBuild));
        assert_eq!(
            report.diagnostics,
            vec![
                "Command `frontend-build command` failed".to_string(),
                "exit code 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_prerequisite_failure_runs_nothing_else() {
        let mut actions = FakeActions {
            fail_at: Some(Stage::PrerequisiteCheck),
            ..FakeActions::default()
        };

        let (_, report) = run(&mut actions, TargetStage::All, true);

        assert_eq!(actions.ran, vec![Stage::PrerequisiteCheck]);
        assert_eq!(report.stages.len(), 1);
    }

    #[test]
    fn test_deploy_without_local_only_builds_image() {
        let mut actions = FakeActions::default();

        let (state, _) = run(&mut actions, TargetStage::Deploy, false);

        assert_eq!(actions.ran, vec![Stage::PrerequisiteCheck, Stage::ImageBuild]);
        assert!(state.is_completed());
    }

    #[test]
    fn test_report_serializes_failure() {
        let mut actions = FakeActions {
            fail_at: Some(Stage::BackendBuild),
            ..FakeActions::default()
        };

        let (_, report) = run(&mut actions, TargetStage::Build, false);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["failed_stage"], "backend-build");
        assert_eq!(json["target"], "build");
        assert_eq!(json["success"], false);
        assert_eq!(json["stages"].as_array().unwrap().len(), 3);
        assert!(uuid::Uuid::parse_str(json["run_id"].as_str().unwrap()).is_ok());
    }
}
