// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch: the one place service errors become wire errors.

use std::time::Duration;

use sd_core::{BuildConfig, Clock, ServiceError};
use sd_wire::{Request, Response, PROTOCOL_VERSION};
use tracing::{debug, warn};

use super::ListenCtx;
use crate::service::BuildLifecycle;

pub(super) async fn handle_request<C: Clock>(request: Request, ctx: &ListenCtx<C>) -> Response {
    let name = request.to_string();
    match dispatch(request, ctx).await {
        Ok(response) => response,
        Err(e) => {
            if e.code().is_transient() {
                warn!(request = %name, error = %e, "request failed");
            } else {
                debug!(request = %name, error = %e, "request rejected");
            }
            Response::from(e)
        }
    }
}

async fn dispatch<C: Clock>(request: Request, ctx: &ListenCtx<C>) -> Result<Response, ServiceError> {
    let services = &ctx.services;
    match request {
        Request::Ping => Ok(Response::Pong),

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                debug!(client = %version, daemon = PROTOCOL_VERSION, "protocol version differs");
            }
            Ok(Response::Hello { version: PROTOCOL_VERSION.to_string() })
        }

        Request::Status => {
            let builds = services.lifecycle.list_builds(false).await?;
            Ok(Response::Status {
                uptime_secs: ctx.start_time.elapsed().as_secs(),
                builds_total: builds.len(),
                builds_active: builds.iter().filter(|b| !b.is_terminal()).count(),
            })
        }

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Ok(Response::ShuttingDown)
        }

        Request::CreateBuild {
            create_timestamp_ms,
            build_mode,
            number_of_minions,
            repository,
            tenant_id,
            build_uuid,
            username,
        } => {
            let config = BuildConfig {
                build_mode,
                requested_minion_count: BuildLifecycle::<C>::requested_minions(number_of_minions)?,
                repository,
                tenant_id,
                client_build_uuid: build_uuid,
                username,
                created_at_ms: create_timestamp_ms,
            };
            let stampede_id = services.lifecycle.create_build(config).await?;
            Ok(Response::BuildCreated { stampede_id })
        }

        Request::SetCoordinator { stampede_id, coordinator_hostname, coordinator_port, expected_epoch } => {
            let assignment = services
                .lifecycle
                .set_coordinator(&stampede_id, &coordinator_hostname, coordinator_port, expected_epoch)
                .await?;
            Ok(Response::CoordinatorSet { epoch: assignment.epoch })
        }

        Request::GetCoordinator { stampede_id } => {
            let assignment = services.lifecycle.get_coordinator(&stampede_id).await?;
            Ok(Response::Coordinator { assignment })
        }

        Request::AppendBuildSlaveEvents { stampede_id, run_id, events, idempotency_key } => {
            let outcome =
                services.ingestion.append_events(&stampede_id, &run_id, events, idempotency_key).await?;
            Ok(Response::EventsAppended {
                first_sequence: outcome.first_sequence,
                last_sequence: outcome.last_sequence,
                next_sequence: outcome.next_sequence(),
                deduplicated: outcome.deduplicated,
            })
        }

        Request::ListBuildSlaveEvents { stampede_id, run_id, since_sequence } => {
            let events = services.ingestion.list_events(&stampede_id, &run_id, since_sequence).await?;
            Ok(Response::BuildSlaveEvents { events })
        }

        Request::AppendLogLines { stampede_id, run_id, stream, lines } => {
            let range = services.logs.append_log_lines(&stampede_id, &run_id, &stream, lines).await?;
            Ok(Response::LogLinesAppended {
                first_offset: range.first_offset,
                last_offset: range.last_offset,
            })
        }

        Request::MultiGetRealTimeLogs { stampede_id, batches } => {
            let results = services.logs.multi_get_real_time_logs(&stampede_id, batches).await?;
            Ok(Response::RealTimeLogs { results })
        }

        Request::SendTelemetry { category, lines } => {
            services.telemetry.send(&category, lines);
            Ok(Response::Ok)
        }

        Request::GetBuild { stampede_id } => {
            let build = services.lifecycle.get_build(&stampede_id).await?;
            Ok(Response::Build { build: Box::new(build) })
        }

        Request::ListBuilds { active_only } => {
            let builds = services.lifecycle.list_builds(active_only).await?;
            Ok(Response::Builds { builds })
        }

        Request::SetFinalBuildStatus { stampede_id, status, message } => {
            let build = services.lifecycle.set_final_status(&stampede_id, status, message).await?;
            Ok(Response::Build { build: Box::new(build) })
        }

        Request::UpdateBuildSlaveStatus { stampede_id, run_id, status } => {
            services.slaves.update_slave_status(&stampede_id, &run_id, status).await?;
            Ok(Response::Ok)
        }

        Request::FetchBuildSlaveStatus { stampede_id, run_id } => {
            let status = services.slaves.fetch_slave_status(&stampede_id, &run_id).await?;
            Ok(Response::BuildSlaveStatus { status })
        }

        Request::StoreBuildSlaveFinishedStats { stampede_id, run_id, stats } => {
            services.slaves.store_finished_stats(&stampede_id, &run_id, stats).await?;
            Ok(Response::Ok)
        }

        Request::FetchBuildSlaveFinishedStats { stampede_id, run_ids } => {
            let stats = services.slaves.fetch_finished_stats(&stampede_id, &run_ids).await?;
            Ok(Response::BuildSlaveFinishedStats { stats })
        }

        Request::ListBuildSlaveRuns { stampede_id } => {
            let run_ids = services.slaves.list_runs(&stampede_id).await?;
            Ok(Response::BuildSlaveRuns { run_ids })
        }

        Request::PruneBuilds { retention_ms, dry_run } => {
            let retention = retention_ms.map_or(ctx.build_retention, Duration::from_millis);
            let pruned = services.lifecycle.prune(retention, dry_run).await?;
            Ok(Response::BuildsPruned { pruned, dry_run })
        }
    }
}
