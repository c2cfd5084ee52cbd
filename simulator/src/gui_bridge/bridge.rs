use crate::generator::ScenarioPreset;
use crate::gui_bridge::model::{FilteringRequest, PresetRequest, ScenarioRequest, StatusReply};
use crate::workflow::runner::Runner;
use anyhow::Context;
use log::{error, info};
use std::{
    net::SocketAddr,
    thread::{self, JoinHandle},
};
use tokio::{runtime::Builder, task};
use warp::{http::StatusCode, Filter};

const MAX_BODY_BYTES: u64 = 4 * 1024;

pub fn gui_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

fn with_runner(
    runner: Runner,
) -> impl Filter<Extract = (Runner,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || runner.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn status(reply: StatusReply, code: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&reply), code)
}

/// HTTP routes exposing the comparison view and the filter controls.
pub fn routes(
    runner: Runner,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let scan = warp::path("scan")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_runner(runner.clone()))
        .map(|runner: Runner| warp::reply::json(&runner.provider().snapshot()));

    let report = warp::path("report")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_runner(runner.clone()))
        .map(|runner: Runner| warp::reply::json(&runner.report()));

    let preset = warp::path("preset")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with_runner(runner.clone()))
        .map(|request: PresetRequest, runner: Runner| {
            let applied = runner.apply_preset(&request.preset);
            info!("[GUI] preset -> {}", applied);
            status(StatusReply::ok(applied.name()), StatusCode::OK)
        });

    let filtering = warp::path("filtering")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with_runner(runner.clone()))
        .map(|request: FilteringRequest, runner: Runner| {
            runner.processor().enable_filtering(request.enabled);
            let detail = if request.enabled { "enabled" } else { "disabled" };
            status(StatusReply::ok(detail), StatusCode::OK)
        });

    let scenario = warp::path("scenario")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body())
        .and(with_runner(runner.clone()))
        .and_then(|request: ScenarioRequest, runner: Runner| async move {
            let preset = ScenarioPreset::from_name_or_default(&request.scenario);
            // Switching joins the old sensor thread.
            let outcome = task::spawn_blocking(move || runner.switch_scenario(preset)).await;
            let reply = match outcome {
                Ok(Ok(())) => status(StatusReply::ok(preset.name()), StatusCode::OK),
                Ok(Err(err)) => {
                    error!("scenario switch failed: {:#}", err);
                    status(
                        StatusReply::error(format!("{err:#}")),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )
                }
                Err(err) => {
                    error!("scenario switch task failed: {}", err);
                    status(
                        StatusReply::error(err.to_string()),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )
                }
            };
            Ok::<_, warp::Rejection>(reply)
        });

    let reset = warp::path("reset")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_runner(runner))
        .map(|runner: Runner| {
            runner.processor().reset();
            status(StatusReply::ok("reset"), StatusCode::OK)
        });

    scan.or(report)
        .or(preset)
        .or(filtering)
        .or(scenario)
        .or(reset)
}

/// Serves [`routes`] from a dedicated thread with its own runtime.
pub struct GuiBridge {
    address: SocketAddr,
    worker: JoinHandle<()>,
}

impl GuiBridge {
    pub fn spawn(runner: Runner, address: SocketAddr) -> anyhow::Result<Self> {
        let worker = thread::Builder::new()
            .name("gui-bridge".into())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        error!("building bridge runtime: {}", err);
                        return;
                    }
                };
                runtime.block_on(async move {
                    match warp::serve(routes(runner)).try_bind_ephemeral(address) {
                        Ok((bound, server)) => {
                            info!("[GUI] bridge listening on http://{}", bound);
                            server.await;
                        }
                        Err(err) => error!("binding bridge to {}: {}", address, err),
                    }
                });
            })
            .context("spawning bridge thread")?;

        Ok(Self { address, worker })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    pub fn publish_status(&self, message: &str) {
        info!("[GUI] {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::SessionConfig;
    use serde_json::{json, Value};
    use sonarcore::filters::Filter as _;

    fn runner() -> Runner {
        let mut config = SessionConfig::from_args("clean_wall", "standard", 400, 1);
        config.sensor.scan_interval_ms = 1;
        Runner::new(config)
    }

    fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn scan_returns_comparison_snapshot() {
        let runner = runner();
        runner.run_offline().unwrap();
        let api = routes(runner);

        let response = warp::test::request()
            .method("GET")
            .path("/scan")
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let snapshot = body(&response);
        assert_eq!(snapshot["comparison_mode"], json!(true));
        assert_eq!(snapshot["filtering_enabled"], json!(true));
        assert_eq!(snapshot["stats"]["readings_processed"], json!(400));
        assert_eq!(snapshot["chain"]["children"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn preset_and_filtering_update_the_chain() {
        let runner = runner();
        let api = routes(runner.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/preset")
            .json(&json!({"preset": "kalman"}))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["detail"], json!("kalman"));
        let chain = runner.processor().lock().filter_chain().info();
        assert_eq!(chain.children.len(), 2);
        assert_eq!(chain.children[1].name, "Kalman Filter");

        let response = warp::test::request()
            .method("POST")
            .path("/filtering")
            .json(&json!({"enabled": false}))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!runner.processor().lock().is_filtering_enabled());
    }

    #[tokio::test]
    async fn reset_clears_processor_state() {
        let runner = runner();
        runner.run_offline().unwrap();
        let api = routes(runner.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/reset")
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(runner.processor().get_raw_data().is_empty());
        assert_eq!(runner.processor().get_stats().readings_processed, 0);
    }

    #[tokio::test]
    async fn scenario_switch_starts_live_sensor() {
        let runner = runner();
        let api = routes(runner.clone());

        let response = warp::test::request()
            .method("POST")
            .path("/scenario")
            .json(&json!({"scenario": "moving obstacle"}))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["detail"], json!("moving_obstacle"));
        assert_eq!(
            runner.processor().with_sensor(|source| source.info().name),
            Some("Mock Sensor")
        );
        runner.stop();
    }

    #[tokio::test]
    async fn report_follows_live_scenario_and_preset_changes() {
        let runner = runner();
        let api = routes(runner.clone());

        for scenario in ["clean_wall", "very_noisy"] {
            let response = warp::test::request()
                .method("POST")
                .path("/scenario")
                .json(&json!({ "scenario": scenario }))
                .reply(&api)
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body(&response)["detail"], json!(scenario));
        }

        let response = warp::test::request()
            .method("POST")
            .path("/preset")
            .json(&json!({"preset": "heavy"}))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = warp::test::request()
            .method("GET")
            .path("/report")
            .reply(&api)
            .await;
        runner.stop();
        assert_eq!(response.status(), StatusCode::OK);
        let report = body(&response);
        assert_eq!(report["preset"], json!("heavy"));
        assert_eq!(report["metrics"]["rejected"], json!(0));
        assert!(runner
            .processor()
            .with_sensor(|source| !source.is_running())
            .unwrap());
    }

    #[tokio::test]
    async fn malformed_requests_are_rejected() {
        let api = routes(runner());

        let response = warp::test::request()
            .method("POST")
            .path("/filtering")
            .json(&json!({"enabled": "sometimes"}))
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = warp::test::request()
            .method("GET")
            .path("/unknown")
            .reply(&api)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
