//! Interview monitor.
//!
//! Joins one interview's realtime room and logs phase, question, evaluation and connectivity
//! changes until CTRL-C. With `backend_mode = "mock"` and `INTERVIEW_DEMO=1` it instead plays a
//! scripted interview end to end against in-process stand-ins.

mod demo;

use std::sync::Arc;

use interview_core::{
    BackendMode, HttpBackend, InterviewBackend, InterviewResult, RoundType, ScriptedBackend,
    SessionStore, SyncConfig,
};
use interview_realtime::{Connector, LoopbackConnector, RealtimeChannel, WsConnector};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> InterviewResult<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[interview-monitor] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SyncConfig::load()?;
    let user_id = std::env::var("INTERVIEW_USER_ID").unwrap_or_else(|_| "monitor".to_string());
    let interview_id =
        std::env::var("INTERVIEW_ID").unwrap_or_else(|_| "demo-interview".to_string());
    let demo = std::env::var("INTERVIEW_DEMO")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let (backend, connector): (Arc<dyn InterviewBackend>, Arc<dyn Connector>) =
        match config.backend_mode {
            BackendMode::Http => (
                Arc::new(HttpBackend::from_config(&config)),
                Arc::new(WsConnector::from_config(&config)),
            ),
            BackendMode::Mock => (
                Arc::new(ScriptedBackend::new()),
                Arc::new(LoopbackConnector::new()),
            ),
        };

    tracing::info!(
        user_id = %user_id,
        interview_id = %interview_id,
        backend_mode = ?config.backend_mode,
        backend_url = %config.backend_url,
        "Interview monitor started"
    );

    let store = SessionStore::new();
    let channel = RealtimeChannel::new(store.clone(), connector, config.timings.clone());
    channel.set_user(Some(user_id));
    channel.set_interview(Some(interview_id.clone()));
    channel.set_enabled(true);

    if demo && config.backend_mode == BackendMode::Mock {
        let result = demo::run(store, backend, channel.clone(), config, &interview_id).await;
        channel.shutdown();
        return result;
    }

    load_state(&store, backend.as_ref(), &interview_id).await;
    monitor(&store).await;
    channel.shutdown();
    Ok(())
}

async fn load_state(store: &SessionStore, backend: &dyn InterviewBackend, interview_id: &str) {
    let loaded = match backend.get_interview_state(interview_id).await {
        Ok(Some(snapshot)) => Ok(snapshot),
        Ok(None) => {
            backend
                .initialize_interview_state(interview_id, RoundType::Technical)
                .await
        }
        Err(e) => Err(e),
    };
    match loaded {
        Ok(snapshot) => store.set_interview_state(Some(snapshot)),
        Err(e) => tracing::warn!(
            interview_id,
            error = %e,
            "could not load interview state; waiting for realtime updates"
        ),
    }
}

/// Log store changes until CTRL-C.
async fn monitor(store: &SessionStore) {
    let mut connection = store.watch_slice(|s| (s.connected, s.connection_error.clone()));
    let mut phase = store.watch_slice(|s| {
        s.interview_state
            .as_ref()
            .map(|st| (st.phase, st.questions_asked))
    });
    let mut question = store.watch_slice(|s| s.current_question.as_ref().map(|q| q.text.clone()));
    let mut evaluation = store.watch_slice(|s| s.last_evaluation.as_ref().map(|e| e.score));
    let mut problem =
        store.watch_slice(|s| s.coding_problem.as_ref().map(|p| p.problem_id.clone()));
    let mut errors = store.watch_slice(|s| s.error.clone());

    loop {
        tokio::select! {
            Some((connected, error)) = connection.changed() => {
                match error {
                    Some(e) if !connected => tracing::warn!(error = %e, "realtime disconnected"),
                    _ => tracing::info!(connected, "realtime connectivity changed"),
                }
            }
            Some(Some((current, asked))) = phase.changed() => {
                tracing::info!(phase = current.label(), questions_asked = asked, "interview phase");
            }
            Some(Some(text)) = question.changed() => {
                tracing::info!(question = %text, "question asked");
            }
            Some(Some(score)) = evaluation.changed() => {
                tracing::info!(score, "answer evaluated");
            }
            Some(Some(problem_id)) = problem.changed() => {
                tracing::info!(problem_id = %problem_id, "coding problem assigned");
            }
            Some(Some(message)) = errors.changed() => {
                tracing::warn!(error = %message, "interview error");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down monitor");
                break;
            }
        }
    }
}
