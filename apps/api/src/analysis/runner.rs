//! Batch analysis: analyzes every pending résumé of a session and attaches the
//! results in one step, or nothing at all.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::request::{build_analysis_request, decode_analysis, AnalysisError};
use crate::errors::AppError;
use crate::llm_client::retry::{with_retry, QuotaClassify, RetryPolicy};
use crate::llm_client::{ModelApi, ANALYSIS_MODEL};
use crate::models::resume::{Analysis, Resume};
use crate::session::{SessionView, Stage};
use crate::state::AppState;

/// Shown when analysis is requested before there is anything to analyze.
pub const MISSING_INPUT_NOTICE: &str = "Preencha a descrição da vaga e adicione currículos.";
/// Generic notice for a failed batch.
pub const ANALYSIS_FAILED_NOTICE: &str = "Ocorreu um erro inesperado na análise.";

/// Analyzes one résumé. The whole call, decoding included, runs under the retry policy.
pub async fn analyze_resume(
    model: &dyn ModelApi,
    policy: &RetryPolicy,
    job_description: &str,
    resume: &Resume,
) -> Result<Analysis, AnalysisError> {
    with_retry(policy, move || async move {
        let request = build_analysis_request(job_description, resume)?;
        let reply = model.generate_content(ANALYSIS_MODEL, &request).await?;
        Ok::<_, AnalysisError>(decode_analysis(&reply)?)
    })
    .await
}

/// Analyzes `resumes` with at most `concurrency` requests in flight.
/// Results come back in input order; the first failure fails the batch.
pub async fn analyze_batch(
    model: Arc<dyn ModelApi>,
    policy: RetryPolicy,
    job_description: Arc<str>,
    resumes: Vec<Resume>,
    concurrency: usize,
) -> Result<Vec<(Uuid, Analysis)>, AnalysisError> {
    stream::iter(resumes)
        .map(move |resume| {
            let model = model.clone();
            let job_description = job_description.clone();
            async move {
                let analysis =
                    analyze_resume(model.as_ref(), &policy, &job_description, &resume).await?;
                Ok::<_, AnalysisError>((resume.id, analysis))
            }
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Runs the analysis step for a session.
///
/// Only résumés without an analysis are sent. The work runs in its own task, so a
/// client that disconnects mid-batch does not leave the session stuck in `analyzing`.
pub async fn run_analysis(state: &AppState, session_id: Uuid) -> Result<SessionView, AppError> {
    let session = state.sessions.get(session_id).await?;

    let (job_description, pending) = {
        let mut s = session.lock().await;
        if s.job_description.trim().is_empty() || s.resumes.is_empty() {
            return Err(AppError::Validation(MISSING_INPUT_NOTICE.to_string()));
        }
        if s.analyzing {
            return Err(AppError::Conflict(
                "An analysis is already running for this session".to_string(),
            ));
        }
        if let Some(remaining) = s.quota.remaining(Instant::now()) {
            return Err(AppError::QuotaExceeded {
                retry_after_secs: remaining.as_secs().max(1),
            });
        }

        s.analyzing = true;
        s.quota.clear();
        s.stage = Stage::Analysis;
        let pending: Vec<Resume> = s
            .resumes
            .iter()
            .filter(|r| !r.is_analyzed())
            .cloned()
            .collect();
        (Arc::<str>::from(s.job_description.as_str()), pending)
    };

    info!(
        "Analyzing {} résumé(s) for session {session_id}",
        pending.len()
    );

    let model = state.model.clone();
    let policy = state.retry;
    let concurrency = state.config.analysis_concurrency;

    let task = tokio::spawn(async move {
        let outcome = analyze_batch(model, policy, job_description, pending, concurrency).await;

        let mut s = session.lock().await;
        s.analyzing = false;
        match outcome {
            Ok(results) => {
                let attached = s.attach_analyses(results);
                info!("Session {session_id}: {attached} analysis(es) attached");
                Ok(s.view(Instant::now()))
            }
            Err(e) if e.is_quota_exceeded() => {
                warn!("Session {session_id}: analysis hit the model quota: {e}");
                s.quota.trip(Instant::now());
                s.stage = Stage::Setup;
                Err(AppError::QuotaExceeded {
                    retry_after_secs: s.quota.window().as_secs(),
                })
            }
            Err(e) => {
                error!("Session {session_id}: analysis batch failed: {e}");
                s.stage = Stage::Setup;
                Err(AppError::AnalysisFailed(ANALYSIS_FAILED_NOTICE.to_string()))
            }
        }
    });

    task.await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("analysis task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::fake::{analysis_json, ScriptedModel};
    use crate::llm_client::LlmError;
    use crate::models::resume::ResumeKind;
    use crate::state::testing::test_state;

    const JD: &str = "Desenvolvedor Rust Pleno";

    fn quota() -> LlmError {
        LlmError::Api {
            status: 429,
            message: "Resource has been exhausted (e.g. check quota).".to_string(),
        }
    }

    async fn session_with(state: &AppState, jd: &str, resumes: &[(&str, &str)]) -> Uuid {
        let session = state.sessions.create().await;
        let mut s = session.lock().await;
        s.job_description = jd.to_string();
        for (name, content) in resumes {
            s.add_resume(Resume::new(*name, *content, ResumeKind::Text));
        }
        s.id
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let model = ScriptedModel::new()
            .reply_for("CV-B", Ok(analysis_json("Bruno", 40.0, &[])))
            .reply_for("CV-A", Ok(analysis_json("Ana", 90.0, &[])));
        let resumes = vec![
            Resume::new("a", "CV-A", ResumeKind::Text),
            Resume::new("b", "CV-B", ResumeKind::Text),
        ];
        let ids: Vec<Uuid> = resumes.iter().map(|r| r.id).collect();

        let results = analyze_batch(Arc::new(model), RetryPolicy::default(), JD.into(), resumes, 2)
            .await
            .unwrap();

        assert_eq!(results[0].0, ids[0]);
        assert_eq!(results[0].1.candidate_name, "Ana");
        assert_eq!(results[1].0, ids[1]);
        assert_eq!(results[1].1.candidate_name, "Bruno");
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_resume_retries_quota() {
        let model = ScriptedModel::new()
            .reply(Err(quota()))
            .reply(Ok(analysis_json("Ana", 75.0, &[])));
        let resume = Resume::new("a", "CV", ResumeKind::Text);

        let analysis = analyze_resume(&model, &RetryPolicy::default(), JD, &resume)
            .await
            .unwrap();

        assert_eq!(analysis.candidate_name, "Ana");
        assert_eq!(model.requests().len(), 2);
        assert_eq!(model.requests()[0].0, ANALYSIS_MODEL);
    }

    #[tokio::test]
    async fn test_run_analysis_attaches_all_results() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply_for("CV-A", Ok(analysis_json("Ana", 90.0, &["Kafka"])))
                .reply_for("CV-B", Ok(analysis_json("Bruno", 55.0, &[]))),
        );
        let state = test_state(model.clone());
        let id = session_with(&state, JD, &[("a", "CV-A"), ("b", "CV-B")]).await;

        let view = run_analysis(&state, id).await.unwrap();

        assert!(!view.analyzing);
        assert_eq!(view.stage, Stage::Analysis);
        assert!(view.has_analysis_context);
        assert_eq!(
            view.resumes[0].analysis.as_ref().unwrap().candidate_name,
            "Ana"
        );
        assert_eq!(
            view.resumes[1].analysis.as_ref().unwrap().candidate_name,
            "Bruno"
        );
    }

    #[tokio::test]
    async fn test_analyzed_resumes_are_skipped() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply_for("CV-A", Ok(analysis_json("Ana", 90.0, &[])))
                .reply_for("CV-B", Ok(analysis_json("Bruno", 55.0, &[]))),
        );
        let state = test_state(model.clone());
        let id = session_with(&state, JD, &[("a", "CV-A")]).await;
        run_analysis(&state, id).await.unwrap();

        {
            let session = state.sessions.get(id).await.unwrap();
            session
                .lock()
                .await
                .add_resume(Resume::new("b", "CV-B", ResumeKind::Text));
        }
        run_analysis(&state, id).await.unwrap();

        assert_eq!(model.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_single_failure_discards_whole_batch() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply_for("CV-A", Ok(analysis_json("Ana", 90.0, &[])))
                .reply_for("CV-B", Ok("{\"candidateName\": \"Bruno\"}".to_string())),
        );
        let state = test_state(model);
        let id = session_with(&state, JD, &[("a", "CV-A"), ("b", "CV-B")]).await;

        let result = run_analysis(&state, id).await;
        assert!(matches!(result, Err(AppError::AnalysisFailed(_))));

        let session = state.sessions.get(id).await.unwrap();
        let s = session.lock().await;
        assert!(s.resumes.iter().all(|r| r.analysis.is_none()));
        assert!(!s.analyzing);
        assert_eq!(s.stage, Stage::Setup);
        assert!(!s.quota.is_active(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_quota_trips_cooldown_and_blocks_next_run() {
        let model = Arc::new(
            ScriptedModel::new()
                .reply(Err(quota()))
                .reply(Err(quota()))
                .reply(Err(quota())),
        );
        let state = test_state(model.clone());
        let id = session_with(&state, JD, &[("a", "CV-A")]).await;

        let result = run_analysis(&state, id).await;
        assert!(matches!(result, Err(AppError::QuotaExceeded { .. })));
        assert_eq!(model.requests().len(), 3);

        let blocked = run_analysis(&state, id).await;
        assert!(matches!(blocked, Err(AppError::QuotaExceeded { .. })));
        assert_eq!(model.requests().len(), 3);

        let session = state.sessions.get(id).await.unwrap();
        assert_eq!(session.lock().await.stage, Stage::Setup);
    }

    #[tokio::test]
    async fn test_rejected_without_job_description_or_resumes() {
        let state = test_state(Arc::new(ScriptedModel::new()));

        let no_jd = session_with(&state, "   ", &[("a", "CV")]).await;
        assert!(matches!(
            run_analysis(&state, no_jd).await,
            Err(AppError::Validation(_))
        ));

        let no_resumes = session_with(&state, JD, &[]).await;
        assert!(matches!(
            run_analysis(&state, no_resumes).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_while_batch_running() {
        let state = test_state(Arc::new(ScriptedModel::new()));
        let id = session_with(&state, JD, &[("a", "CV")]).await;
        state.sessions.get(id).await.unwrap().lock().await.analyzing = true;

        assert!(matches!(
            run_analysis(&state, id).await,
            Err(AppError::Conflict(_))
        ));
    }
}
