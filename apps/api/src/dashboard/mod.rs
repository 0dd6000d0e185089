// Read-only views over analyzed résumés: ranking, side-by-side comparison and the
// executive report payload. Nothing here talks to the model.

pub mod handlers;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{Analysis, Resume};

/// Most candidates a comparison may hold.
pub const MAX_COMPARED: usize = 3;
/// Adherence spread, in points, above which a comparison is flagged.
pub const DISPARITY_THRESHOLD: f64 = 15.0;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("A visualização comparativa detalhada é limitada a 3 candidatos por vez.")]
    TooManySelected,

    #[error("Selecione ao menos dois candidatos para comparar.")]
    TooFewSelected,

    #[error("Candidate {0} not found or not analyzed yet")]
    UnknownCandidate(Uuid),

    #[error("Nenhum candidato analisado para o relatório.")]
    NothingAnalyzed,
}

impl From<DashboardError> for AppError {
    fn from(e: DashboardError) -> Self {
        match e {
            DashboardError::UnknownCandidate(_) => AppError::NotFound(e.to_string()),
            _ => AppError::Validation(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    /// 1-based position in the ranking.
    pub position: usize,
    pub resume_id: Uuid,
    pub name: String,
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub candidates: Vec<RankedCandidate>,
    pub max_adherence: f64,
    pub min_adherence: f64,
    pub has_disparity: bool,
}

/// Formatting handed to the client-side PDF renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOptions {
    pub format: &'static str,
    pub orientation: &'static str,
    pub margin_mm: u32,
    pub image_quality: f64,
    pub scale: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: "a4",
            orientation: "portrait",
            margin_mm: 10,
            image_quality: 0.98,
            scale: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub file_name: String,
    pub generated_on: NaiveDate,
    pub job_description: String,
    pub candidates: Vec<RankedCandidate>,
    pub export: ExportOptions,
}

/// Analyzed résumés, best adherence first. Ties keep session order.
pub fn ranked(resumes: &[Resume]) -> Vec<RankedCandidate> {
    let mut analyzed: Vec<(&Resume, &Analysis)> = resumes
        .iter()
        .filter_map(|r| r.analysis.as_ref().map(|a| (r, a)))
        .collect();
    analyzed.sort_by(|(_, a), (_, b)| b.adherence_percentage.total_cmp(&a.adherence_percentage));

    analyzed
        .into_iter()
        .enumerate()
        .map(|(i, (resume, analysis))| RankedCandidate {
            position: i + 1,
            resume_id: resume.id,
            name: resume.display_name().to_string(),
            analysis: analysis.clone(),
        })
        .collect()
}

/// Side-by-side view of the selected candidates, in selection order.
pub fn compare(resumes: &[Resume], selected: &[Uuid]) -> Result<Comparison, DashboardError> {
    let mut ids: Vec<Uuid> = Vec::with_capacity(selected.len());
    for id in selected {
        if !ids.contains(id) {
            ids.push(*id);
        }
    }
    if ids.len() > MAX_COMPARED {
        return Err(DashboardError::TooManySelected);
    }
    if ids.len() < 2 {
        return Err(DashboardError::TooFewSelected);
    }

    let ranking = ranked(resumes);
    let candidates = ids
        .iter()
        .map(|id| {
            ranking
                .iter()
                .find(|c| c.resume_id == *id)
                .cloned()
                .ok_or(DashboardError::UnknownCandidate(*id))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let scores = candidates.iter().map(|c| c.analysis.adherence_percentage);
    let max_adherence = scores.clone().fold(f64::MIN, f64::max);
    let min_adherence = scores.fold(f64::MAX, f64::min);

    Ok(Comparison {
        has_disparity: max_adherence - min_adherence > DISPARITY_THRESHOLD,
        candidates,
        max_adherence,
        min_adherence,
    })
}

/// `Relatorio_Executivo_RH_<dd-mm-yyyy>.pdf`
pub fn report_file_name(date: NaiveDate) -> String {
    format!("Relatorio_Executivo_RH_{}.pdf", date.format("%d-%m-%Y"))
}

pub fn build_report(
    job_description: &str,
    resumes: &[Resume],
    date: NaiveDate,
) -> Result<Report, DashboardError> {
    let candidates = ranked(resumes);
    if candidates.is_empty() {
        return Err(DashboardError::NothingAnalyzed);
    }

    Ok(Report {
        file_name: report_file_name(date),
        generated_on: date,
        job_description: job_description.to_string(),
        candidates,
        export: ExportOptions::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::fake::analysis_json;
    use crate::models::resume::ResumeKind;

    fn analyzed(name: &str, adherence: f64) -> Resume {
        let mut resume = Resume::new(format!("{name}.pdf"), "texto", ResumeKind::Text);
        resume.analysis = Some(serde_json::from_str(&analysis_json(name, adherence, &[])).unwrap());
        resume
    }

    fn names(candidates: &[RankedCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_ranking_sorts_by_adherence_and_skips_pending() {
        let resumes = vec![
            analyzed("Ana", 60.0),
            Resume::new("pendente", "x", ResumeKind::Text),
            analyzed("Bruno", 92.0),
            analyzed("Carla", 60.0),
        ];

        let ranking = ranked(&resumes);
        assert_eq!(names(&ranking), vec!["Bruno", "Ana", "Carla"]);
        assert_eq!(ranking[0].position, 1);
        assert_eq!(ranking[2].position, 3);
    }

    #[test]
    fn test_comparison_limited_to_three() {
        let resumes: Vec<Resume> = (0..4).map(|i| analyzed(&format!("C{i}"), 50.0)).collect();
        let ids: Vec<Uuid> = resumes.iter().map(|r| r.id).collect();

        assert!(matches!(
            compare(&resumes, &ids),
            Err(DashboardError::TooManySelected)
        ));
        assert!(matches!(
            compare(&resumes, &ids[..1]),
            Err(DashboardError::TooFewSelected)
        ));
        assert_eq!(compare(&resumes, &ids[..3]).unwrap().candidates.len(), 3);
    }

    #[test]
    fn test_comparison_flags_disparity_above_fifteen_points() {
        let resumes = vec![analyzed("Ana", 90.0), analyzed("Bruno", 74.0), analyzed("Carla", 75.0)];

        let wide = compare(&resumes, &[resumes[0].id, resumes[1].id]).unwrap();
        assert!(wide.has_disparity);
        assert_eq!(wide.max_adherence, 90.0);
        assert_eq!(wide.min_adherence, 74.0);

        let narrow = compare(&resumes, &[resumes[2].id, resumes[0].id]).unwrap();
        assert!(!narrow.has_disparity);
        assert_eq!(names(&narrow.candidates), vec!["Carla", "Ana"]);
    }

    #[test]
    fn test_comparison_rejects_unanalyzed_candidate() {
        let resumes = vec![analyzed("Ana", 90.0), Resume::new("b", "x", ResumeKind::Text)];
        let result = compare(&resumes, &[resumes[0].id, resumes[1].id]);
        assert!(matches!(result, Err(DashboardError::UnknownCandidate(id)) if id == resumes[1].id));
    }

    #[test]
    fn test_report_carries_file_name_and_export_options() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let report = build_report("Vaga Rust", &[analyzed("Ana", 80.0)], date).unwrap();

        assert_eq!(report.file_name, "Relatorio_Executivo_RH_07-03-2024.pdf");
        assert_eq!(report.export.format, "a4");
        assert_eq!(report.export.margin_mm, 10);
        assert_eq!(report.export.image_quality, 0.98);
        assert_eq!(report.candidates.len(), 1);
    }

    #[test]
    fn test_report_needs_an_analysis() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let resumes = vec![Resume::new("a", "x", ResumeKind::Text)];
        assert!(matches!(
            build_report("Vaga", &resumes, date),
            Err(DashboardError::NothingAnalyzed)
        ));
    }
}
