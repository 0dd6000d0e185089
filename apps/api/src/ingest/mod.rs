//! Résumé intake: turns pasted text or an uploaded file into a `Resume`.
//!
//! PDF and images are not parsed here: they are kept as base64 data URLs and the
//! model reads them directly. DOCX is flattened to text with `docx-rs`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};
use thiserror::Error;
use tracing::debug;

use crate::models::resume::{Resume, ResumeKind};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Preencha o nome do candidato e o conteúdo do currículo.")]
    MissingText,

    #[error("Arquivo '{0}' está vazio.")]
    EmptyFile(String),

    #[error("Formato não suportado ('{0}'). Use PDF, DOCX ou Imagens.")]
    UnsupportedFormat(String),

    #[error("'{0}' está no formato .doc antigo. Salve o arquivo como DOCX e envie novamente.")]
    LegacyWordDocument(String),

    #[error("Erro ao ler o arquivo '{name}': {reason}")]
    Unreadable { name: String, reason: String },
}

/// A pasted résumé. Both name and content must be non-blank.
pub fn resume_from_text(name: &str, content: &str) -> Result<Resume, IngestError> {
    if name.trim().is_empty() || content.trim().is_empty() {
        return Err(IngestError::MissingText);
    }
    Ok(Resume::new(name.trim(), content, ResumeKind::Text))
}

/// An uploaded file, dispatched on its extension.
pub fn resume_from_upload(file_name: &str, bytes: &[u8]) -> Result<Resume, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile(file_name.to_string()));
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    let resume = match extension.as_str() {
        "pdf" => Resume::new(
            file_name,
            to_data_url("application/pdf", bytes),
            ResumeKind::Pdf,
        ),
        "doc" => return Err(IngestError::LegacyWordDocument(file_name.to_string())),
        "docx" => {
            let text = extract_docx_text(bytes).map_err(|reason| IngestError::Unreadable {
                name: file_name.to_string(),
                reason,
            })?;
            Resume::new(file_name, text, ResumeKind::Text)
        }
        "jpg" | "jpeg" => Resume::new(file_name, to_data_url("image/jpeg", bytes), ResumeKind::Image),
        "png" => Resume::new(file_name, to_data_url("image/png", bytes), ResumeKind::Image),
        _ => return Err(IngestError::UnsupportedFormat(file_name.to_string())),
    };

    debug!(
        "Ingested '{}' as {:?} ({} bytes)",
        file_name,
        resume.kind,
        bytes.len()
    );
    Ok(resume)
}

fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Raw text of a DOCX document, one line per paragraph.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, String> {
    let docx = read_docx(bytes).map_err(|e| e.to_string())?;

    let mut text = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            for paragraph_child in &paragraph.children {
                if let ParagraphChild::Run(run) = paragraph_child {
                    for run_child in &run.children {
                        if let RunChild::Text(t) = run_child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }

    if text.trim().is_empty() {
        return Err("no text found in document".to_string());
    }
    Ok(text.trim_end().to_string())
}
