// Prompt constants for résumé analysis.

/// System instruction for analysis: an elite technical recruiter who probes
/// what is really behind each claimed experience.
pub const ANALYSIS_SYSTEM: &str = "\
Você é um Headhunter de elite. Sua especialidade é detectar a verdade técnica \
por trás das experiências descritas nos currículos através de perguntas investigativas.";

/// Stands in for the résumé body when the content travels as an attachment.
pub const FILE_CONTENT_PLACEHOLDER: &str = "Conteúdo extraído de arquivo.";

/// Analysis prompt. Replace `{job_description}` and `{resume_content}` before sending.
pub const ANALYSIS_PROMPT_TEMPLATE: &str = "\
CONTEXTO DA VAGA:
{job_description}

CONTEÚDO DO CURRÍCULO:
{resume_content}

OBJETIVO:
Realize uma análise profunda de aderência e gere um ROTEIRO DE ENTREVISTA TÉCNICO.
Retorne os dados exclusivamente em formato JSON seguindo o schema definido.";
