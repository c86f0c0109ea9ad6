// Prompt templates for the three external text-generation calls made during analysis.
// Placeholders are replaced with `str::replace` before sending.

/// Job keyword extraction. Replace `{jd_text}` with the RAW job description.
pub const JOB_KEYWORDS_PROMPT_TEMPLATE: &str = r#"Extract the key skills and requirements from the job description below.

Return a JSON object with this EXACT schema and nothing else:
{"keywords": ["python", "sql", "stakeholder communication"]}

Rules:
- Use words that literally appear in the job description. Do not add additional words.
- Include languages, frameworks, tools, domains, certifications and soft skills.
- Do NOT use markdown code fences.

JOB DESCRIPTION:
{jd_text}"#;

/// STAR narrative check. Replace `{resume_text}`.
pub const STAR_CHECK_PROMPT_TEMPLATE: &str = r#"Does the resume below follow the STAR method (Situation, Task, Action, Result) in its experience bullets?
Answer with exactly one word: yes or no.

RESUME:
{resume_text}"#;

/// Natural-language rendering of matched keywords. Replace `{keywords}`.
pub const MATCHED_SUMMARY_PROMPT_TEMPLATE: &str = "The following keywords were matched \
    between a resume and a job description: {keywords}. Write one sentence telling the \
    applicant these words are matched. Fix obvious misspellings and do not repeat words.";

/// Natural-language rendering of missing keywords. Replace `{keywords}`.
pub const MISSING_SUMMARY_PROMPT_TEMPLATE: &str = "The following keywords from a job \
    description are missing from the applicant's resume: {keywords}. Write one sentence \
    telling the applicant these words are missing.";
