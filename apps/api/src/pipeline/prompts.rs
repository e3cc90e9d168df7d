// All LLM prompt constants for the pipeline stages.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for job extraction. Enforces JSON-only output.
pub const EXTRACTION_SYSTEM: &str = "You are an expert recruiter reading the careers page of a company website. \
    You extract job postings into structured records. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Extraction prompt template. Replace `{page_text}` before sending.
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"### SCRAPED TEXT FROM WEBSITE:
{page_text}

### INSTRUCTION:
The scraped text is from the careers page of a website.
Extract the job postings and return them as JSON with EXACTLY these keys per posting:
{
  "role": "Data Engineer",
  "experience": "2 years",
  "skills": ["Python", "SQL"],
  "description": "Builds and maintains the data pipelines behind our analytics platform."
}

Rules:
1. One posting → a single JSON object. Several postings → a JSON array of objects.
2. `skills` is always an array of short strings (technologies, tools, languages).
3. Use an empty string for `experience` when the page does not state it.
4. If the text contains no job posting at all, return an empty array: []

### VALID JSON, NO PREAMBLE:"#;

/// System prompt for outreach composition.
/// Replace: {sender_name}, {sender_title}, {company_name}, {no_preamble}
pub const COMPOSITION_SYSTEM_TEMPLATE: &str = "You are {sender_name}, a {sender_title} at {company_name}. \
    You write concise, specific cold emails to hiring companies. \
    {no_preamble}";

/// Composition prompt template.
/// Replace: {job_json}, {sender_name}, {sender_title}, {company_name}, {company_pitch}, {link_list}
pub const COMPOSITION_PROMPT_TEMPLATE: &str = r#"### JOB DESCRIPTION:
{job_json}

### INSTRUCTION:
You are {sender_name}, a {sender_title} at {company_name}. {company_pitch}
Your job is to write a cold email to the client regarding the job mentioned above,
describing the capability of {company_name} in fulfilling their needs.
Also add the most relevant ones from the following links to showcase {company_name}'s portfolio:
{link_list}
Remember you are {sender_name}, {sender_title} at {company_name}.
Do not provide a preamble.

### EMAIL (NO PREAMBLE):"#;
