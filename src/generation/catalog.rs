//! Section task catalog and prompt builders.
//!
//! Every prompt is a plain string assembled from the document topic, the
//! optional discipline and, for the closing chapters, the objectives produced
//! in phase 1. The catalog order is the dispatch order of the fan-out.

use crate::generation::title::numbered_list;

/// Persistence key of the general objective part.
pub const GENERAL_OBJECTIVE_KEY: &str = "introduction.generalObjective";
/// Persistence key of the specific objectives part.
pub const SPECIFIC_OBJECTIVES_KEY: &str = "introduction.specificObjectives";

pub const GENERAL_OBJECTIVE_TITLE: &str = "General Objective";
pub const SPECIFIC_OBJECTIVES_TITLE: &str = "Specific Objectives";

/// Preamble shared by the title and objective stages.
pub const ROLE: &str = "Act as an expert thesis advisor. Write in formal academic English. \
Do not invent data; cite sources in APA 7 style whenever you rely on them.";

/// Values a section prompt is parameterized by.
#[derive(Debug, Clone, Default)]
pub struct TaskBindings {
    pub topic: String,
    pub discipline: Option<String>,
    pub general_objective: String,
    pub specific_objectives: Vec<String>,
}

impl TaskBindings {
    pub fn discipline(&self) -> Option<&str> {
        self.discipline.as_deref()
    }
}

/// One fan-out unit: a prompt template, the part key it fills and the part title.
#[derive(Clone, Copy)]
pub struct SectionTask {
    pub key: &'static str,
    pub title: &'static str,
    build: fn(&TaskBindings) -> String,
}

impl SectionTask {
    pub const fn new(key: &'static str, title: &'static str, build: fn(&TaskBindings) -> String) -> Self {
        Self { key, title, build }
    }

    pub fn prompt(&self, bindings: &TaskBindings) -> String {
        (self.build)(bindings)
    }
}

impl std::fmt::Debug for SectionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionTask")
            .field("key", &self.key)
            .field("title", &self.title)
            .finish()
    }
}

fn in_discipline(discipline: Option<&str>) -> String {
    match discipline {
        Some(d) if !d.trim().is_empty() => format!(
            " Discipline: {}. Use terminology, examples and approaches that belong strictly to this discipline.",
            d.trim()
        ),
        _ => String::new(),
    }
}

fn about(b: &TaskBindings, instruction: &str, length: &str) -> String {
    format!(
        "{} Thesis topic: {}.{} {}",
        instruction,
        b.topic,
        in_discipline(b.discipline()),
        length
    )
    .trim_end()
    .to_string()
}

// Title stage

pub fn keywords_prompt(idea: &str, discipline: Option<&str>) -> String {
    let mut lines = vec![
        ROLE.to_string(),
        "Extract between 5 and 12 short keywords or key phrases from the following idea. \
Return them as a comma-separated list with no additional commentary."
            .to_string(),
        format!("Idea: {}", idea),
    ];
    if let Some(d) = discipline.filter(|d| !d.trim().is_empty()) {
        lines.push(format!("Discipline: {}", d.trim()));
    }
    lines.join("\n")
}

pub fn candidates_prompt(idea: &str, discipline: Option<&str>, keywords: &[String]) -> String {
    let mut lines = vec![
        ROLE.to_string(),
        "Generate exactly 5 different thesis titles that are concrete and about the subject matter \
(not about research method)."
            .to_string(),
    ];
    if !keywords.is_empty() {
        lines.push(format!(
            "Each title must include at least 2 of these keywords or phrases: {}.",
            keywords.join(", ")
        ));
    }
    lines.push(
        "Avoid words such as methodology, methodological or citation-style names (APA) in the title."
            .to_string(),
    );
    lines.push(format!("Base idea: {}.", idea));
    if let Some(d) = discipline.filter(|d| !d.trim().is_empty()) {
        lines.push(format!("Discipline: {}.", d.trim()));
    }
    lines.push(
        "Output format: a list numbered 1 to 5, one title per line. No greetings, explanations or extra text."
            .to_string(),
    );
    lines.join("\n")
}

pub fn selection_prompt(candidates: &[String]) -> String {
    [
        ROLE.to_string(),
        "Choose the best title from the following list, prioritizing topical clarity and fit to the discipline."
            .to_string(),
        "Return nothing but the chosen title. Do not include greetings or explanations.".to_string(),
        numbered_list(candidates),
    ]
    .join("\n")
}

// Objective stage

pub fn general_objective_prompt(topic: &str, discipline: Option<&str>) -> String {
    format!(
        "{}\nWrite a single general research objective for a thesis on: {}.{} \
Start with an infinitive verb, keep it to one sentence and return only the objective.",
        ROLE,
        topic,
        in_discipline(discipline)
    )
}

pub fn specific_objectives_prompt(topic: &str, discipline: Option<&str>) -> String {
    format!(
        "{}\nWrite between 3 and 5 specific research objectives for a thesis on: {}.{} \
Each must start with an infinitive verb. Return a numbered list, one objective per line, and nothing else.",
        ROLE,
        topic,
        in_discipline(discipline)
    )
}

// Convergence

pub fn expand_section_prompt(
    key: &str,
    topic: &str,
    anchor: &str,
    extra_words: usize,
    discipline: Option<&str>,
) -> String {
    format!(
        "Continue the section \"{}\" of the thesis on {}.{} Expand it by about {} words with new \
analysis, examples and citations. Do not repeat existing text and do not restate the heading. \
The section currently ends with:\n\n{}",
        key,
        topic,
        in_discipline(discipline),
        extra_words,
        anchor
    )
}

// Section prompts

fn cover(b: &TaskBindings) -> String {
    about(
        b,
        "Draft the cover page: institution placeholder, faculty, full thesis title, author and advisor placeholders, city and year.",
        "",
    )
}

fn signatures(_: &TaskBindings) -> String {
    "Draft the approval signatures page with placeholders for the advisor, jury members and dates.".to_string()
}

fn dedication(_: &TaskBindings) -> String {
    "Write a brief, sober dedication page (60-120 words).".to_string()
}

fn acknowledgments(_: &TaskBindings) -> String {
    "Write an acknowledgments page thanking advisors, institution, participants and family (150-250 words).".to_string()
}

fn table_of_contents(b: &TaskBindings) -> String {
    about(
        b,
        "Propose a detailed table of contents with chapters, sections and subsections and placeholder page numbers.",
        "",
    )
}

fn list_of_figures(_: &TaskBindings) -> String {
    "Propose a list of figures with numbered, descriptive captions and placeholder page numbers.".to_string()
}

fn list_of_tables(_: &TaskBindings) -> String {
    "Propose a list of tables with numbered, descriptive captions and placeholder page numbers.".to_string()
}

fn list_of_graphs(_: &TaskBindings) -> String {
    "Propose a list of graphs with numbered, descriptive captions and placeholder page numbers.".to_string()
}

fn abstract_(b: &TaskBindings) -> String {
    about(
        b,
        "Write the abstract: objective, method, expected results and conclusions, followed by 5 keywords.",
        "250-300 words.",
    )
}

fn problem_statement(b: &TaskBindings) -> String {
    about(
        b,
        "Write the problem statement: context, evidence of the problem, gap in knowledge and consequences.",
        "600-900 words.",
    )
}

fn research_questions(b: &TaskBindings) -> String {
    about(
        b,
        "Formulate one general research question and 3-5 specific questions aligned with it.",
        "",
    )
}

fn justification(b: &TaskBindings) -> String {
    about(
        b,
        "Write the justification: theoretical, practical, methodological and social relevance.",
        "500-800 words.",
    )
}

fn scope(b: &TaskBindings) -> String {
    about(b, "Describe the scope of the research.", "250-400 words.")
}

fn delimitations(b: &TaskBindings) -> String {
    about(
        b,
        "State the delimitations: spatial, temporal, population and thematic boundaries.",
        "200-350 words.",
    )
}

fn limitations(b: &TaskBindings) -> String {
    about(
        b,
        "State the limitations of the study and how their effect will be mitigated.",
        "200-350 words.",
    )
}

fn theoretical_framework(b: &TaskBindings) -> String {
    about(
        b,
        "Build the theoretical framework: key prior studies with critical synthesis, theoretical bases, operational definitions and relationships between variables. Cite in APA 7 and add a reference list at the end.",
        "1500-2500 words.",
    )
}

fn background(b: &TaskBindings) -> String {
    about(
        b,
        "Write the research background: at least six prior studies, each with author, year, purpose, method, findings and relevance.",
        "900-1400 words.",
    )
}

fn theoretical_bases(b: &TaskBindings) -> String {
    about(
        b,
        "Develop the theoretical bases: theories, models and authors that support the study.",
        "900-1400 words.",
    )
}

fn definitions(b: &TaskBindings) -> String {
    about(
        b,
        "Provide conceptual and operational definitions of the main terms and variables.",
        "400-700 words.",
    )
}

fn methodology(b: &TaskBindings) -> String {
    about(
        b,
        "Develop the complete methodology: approach, type and design, population and sample, sampling, operationalization (table), instruments, validity and reliability, procedure, ethics, analysis plan and timeline.",
        "1200-2000 words.",
    )
}

fn design(b: &TaskBindings) -> String {
    about(
        b,
        "Describe the research approach, type and design, and justify each choice.",
        "400-700 words.",
    )
}

fn population_sample(b: &TaskBindings) -> String {
    about(
        b,
        "Describe the population and sample, including inclusion and exclusion criteria and sample size calculation.",
        "300-500 words.",
    )
}

fn sampling(b: &TaskBindings) -> String {
    about(
        b,
        "Describe and justify the sampling technique.",
        "250-400 words.",
    )
}

fn operationalization(b: &TaskBindings) -> String {
    about(
        b,
        "Produce the operationalization of variables as a table: variable, dimension, indicator, item and scale, followed by a short explanation.",
        "",
    )
}

fn instruments(b: &TaskBindings) -> String {
    about(
        b,
        "Describe the data collection techniques and instruments, including structure and sample items.",
        "400-600 words.",
    )
}

fn validity_reliability(b: &TaskBindings) -> String {
    about(
        b,
        "Explain how validity (expert judgement, construct) and reliability (e.g. Cronbach's alpha pilot) will be established.",
        "300-500 words.",
    )
}

fn procedure(b: &TaskBindings) -> String {
    about(
        b,
        "Describe the research procedure step by step, from permissions to data analysis.",
        "300-500 words.",
    )
}

fn ethics(b: &TaskBindings) -> String {
    about(
        b,
        "Describe the ethical considerations: informed consent, confidentiality, data handling and approvals.",
        "250-400 words.",
    )
}

fn analysis_plan(b: &TaskBindings) -> String {
    about(
        b,
        "Write the data analysis plan: techniques, software, tests and how each specific objective will be answered.",
        "400-600 words.",
    )
}

fn timeline(b: &TaskBindings) -> String {
    about(
        b,
        "Produce a research timeline as a table of activities by month with a short explanation.",
        "",
    )
}

fn results(b: &TaskBindings) -> String {
    about(
        b,
        "Outline the expected results or the structure for presenting them. Include example table and figure titles with notes and interpretive text.",
        "800-1200 words.",
    )
}

fn discussion(b: &TaskBindings) -> String {
    format!(
        "Write the discussion contrasting hypothetical findings with the theoretical framework, theoretical and practical contributions, explanations for unexpected results, limitations and future lines of research.{} 800-1200 words.",
        in_discipline(b.discipline())
    )
}

fn conclusions(b: &TaskBindings) -> String {
    format!(
        "Formulate conclusions derived from the results for the general objective: {} and the specific objectives: {}.{} Do not introduce new data. Add feasible recommendations. 600-900 words.",
        b.general_objective,
        b.specific_objectives.join("; "),
        in_discipline(b.discipline())
    )
}

fn references(b: &TaskBindings) -> String {
    let field = b
        .discipline()
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!(" of the discipline {}", d.trim()))
        .unwrap_or_default();
    format!(
        "Generate a reference list in APA 7 format from the suggested citations or key sources of the field{}. Mark missing data with [MISSING]. Include at least 10 relevant, recent entries.",
        field
    )
}

fn appendices(b: &TaskBindings) -> String {
    format!(
        "Prepare the appendices: instruments (templates), consent forms and extended tables.{} Describe in detail and in order what each appendix would contain.",
        in_discipline(b.discipline())
    )
}

/// The fan-out table, in dispatch order.
pub static SECTION_TASKS: [SectionTask; 35] = [
    SectionTask::new("preliminaries.cover", "Cover Page", cover),
    SectionTask::new("preliminaries.signatures", "Signatures", signatures),
    SectionTask::new("preliminaries.dedication", "Dedication", dedication),
    SectionTask::new("preliminaries.acknowledgments", "Acknowledgments", acknowledgments),
    SectionTask::new("preliminaries.tableOfContents", "Table of Contents", table_of_contents),
    SectionTask::new("preliminaries.lists.figures", "List of Figures", list_of_figures),
    SectionTask::new("preliminaries.lists.tables", "List of Tables", list_of_tables),
    SectionTask::new("preliminaries.lists.graphs", "List of Graphs", list_of_graphs),
    SectionTask::new("preliminaries.abstract", "Abstract", abstract_),
    SectionTask::new("introduction.problemStatement", "Problem Statement", problem_statement),
    SectionTask::new("introduction.researchQuestions", "Research Questions", research_questions),
    SectionTask::new("introduction.justification", "Justification", justification),
    SectionTask::new("introduction.scope", "Scope", scope),
    SectionTask::new("introduction.delimitations", "Delimitations", delimitations),
    SectionTask::new("introduction.limitations", "Limitations", limitations),
    SectionTask::new("theoreticalFramework", "Theoretical Framework", theoretical_framework),
    SectionTask::new("theoretical.background", "Background", background),
    SectionTask::new("theoretical.bases", "Theoretical Bases", theoretical_bases),
    SectionTask::new("theoretical.definitions", "Operational Definitions", definitions),
    SectionTask::new("methodology", "Methodology", methodology),
    SectionTask::new("methodology.design", "Approach, Type and Design", design),
    SectionTask::new("methodology.populationSample", "Population and Sample", population_sample),
    SectionTask::new("methodology.sampling", "Sampling", sampling),
    SectionTask::new("methodology.operationalization", "Operationalization of Variables", operationalization),
    SectionTask::new("methodology.instruments", "Instruments", instruments),
    SectionTask::new("methodology.validityReliability", "Validity and Reliability", validity_reliability),
    SectionTask::new("methodology.procedure", "Procedure", procedure),
    SectionTask::new("methodology.ethics", "Ethical Considerations", ethics),
    SectionTask::new("methodology.analysisPlan", "Analysis Plan", analysis_plan),
    SectionTask::new("methodology.timeline", "Timeline", timeline),
    SectionTask::new("results", "Results", results),
    SectionTask::new("discussion", "Discussion", discussion),
    SectionTask::new("conclusions", "Conclusions and Recommendations", conclusions),
    SectionTask::new("references", "References", references),
    SectionTask::new("appendices", "Appendices", appendices),
];

/// Parts a complete document holds: every catalog section plus both objectives.
pub fn expected_part_count() -> usize {
    SECTION_TASKS.len() + 2
}

/// Display title for a known part key.
pub fn title_for_key(key: &str) -> Option<&'static str> {
    match key {
        GENERAL_OBJECTIVE_KEY => Some(GENERAL_OBJECTIVE_TITLE),
        SPECIFIC_OBJECTIVES_KEY => Some(SPECIFIC_OBJECTIVES_TITLE),
        _ => SECTION_TASKS.iter().find(|t| t.key == key).map(|t| t.title),
    }
}
