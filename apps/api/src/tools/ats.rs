//! Heuristic parsing of job descriptions and resumes into the structured
//! inputs `embeddings::batch` works on. No LLM calls.
//!
//! Both parsers are heading-driven: a line like `Requirements:` or `Skills`
//! switches the current section, and following lines (bullets stripped) are
//! filed under it. `Heading: a, b, c` on one line is treated as a section
//! with inline items.

use crate::embeddings::batch::{JobRequirements, Keyword, KeywordPriority, ResumeSections};

// ────────────────────────────────────────────────────────────────────────────
// Job descriptions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum JobSection {
    Qualifications,
    Responsibilities,
    Skills,
    NiceToHave,
}

const JOB_HEADINGS: &[(&str, JobSection)] = &[
    ("requirements", JobSection::Qualifications),
    ("qualifications", JobSection::Qualifications),
    ("minimum qualifications", JobSection::Qualifications),
    ("what you need", JobSection::Qualifications),
    ("what we're looking for", JobSection::Qualifications),
    ("must have", JobSection::Qualifications),
    ("responsibilities", JobSection::Responsibilities),
    ("what you'll do", JobSection::Responsibilities),
    ("what you will do", JobSection::Responsibilities),
    ("the role", JobSection::Responsibilities),
    ("skills", JobSection::Skills),
    ("required skills", JobSection::Skills),
    ("tech stack", JobSection::Skills),
    ("technologies", JobSection::Skills),
    ("nice to have", JobSection::NiceToHave),
    ("nice to haves", JobSection::NiceToHave),
    ("preferred", JobSection::NiceToHave),
    ("preferred qualifications", JobSection::NiceToHave),
    ("bonus", JobSection::NiceToHave),
    ("bonus points", JobSection::NiceToHave),
];

/// Lower-case, bullet-free, colon-free form of a line for heading lookup.
fn heading_key(line: &str) -> String {
    strip_bullet(line)
        .trim_end_matches(':')
        .trim()
        .to_lowercase()
}

fn strip_bullet(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '*', '•', '·'])
        .trim()
}

fn split_list(items: &str) -> impl Iterator<Item = String> + '_ {
    items
        .split([',', ';'])
        .map(|s| s.trim().trim_end_matches('.').trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn job_heading(key: &str) -> Option<JobSection> {
    JOB_HEADINGS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, section)| *section)
}

/// Capitalised terms after the first word of a sentence, e.g. "AWS" in
/// "Deploy services on AWS". These become `Important` keywords.
fn proper_terms(line: &str) -> Vec<String> {
    line.split_whitespace()
        .skip(1)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#'))
        .filter(|w| w.len() > 1 && w.chars().next().is_some_and(char::is_uppercase))
        .map(str::to_string)
        .collect()
}

fn push_keyword(keywords: &mut Vec<Keyword>, term: String, priority: KeywordPriority) {
    let exists = keywords
        .iter()
        .any(|k| k.term.eq_ignore_ascii_case(&term));
    if !exists {
        keywords.push(Keyword { term, priority });
    }
}

fn file_job_item(requirements: &mut JobRequirements, section: JobSection, item: &str) {
    match section {
        JobSection::Qualifications => requirements.qualifications.push(item.to_string()),
        JobSection::Responsibilities => requirements.responsibilities.push(item.to_string()),
        JobSection::Skills => requirements.skills.extend(split_list(item)),
        JobSection::NiceToHave => {
            for term in split_list(item) {
                push_keyword(&mut requirements.keywords, term, KeywordPriority::NiceToHave);
            }
        }
    }
}

/// Extracts skills, qualifications, responsibilities and prioritised
/// keywords from free-form job description text.
///
/// Skills are the must-have terms; nice-to-have items become
/// `NiceToHave` keywords; capitalised terms inside qualifications and
/// responsibilities become `Important` keywords. Text without any
/// recognisable heading is read as a list of qualifications.
pub fn extract_requirements(jd: &str) -> JobRequirements {
    let mut requirements = JobRequirements::default();
    let mut section: Option<JobSection> = None;
    let mut saw_heading = false;

    for raw in jd.lines() {
        let line = strip_bullet(raw);
        if line.is_empty() {
            continue;
        }

        if let Some(found) = job_heading(&heading_key(line)) {
            section = Some(found);
            saw_heading = true;
            continue;
        }

        if let Some((head, rest)) = line.split_once(':') {
            if let Some(found) = job_heading(&heading_key(head)) {
                saw_heading = true;
                section = Some(found);
                if !rest.trim().is_empty() {
                    file_job_item(&mut requirements, found, rest.trim());
                }
                continue;
            }
        }

        if let Some(current) = section {
            file_job_item(&mut requirements, current, line);
        }
    }

    if !saw_heading {
        requirements.qualifications = jd
            .lines()
            .map(strip_bullet)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
    }

    let skills: Vec<String> = requirements.skills.iter().map(|s| s.to_lowercase()).collect();
    let proper: Vec<String> = requirements
        .qualifications
        .iter()
        .chain(&requirements.responsibilities)
        .flat_map(|line| proper_terms(line))
        .filter(|term| !skills.contains(&term.to_lowercase()))
        .collect();
    for term in proper {
        push_keyword(&mut requirements.keywords, term, KeywordPriority::Important);
    }

    requirements
}

// ────────────────────────────────────────────────────────────────────────────
// Resumes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResumeSection {
    Summary,
    Experience,
    Skills,
    Education,
    Projects,
}

const RESUME_HEADINGS: &[(&str, ResumeSection)] = &[
    ("summary", ResumeSection::Summary),
    ("professional summary", ResumeSection::Summary),
    ("profile", ResumeSection::Summary),
    ("about", ResumeSection::Summary),
    ("about me", ResumeSection::Summary),
    ("objective", ResumeSection::Summary),
    ("experience", ResumeSection::Experience),
    ("work experience", ResumeSection::Experience),
    ("professional experience", ResumeSection::Experience),
    ("employment", ResumeSection::Experience),
    ("work history", ResumeSection::Experience),
    ("skills", ResumeSection::Skills),
    ("technical skills", ResumeSection::Skills),
    ("core skills", ResumeSection::Skills),
    ("technologies", ResumeSection::Skills),
    ("education", ResumeSection::Education),
    ("certifications", ResumeSection::Education),
    ("education & certifications", ResumeSection::Education),
    ("projects", ResumeSection::Projects),
    ("personal projects", ResumeSection::Projects),
    ("side projects", ResumeSection::Projects),
    ("open source", ResumeSection::Projects),
];

fn resume_heading(key: &str) -> Option<ResumeSection> {
    RESUME_HEADINGS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, section)| *section)
}

/// Splits resume text into sections by heading lines.
///
/// Lines before the first heading (name, contact details) are dropped.
/// Summary lines are joined into one paragraph; every other section keeps
/// one entry per line. A resume with no headings becomes a single summary.
pub fn split_resume_sections(resume: &str) -> ResumeSections {
    let mut sections = ResumeSections::default();
    let mut summary: Vec<&str> = Vec::new();
    let mut current: Option<ResumeSection> = None;
    let mut saw_heading = false;

    for raw in resume.lines() {
        let line = strip_bullet(raw);
        if line.is_empty() {
            continue;
        }
        if let Some(found) = resume_heading(&heading_key(line)) {
            current = Some(found);
            saw_heading = true;
            continue;
        }
        match current {
            Some(ResumeSection::Summary) => summary.push(line),
            Some(ResumeSection::Experience) => sections.experience.push(line.to_string()),
            Some(ResumeSection::Skills) => sections.skills.push(line.to_string()),
            Some(ResumeSection::Education) => sections.education.push(line.to_string()),
            Some(ResumeSection::Projects) => sections.projects.push(line.to_string()),
            None => {}
        }
    }

    if !saw_heading {
        let text = resume.split_whitespace().collect::<Vec<_>>().join(" ");
        sections.summary = (!text.is_empty()).then_some(text);
    } else if !summary.is_empty() {
        sections.summary = Some(summary.join(" "));
    }

    sections
}
