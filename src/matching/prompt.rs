//! Renders a doubt and its candidate pool into a completion prompt.

use std::fmt::Write;

use crate::data::models::TutorProfile;

const INSTRUCTION: &str =
    "Which tutors match best? Return ONLY a comma-separated list of tutor names, nothing else.";

/// Build the matching instruction.
///
/// Every candidate is listed in pool order with name, subjects and bio. The
/// output is a pure function of the inputs.
pub fn build_prompt(subject: &str, description: &str, candidates: &[TutorProfile]) -> String {
    let mut prompt = format!(
        "A learner posted a doubt:\nSubject: {subject}\nDescription: {description}\n\nHere are available tutors:\n"
    );
    for tutor in candidates {
        // Writing to a String cannot fail.
        let _ = writeln!(
            prompt,
            "Name: {}, Subjects: {}, Bio: {}",
            tutor.name,
            tutor.subjects.join(", "),
            tutor.bio
        );
    }
    prompt.push('\n');
    prompt.push_str(INSTRUCTION);
    prompt
}
