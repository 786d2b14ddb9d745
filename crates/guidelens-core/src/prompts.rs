//! Fixed prompt templates and canned replies.
//!
//! The core assembles these from live session fields; the provider only
//! transports them. Fallback replies keep the guide talking when the
//! provider fails.

use guidelens_catalog::StepContent;
use guidelens_provider::GenerateRequest;
use guidelens_schema::ActivityCategory;

use crate::session::GuideSession;

/// Short fixed goal list chosen by category at session start.
pub fn session_goals(category: ActivityCategory) -> Vec<String> {
    let goals: &[&str] = match category {
        ActivityCategory::Cooking => &[
            "Follow each step at your own pace",
            "Keep ingredients and timing on track",
            "Finish with a dish you're happy with",
        ],
        ActivityCategory::Crafting => &[
            "Work through each step carefully",
            "Use materials you have on hand",
            "End up with a finished piece",
        ],
        ActivityCategory::Diy => &[
            "Stay safe at every step",
            "Measure twice before cutting or drilling",
            "Complete the project solidly",
        ],
        ActivityCategory::Tutorial => &[
            "Understand each module before moving on",
            "Ask whenever something is unclear",
            "Finish with working knowledge",
        ],
    };
    goals.iter().map(|g| (*g).to_string()).collect()
}

/// Static per-category reply used when the AI collaborator fails. Always
/// non-empty so the guided flow never dead-ends.
pub fn fallback_reply(category: ActivityCategory) -> &'static str {
    match category {
        ActivityCategory::Cooking => {
            "I'm having trouble reaching the kitchen assistant right now. \
             Check the current step's description and keep going; I'll catch up shortly."
        }
        ActivityCategory::Crafting => {
            "I can't fetch crafting advice at the moment. \
             Re-read the current step and carry on; ask me again in a bit."
        }
        ActivityCategory::Diy => {
            "I couldn't get an answer just now. If anything feels unsafe, pause the work. \
             Otherwise follow the step description and try me again soon."
        }
        ActivityCategory::Tutorial => {
            "I'm unable to reach the tutor right now. \
             Review the current module and continue; I'll be back shortly."
        }
    }
}

/// System message appended when resuming a paused session.
pub fn welcome_back(step_number: usize, total_steps: usize, elapsed_minutes: i64) -> String {
    format!(
        "Welcome back! You're on step {step_number} of {total_steps}, \
         {elapsed_minutes} minutes in. Pick up right where you left off."
    )
}

/// System notice appended when navigation advances a step.
pub fn navigation_notice(step_number: usize, total_steps: usize, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("Moving to step {step_number} of {total_steps}: {title}"),
        None => format!("Moving to step {step_number} of {total_steps}"),
    }
}

/// Assemble the provider request from a fixed template plus live session
/// fields: title, step position, elapsed minutes, emotional state, goals.
pub fn assemble_request(
    session: &GuideSession,
    step: Option<&StepContent>,
    user_text: &str,
) -> GenerateRequest {
    let mut prompt = String::new();
    if let Some(step) = step {
        prompt.push_str(&format!(
            "Current step: {}\n{}\n\n",
            step.title, step.description
        ));
        if !step.required_items.is_empty() {
            prompt.push_str(&format!("Needed: {}\n\n", step.required_items.join(", ")));
        }
    }
    prompt.push_str(&format!("The user says: {user_text}"));

    let mut request = GenerateRequest::new(prompt, session.activity.category)
        .with_context("activity", session.activity.title.clone())
        .with_context(
            "step",
            format!("{}/{}", session.step_number(), session.total_steps),
        )
        .with_context("elapsed_minutes", session.elapsed_minutes().to_string())
        .with_context("emotional_state", session.emotional_state.as_str());
    if !session.goals.is_empty() {
        request = request.with_context("goals", session.goals.join("; "));
    }
    request
}
