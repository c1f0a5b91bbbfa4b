//! Prompt templates. Every prompt ends with the same `<answer></answer>`
//! instruction so [`crate::extract::extract_answer`] has one contract to
//! honor regardless of which operation produced the completion.

use repopal_core::types::ChangeSet;

pub const SELECT_COMMAND_SYSTEM: &str =
    "You are a helpful assistant that selects the most appropriate command based on user requests.";
pub const GENERATE_ARGS_SYSTEM: &str =
    "You are a helpful assistant that generates command arguments based on user requests.";
pub const SUMMARIZE_SYSTEM: &str =
    "You are a helpful assistant that summarizes code changes in clear, concise language.";
pub const STATUS_SYSTEM: &str = "You are a helpful assistant providing status updates on automated tasks.";

pub fn select_command(user_request: &str, candidates: &[(&str, &str)]) -> String {
    let commands_text: String = candidates
        .iter()
        .map(|(name, description)| format!("- {name}: {description}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Given the following user request:\n\"{user_request}\"\n\n\
         And these available commands:\n{commands_text}\n\n\
         Choose the most appropriate command to handle this request.\n\n\
         Write out your reasoning between <reasoning></reasoning> tags.\n\n\
         Then return only the name of the selected command in <answer></answer> tags."
    )
}

pub fn generate_args(user_request: &str, command_docs: &str) -> String {
    format!(
        "Given the following user request:\n\"{user_request}\"\n\n\
         And this command's documentation:\n{command_docs}\n\n\
         Generate a JSON object containing the appropriate arguments for this command.\n\n\
         Write out your reasoning between <reasoning></reasoning> tags.\n\n\
         Then return only the JSON object in <answer></answer> tags."
    )
}

pub fn summarize(user_request: &str, command_name: &str, command_output: &str, changes: &ChangeSet) -> String {
    let mut sections = Vec::new();

    if !changes.tracked.is_empty() {
        let tracked_text: String = changes
            .tracked
            .iter()
            .map(|c| format!("File: {}\nDiff:\n{}", c.path, c.unified_diff))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Tracked Changes:\n{tracked_text}"));
    }

    if !changes.untracked.is_empty() {
        let untracked_text: String = changes
            .untracked
            .iter()
            .map(|c| format!("File: {}\nContent:\n{}", c.path, c.content))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Untracked Files:\n{untracked_text}"));
    }

    let changes_summary = if sections.is_empty() {
        "No changes detected".to_string()
    } else {
        sections.join("\n\n")
    };

    format!(
        "Given the following information about changes made to a repository:\n\n\
         User's original request:\n\"{user_request}\"\n\n\
         Command executed:\n{command_name}\n\n\
         Command output:\n{command_output}\n\n\
         Changes:\n{changes_summary}\n\n\
         Write a clear, concise summary of the changes that were made.\n\n\
         Write out your analysis between <reasoning></reasoning> tags.\n\n\
         Then provide a natural language summary of the changes between <answer></answer> tags."
    )
}

/// Which leg of the response-thread state machine [`status_message`] is
/// producing text for.
pub enum StatusStage<'a> {
    Received { user_request: &'a str },
    Selected { command_name: &'a str, command_args: &'a str, user_request: &'a str },
    Completed { changes_summary: &'a str, user_request: &'a str },
}

pub fn status_message(stage: &StatusStage<'_>) -> String {
    let body = match stage {
        StatusStage::Received { user_request } => format!(
            "Generate a friendly message acknowledging receipt of this request:\n\"{user_request}\"\n\n\
             The message should indicate we are processing it."
        ),
        StatusStage::Selected { command_name, command_args, user_request } => format!(
            "Generate a status update message indicating we have selected this command:\n{command_name}\n\n\
             With these arguments:\n{command_args}\n\n\
             To handle this request:\n\"{user_request}\""
        ),
        StatusStage::Completed { changes_summary, user_request } => format!(
            "Generate a completion message summarizing these changes:\n{changes_summary}\n\n\
             In response to this request:\n\"{user_request}\""
        ),
    };
    format!(
        "{body}\n\nWrite out your reasoning between <reasoning></reasoning> tags.\n\
         Then provide the message between <answer></answer> tags."
    )
}
