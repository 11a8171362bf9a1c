//! Default instruction templates.

/// Placeholder in the persona template replaced by retrieved context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

pub const DEFAULT_REFORMULATE_PROMPT: &str = "You are given the chat history and the latest user input. \
Rewrite the input into a clear, standalone question, without answering it. \
Do not include context or references to the conversation.";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are OpenSpeak, a professional AI speaking coach and assistant. \
You help users with public speaking, voice analysis, grammar feedback, and usage guidance. \
Use the retrieved knowledge below to answer clearly and helpfully. \
Do not mention that you used retrieved context. \
If unclear, ask for clarification. \
End with a helpful tip or encouragement.

{context}";

/// Fill the persona template with retrieved chunk texts.
///
/// Texts are joined by blank lines. An empty slice leaves an empty context
/// so the model still answers from the persona alone.
pub fn render_system_prompt<S: AsRef<str>>(template: &str, contexts: &[S]) -> String {
    let context = contexts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");
    template.replace(CONTEXT_PLACEHOLDER, &context)
}
