//! Prompt builders for the two completion passes.

use crate::context::RequestContext;

const CATEGORY_LIST: &str = "password_reset, technical_issue, configuration, \
                             integration_issue, security_concern, general_inquiry";

/// Quick categorization prompt for the fast model.
pub fn fast_pass(request_text: &str) -> String {
    format!(
        "Analyze this support request and provide quick categorization.\n\n\
         Request: \"{request_text}\"\n\n\
         Respond with a single JSON object containing:\n\
         - primary_category: one of {CATEGORY_LIST}\n\
         - confidence: confidence in the categorization (0.0-1.0)\n\
         - urgency: one of low, medium, high, critical\n\
         - keywords: key terms identified\n\n\
         Be concise and accurate."
    )
}

/// Semantic analysis prompt for the deep model.
pub fn deep_pass(request_text: &str, context: &RequestContext) -> String {
    let context_json = serde_json::to_string_pretty(context)
        .unwrap_or_else(|_| "No context provided".to_string());

    format!(
        "Perform deep semantic analysis of this support request.\n\n\
         Request: \"{request_text}\"\n\
         User context: {context_json}\n\n\
         Analyze the user's intent, technical complexity, emotional state, \
         domain expertise required, potential risks, and how likely an \
         automated answer is to resolve it.\n\n\
         Respond with a single JSON object containing:\n\
         - intent: primary user intent\n\
         - complexity: technical complexity (1-10)\n\
         - emotional_state: detected emotional indicators\n\
         - expertise_required: domain expertise needed\n\
         - risk_factors: list of potential risks\n\
         - automation_feasibility: likelihood of successful automation (0.0-1.0)\n\
         - reasoning: short reasoning chain"
    )
}
