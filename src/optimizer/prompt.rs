use super::types::OptimizationRequest;

/// Renders the instruction sent to the text model.
///
/// Each request field fills exactly one slot.
pub fn render_prompt(request: &OptimizationRequest) -> String {
    format!(
        "You are an AI email marketing expert. You will suggest improvements to the subject line \
and body of an email to increase open and click-through rates. Consider the campaign goal and \
target audience when making your suggestions.

Original Subject: {subject}
Original Body: {body}
Campaign Goal: {goal}
Target Audience: {audience}

Provide the optimized subject line, optimized body, and a brief explanation of your changes.

Optimize the email content to be more engaging and persuasive to achieve the campaign goal for \
the target audience.

Output:
Optimized Subject: 
Optimized Body: 
Explanation: ",
        subject = request.subject,
        body = request.body,
        goal = request.campaign_goal,
        audience = request.target_audience,
    )
}
