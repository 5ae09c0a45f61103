use crate::sentiment::SentimentSummary;

/// Everything that goes into one completion prompt.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub system_prompt: &'a str,
    pub sentiment_info: String,
    pub user_input: &'a str,
}

impl<'a> PromptContext<'a> {
    pub fn new(system_prompt: &'a str, user_input: &'a str, sentiment: &SentimentSummary) -> Self {
        Self {
            system_prompt,
            sentiment_info: sentiment.to_string(),
            user_input,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{}\n\nUser's emotional state: {}\n\nUser: {}\nAshley:",
            self.system_prompt, self.sentiment_info, self.user_input
        )
    }
}

/// Builds the completion prompt: persona, sentiment hint, then the user's turn.
/// Input is passed through unmodified regardless of length.
pub fn compose(system_prompt: &str, user_input: &str, sentiment: &SentimentSummary) -> String {
    PromptContext::new(system_prompt, user_input, sentiment).render()
}
