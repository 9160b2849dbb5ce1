use std::path::Path;

use serde::Deserialize;

use crate::{error::RulesError, responder::TICKET_PHRASE};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rule {
    pub keyword: String,
    pub response: String,
}

impl Rule {
    fn new(keyword: &str, response: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            response: response.to_string(),
        }
    }
}

/// Canned replies keyed by lowercase substrings.
///
/// Both tiers are scanned in declaration order and the FAQ tier always wins
/// over the general tier. Escalation triggers are checked before either tier.
/// Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTable {
    pub faq: Vec<Rule>,
    pub general: Vec<Rule>,
    pub default_response: String,
    pub topic_suffix: String,
    pub escalation_triggers: Vec<String>,
    pub escalation_response: String,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleTable {
    pub fn builtin() -> Self {
        let faq = vec![
            Rule::new(
                "how to cancel",
                "To cancel your subscription, go to Account Settings > Billing > Cancel Subscription. You'll retain access until your current period ends.",
            ),
            Rule::new(
                "supported browsers",
                "We support Chrome, Firefox, Safari, and Edge (latest versions). Internet Explorer is not supported.",
            ),
            Rule::new(
                "data security",
                "Your data is encrypted and stored securely. We're SOC 2 compliant and follow industry best practices for data protection.",
            ),
            Rule::new(
                "contact hours",
                "Our support team is available Monday-Friday 9AM-6PM EST. Premium users have 24/7 access.",
            ),
        ];

        let general = vec![
            // greetings
            Rule::new(
                "hello",
                "Hi there! Welcome to our support center. How can I assist you today?",
            ),
            Rule::new("hi", "Hello! I'm here to help with any questions you have."),
            // billing
            Rule::new(
                "billing",
                "I can help with billing questions. Are you looking for invoice details, payment issues, or subscription changes?",
            ),
            Rule::new(
                "payment",
                "For payment issues, I can help you with: \n• Payment methods\n• Failed payments\n• Refund requests\n• Billing address updates",
            ),
            Rule::new(
                "refund",
                "I understand you'd like a refund. Let me connect you with our billing specialist who can review your account.",
            ),
            Rule::new(
                "invoice",
                "You can find your invoices in your account dashboard. Would you like me to guide you there?",
            ),
            // technical
            Rule::new(
                "technical",
                "I'm here for technical support! What specific issue are you experiencing?",
            ),
            Rule::new(
                "bug",
                "Sorry to hear about the technical issue. Can you describe what happened? Feel free to upload screenshots if helpful.",
            ),
            Rule::new(
                "error",
                "Let's troubleshoot this error together. What error message are you seeing?",
            ),
            Rule::new(
                "login",
                "Having trouble logging in? Try: \n• Reset your password\n• Clear browser cache\n• Check your email for verification\n• Contact us if issues persist",
            ),
            // account
            Rule::new(
                "account",
                "I can help with account-related questions including profile updates, security settings, and access issues.",
            ),
            Rule::new(
                "password",
                "To reset your password, click 'Forgot Password' on the login page. Check your email for reset instructions.",
            ),
            Rule::new(
                "profile",
                "You can update your profile information in Account Settings. Need help finding it?",
            ),
            Rule::new(
                "help",
                "I'm here to help! I can assist with:\n• Billing and payments\n• Technical issues\n• Account management\n• General questions\n\nWhat would you like help with?",
            ),
            // farewells
            Rule::new(
                "bye",
                "Thank you for contacting support! Have a great day and don't hesitate to reach out if you need more help.",
            ),
            Rule::new(
                "thanks",
                "You're welcome! Is there anything else I can help you with today?",
            ),
            Rule::new(
                "upload",
                "Great! I can see you've uploaded a file. This will help our team assist you better.",
            ),
        ];

        Self {
            faq,
            general,
            default_response: "I'm not sure I understand. Could you please rephrase that? Or type 'help' to see what I can assist with.".to_string(),
            topic_suffix: "\n\nPopular topics: billing, technical support, account help, or type 'human' for live chat.".to_string(),
            escalation_triggers: ["human", "agent", "live chat", "speak to someone"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            escalation_response: "I'm connecting you with a live agent now. Please hold on while I transfer your chat.".to_string(),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, RulesError> {
        let table: Self = serde_json::from_str(raw)?;
        table.normalized()
    }

    pub fn from_json_file(path: &Path) -> Result<Self, RulesError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RulesError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Lowercases every needle and rejects tables that could never behave.
    fn normalized(mut self) -> Result<Self, RulesError> {
        for rule in self.faq.iter_mut().chain(self.general.iter_mut()) {
            rule.keyword = rule.keyword.trim().to_lowercase();
            if rule.keyword.is_empty() {
                return Err(RulesError::EmptyKeyword);
            }
        }
        for trigger in &mut self.escalation_triggers {
            *trigger = trigger.trim().to_lowercase();
            if trigger.is_empty() {
                return Err(RulesError::EmptyKeyword);
            }
        }
        if self.escalation_triggers.is_empty() {
            return Err(RulesError::NoEscalationTriggers);
        }
        if !self
            .escalation_response
            .to_lowercase()
            .contains(TICKET_PHRASE)
        {
            return Err(RulesError::EscalationTextMissingPhrase);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOM: &str = r#"{
        "faq": [{ "keyword": "Opening Hours", "response": "9 to 5." }],
        "general": [{ "keyword": "PRICE", "response": "See /pricing." }],
        "defaultResponse": "Sorry?",
        "topicSuffix": " Try: price.",
        "escalationTriggers": ["Operator"],
        "escalationResponse": "Connecting you with a live agent."
    }"#;

    #[test]
    fn builtin_table_is_already_normalized() {
        let table = RuleTable::builtin();
        assert_eq!(table.clone().normalized().unwrap(), table);
        assert_eq!(table.faq.len(), 4);
        assert_eq!(table.general.first().map(|r| r.keyword.as_str()), Some("hello"));
    }

    #[test]
    fn builtin_general_tier_has_no_escalation_keywords() {
        let table = RuleTable::builtin();
        for rule in &table.general {
            assert!(
                !table.escalation_triggers.contains(&rule.keyword),
                "{} can never be reached",
                rule.keyword
            );
        }
    }

    #[test]
    fn json_table_keywords_are_lowercased_in_order() {
        let table = RuleTable::from_json_str(CUSTOM).unwrap();
        assert_eq!(table.faq[0].keyword, "opening hours");
        assert_eq!(table.general[0].keyword, "price");
        assert_eq!(table.escalation_triggers, vec!["operator".to_string()]);
    }

    #[test]
    fn json_table_must_keep_ticket_phrase_in_escalation_text() {
        let raw = CUSTOM.replace("Connecting you with a live agent.", "One moment.");
        assert!(matches!(
            RuleTable::from_json_str(&raw),
            Err(RulesError::EscalationTextMissingPhrase)
        ));
    }

    #[test]
    fn json_table_rejects_blank_keywords_and_missing_triggers() {
        let blank = CUSTOM.replace("\"PRICE\"", "\"  \"");
        assert!(matches!(
            RuleTable::from_json_str(&blank),
            Err(RulesError::EmptyKeyword)
        ));

        let no_triggers = CUSTOM.replace("[\"Operator\"]", "[]");
        assert!(matches!(
            RuleTable::from_json_str(&no_triggers),
            Err(RulesError::NoEscalationTriggers)
        ));
    }

    #[test]
    fn json_table_reports_malformed_input() {
        assert!(matches!(
            RuleTable::from_json_str("{"),
            Err(RulesError::Parse(_))
        ));
    }

    #[test]
    fn missing_rules_file_reports_its_path() {
        let err = RuleTable::from_json_file(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rules.json"));
    }
}
