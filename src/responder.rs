use std::sync::Arc;

use crate::{rules::RuleTable, types::TicketPriority};

/// Phrase whose presence in a reply marks it as a hand-off to a human.
pub const TICKET_PHRASE: &str = "connecting you with a live agent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub response_text: String,
    pub escalate: bool,
}

/// Keyword responder. Pure: no I/O and no state beyond the shared rule table.
#[derive(Debug, Clone)]
pub struct Responder {
    rules: Arc<RuleTable>,
}

impl Responder {
    pub fn new(rules: Arc<RuleTable>) -> Self {
        Self { rules }
    }

    /// Picks the reply for one visitor message.
    ///
    /// Matching is a case-insensitive substring test, so "technically" hits
    /// the `technical` rule and "this" hits `hi`. Priority, first match wins:
    /// escalation triggers, then the FAQ tier, then the general tier, then the
    /// default reply with the topic list appended.
    pub fn classify(&self, message: &str) -> Classification {
        let lower = message.to_lowercase();
        let rules = &*self.rules;

        if rules
            .escalation_triggers
            .iter()
            .any(|trigger| lower.contains(trigger.as_str()))
        {
            return Classification {
                response_text: rules.escalation_response.clone(),
                escalate: true,
            };
        }

        let matched = rules
            .faq
            .iter()
            .chain(rules.general.iter())
            .find(|rule| lower.contains(rule.keyword.as_str()));

        let response_text = match matched {
            Some(rule) => rule.response.clone(),
            None => format!("{}{}", rules.default_response, rules.topic_suffix),
        };

        Classification {
            response_text,
            escalate: false,
        }
    }
}

/// Legacy trigger: a reply that announces a live-agent transfer opens a ticket.
pub fn should_open_ticket(response_text: &str) -> bool {
    response_text.to_lowercase().contains(TICKET_PHRASE)
}

/// Decides whether a classified turn opens a support ticket, and at which
/// priority. The explicit flag is authoritative; the reply text is still
/// honoured so a rule whose wording announces a transfer behaves the same.
pub fn ticket_priority(classification: &Classification) -> Option<TicketPriority> {
    (classification.escalate || should_open_ticket(&classification.response_text))
        .then_some(TicketPriority::High)
}
