//! Operator command grammar.
//!
//! ```text
//! /confirm_payout {payoutId}   step one
//! YES {payoutId}               step two
//! /help                        usage
//! ```
//!
//! Slash commands may carry a bot mention (`/help@PayoutBot`), which Telegram
//! appends in group chats.

use crate::store::PayoutId;

/// A parsed operator message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ConfirmPayout(PayoutId),
    Yes(PayoutId),
    Help,
    Unrecognized,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split_whitespace();
        let head = match parts.next() {
            Some(head) => head,
            None => return Command::Unrecognized,
        };
        let arg = parts.next();
        if parts.next().is_some() {
            return Command::Unrecognized;
        }

        let head = if head.starts_with('/') {
            head.split('@').next().unwrap_or(head)
        } else {
            head
        };

        match (head, arg) {
            ("/confirm_payout", Some(id)) => Command::ConfirmPayout(PayoutId::new(id)),
            ("YES", Some(id)) => Command::Yes(PayoutId::new(id)),
            ("/help", None) | ("/start", None) => Command::Help,
            _ => Command::Unrecognized,
        }
    }

    /// Metric label.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ConfirmPayout(_) => "confirm_payout",
            Command::Yes(_) => "yes",
            Command::Help => "help",
            Command::Unrecognized => "unrecognized",
        }
    }
}

/// Reply to `/help` and to anything outside the grammar.
pub const USAGE: &str = "*Payout confirmation bot*\n\
\n\
`/confirm_payout <payout_id>` - start confirming a pending payout\n\
`YES <payout_id>` - finalize it (within the confirmation window)\n\
`/help` - show this message";
