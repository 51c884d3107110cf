// SPDX-FileCopyrightText: 2026 Sitebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned responses for degraded mode and failure paths.
//!
//! When the installation has no valid gateway token, or a completion
//! fails, the visitor still gets plain text. Raw provider errors never
//! reach the end user.

use rand::seq::SliceRandom;

/// Shown when the gateway reports the account balance is exhausted.
pub const BUDGET_MESSAGE: &str =
    "I'm sorry, but I can't answer right now because the assistant's account \
     balance is too low. Please contact the site administrator.";

const APOLOGIES: [&str; 4] = [
    "I'm sorry, something went wrong on my end. Could you try that again?",
    "Apologies, I ran into a problem answering that. Please try again in a moment.",
    "Sorry about that, I couldn't process your message just now. Mind trying again?",
    "I hit a snag while answering. Please give it another try shortly.",
];

const GREETINGS: [&str; 3] = [
    "Hello! How can I help you today?",
    "Hi there! What can I do for you?",
    "Welcome! How may I assist you?",
];

const HELP_REPLIES: [&str; 2] = [
    "I'm here to help. Could you tell me a bit more about what you need?",
    "Happy to help! What would you like to know?",
];

const THANKS_REPLIES: [&str; 2] = [
    "You're welcome! Is there anything else I can do for you?",
    "My pleasure! Let me know if you need anything else.",
];

const GOODBYES: [&str; 2] = [
    "Goodbye! Feel free to come back anytime.",
    "Take care! We're here whenever you need us.",
];

const FILLERS: [&str; 3] = [
    "Thanks for your message! A team member will follow up with you soon.",
    "I've noted your message. Someone from the team will get back to you shortly.",
    "Thank you for reaching out. We'll be in touch as soon as possible.",
];

/// A randomly selected generic apology for unclassified failures.
pub fn apology() -> String {
    pick(&APOLOGIES)
}

/// Keyword-matched canned reply for degraded mode (no valid token).
pub fn canned_reply(message: &str) -> String {
    let lowered = message.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words
        .iter()
        .any(|w| matches!(*w, "hello" | "hi" | "hey" | "howdy"))
    {
        pick(&GREETINGS)
    } else if lowered.contains("help") {
        pick(&HELP_REPLIES)
    } else if lowered.contains("thank") {
        pick(&THANKS_REPLIES)
    } else if words.iter().any(|w| matches!(*w, "bye" | "goodbye")) {
        pick(&GOODBYES)
    } else {
        pick(&FILLERS)
    }
}

fn pick(options: &[&str]) -> String {
    options
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(options[0])
        .to_string()
}
