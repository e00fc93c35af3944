//! Transcript rendering
//!
//! Produces the chat history fragment shown on the page. Messages are
//! HTML-escaped; rendering has no side effects, so the same transcript always
//! renders to the same string.

use minijinja::{context, Environment};
use once_cell::sync::Lazy;
use serde::Serialize;

use textbook_chat_core::{Error, Result, Transcript, TurnRole};

const USER_ICON: &str = "https://www.iconpacks.net/icons/2/free-user-icon-3296-thumb.png";
const BOT_ICON: &str = "https://img.icons8.com/ios-filled/50/000000/chatbot.png";

const TRANSCRIPT_TEMPLATE: &str = r#"<div class="chat-container" id="chat-container">
{%- for turn in turns %}
  <div class="chat-box">
    <img src="{{ turn.icon|safe }}" class="{{ turn.role }}-icon"/>
    <div class="message {{ turn.role }}-message">
      <p><strong>{{ turn.label }}:</strong> {{ turn.message }}</p>
    </div>
  </div>
{%- endfor %}
</div>"#;

// Auto-escaping is keyed off the ".html" template name.
static ENV: Lazy<Environment<'static>> = Lazy::new(Environment::new);

#[derive(Serialize)]
struct TurnView<'a> {
    role: &'static str,
    label: &'static str,
    icon: &'static str,
    message: &'a str,
}

/// Render the whole transcript, oldest turn first
pub fn render_transcript(transcript: &Transcript) -> Result<String> {
    let turns: Vec<TurnView<'_>> = transcript
        .turns()
        .iter()
        .map(|turn| TurnView {
            role: turn.role().as_str(),
            label: turn.role().label(),
            icon: match turn.role() {
                TurnRole::User => USER_ICON,
                TurnRole::Bot => BOT_ICON,
            },
            message: turn.message(),
        })
        .collect();

    ENV.render_named_str(
        "transcript.html",
        TRANSCRIPT_TEMPLATE,
        context! { turns => turns },
    )
    .map_err(|e| Error::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_transcript() {
        let html = render_transcript(&Transcript::new()).unwrap();
        assert!(html.starts_with("<div class=\"chat-container\""));
        assert!(!html.contains("chat-box"));
    }

    #[test]
    fn test_turns_in_insertion_order() {
        let mut transcript = Transcript::new();
        transcript.append_exchange("първи въпрос", "първи отговор");
        transcript.append_exchange("втори въпрос", "втори отговор");

        let html = render_transcript(&transcript).unwrap();
        let positions: Vec<usize> = [
            "първи въпрос",
            "първи отговор",
            "втори въпрос",
            "втори отговор",
        ]
        .iter()
        .map(|needle| html.find(needle).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(html.matches("user-message").count(), 2);
        assert_eq!(html.matches("bot-message").count(), 2);
        assert!(html.contains("<strong>User:</strong> първи въпрос"));
        assert!(html.contains("<strong>Bot:</strong> първи отговор"));
    }

    #[test]
    fn test_messages_are_escaped() {
        let mut transcript = Transcript::new();
        transcript.append_exchange("<script>alert(1)</script>", "a & b");

        let html = render_transcript(&transcript).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut transcript = Transcript::new();
        transcript.append_exchange("q", "a");
        assert_eq!(
            render_transcript(&transcript).unwrap(),
            render_transcript(&transcript).unwrap()
        );
    }
}
