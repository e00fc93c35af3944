//! Chat page
//!
//! Wraps the rendered transcript in the page chrome: title, styles, and the
//! question form. The transcript fragment is already escaped by the renderer.

use minijinja::{context, Environment};
use once_cell::sync::Lazy;

use textbook_chat_config::prompts::page;

use crate::ServerError;

const BROWSER_TITLE: &str = "Inovations and InstitutionalEconomics Chatbot";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="bg">
<head>
  <meta charset="utf-8"/>
  <meta name="viewport" content="width=device-width, initial-scale=1"/>
  <title>{{ browser_title }}</title>
  <style>
    body { font-family: sans-serif; margin: 0 auto; max-width: 1100px; padding: 1rem; }
    .chat-container {
      background-color: #f5f5f5;
      border-radius: 10px;
      padding: 10px;
      max-height: 500px;
      overflow-y: auto;
      display: flex;
      flex-direction: column;
    }
    .message { margin: 10px 0; padding: 10px; border-radius: 10px; width: fit-content; }
    .user-message { background-color: #e0f7fa; text-align: left; }
    .bot-message { background-color: #e1bee7; text-align: left; }
    .message p { margin: 0; }
    .user-icon, .bot-icon { width: 40px; height: 40px; border-radius: 50%; margin-right: 10px; }
    .chat-box { display: flex; align-items: center; }
    .input-area { display: flex; justify-content: center; padding-bottom: 60px; }
    #loading { display: none; font-style: italic; }
  </style>
</head>
<body>
  <h1>{{ title }}</h1>
  <p>{{ subtitle }}</p>
  <form method="post" action="/chat/{{ session_id }}" id="chat-form"
        onsubmit="document.getElementById('loading').style.display='block'">
    <label for="question">{{ input_label }}</label>
    <input type="text" id="question" name="question" autocomplete="off" autofocus/>
    <button type="submit">{{ send_button }}</button>
  </form>
  <p id="loading">{{ loading }}</p>
  {{ transcript|safe }}
</body>
</html>"#;

static ENV: Lazy<Environment<'static>> = Lazy::new(Environment::new);

/// Render the full page for one session
pub fn render_page(session_id: &str, transcript_html: &str) -> Result<String, ServerError> {
    ENV.render_named_str(
        "page.html",
        PAGE_TEMPLATE,
        context! {
            browser_title => BROWSER_TITLE,
            title => page::TITLE,
            subtitle => page::SUBTITLE,
            input_label => page::INPUT_LABEL,
            send_button => page::SEND_BUTTON,
            loading => page::LOADING,
            session_id => session_id,
            transcript => transcript_html,
        },
    )
    .map_err(|e| ServerError::Render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_contains_chrome_and_form() {
        let html = render_page("abc-123", "<div class=\"chat-container\"></div>").unwrap();

        // Chrome text is escaped like any other value
        assert!(html.contains("<h1>📚 inovations &amp; Economics Chatbot</h1>"));
        assert!(!html.contains(page::TITLE));
        assert!(html.contains(page::INPUT_LABEL));
        assert!(html.contains("action=\"/chat/abc-123\""));
        assert!(html.contains("name=\"question\""));
    }

    #[test]
    fn test_transcript_inserted_verbatim() {
        let fragment = "<div class=\"chat-container\" id=\"chat-container\"><p>&lt;b&gt;</p></div>";
        let html = render_page("s", fragment).unwrap();
        assert!(html.contains(fragment));
    }
}
