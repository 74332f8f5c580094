//! HTML pages shown in the member's browser at the end of the OAuth redirect.

use axum::response::Html;
use domain::verification::Verified;

const STYLE: &str = r#"
    body {
      font-family: Arial, sans-serif;
      display: flex;
      justify-content: center;
      align-items: center;
      height: 100vh;
      margin: 0;
      background: #36393f;
      color: #dcddde;
    }
    .container {
      text-align: center;
      padding: 40px;
      background: #2f3136;
      border-radius: 8px;
    }
    h1.ok { color: #43b581; }
    h1.failed { color: #f04747; }"#;

pub(crate) fn success(verified: &Verified) -> Html<String> {
    render(
        "Verification Successful",
        &format!(
            r#"<h1 class="ok">✅ Verification Successful!</h1>
      <p>You have been verified as <strong>{}</strong></p>
      <p>You now have access to all channels in <strong>{}</strong></p>
      <p>You can close this window and return to Discord.</p>"#,
            escape(&verified.username),
            escape(&verified.scope_name),
        ),
    )
}

pub(crate) fn failure(reason: &str) -> Html<String> {
    render(
        "Verification Failed",
        &format!(
            r#"<h1 class="failed">❌ Authorization failed</h1>
      <p>{}</p>
      <p>Return to Discord and press <strong>Verify Me</strong> to try again.</p>"#,
            escape(reason),
        ),
    )
}

fn render(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>{STYLE}
  </style>
</head>
<body>
  <div class="container">
      {body}
  </div>
</body>
</html>
"#
    ))
}

/// Usernames and guild names are user-controlled.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_page_names_user_and_guild() {
        let Html(page) = success(&Verified {
            subject_id: "U1".to_string(),
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            scope_name: "Guild One".to_string(),
        });

        assert!(page.contains("<strong>alice</strong>"));
        assert!(page.contains("<strong>Guild One</strong>"));
    }

    #[test]
    fn test_names_are_escaped() {
        let Html(page) = success(&Verified {
            subject_id: "U1".to_string(),
            username: "<script>alert(1)</script>".to_string(),
            display_name: String::new(),
            scope_name: "Tom & Jerry".to_string(),
        });

        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("Tom &amp; Jerry"));
    }
}
