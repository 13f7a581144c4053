//! Server-rendered chat page

use crate::session::Notice;
use crate::types::{ConversationEntry, Document, Role};

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Chat with PDF</title>
  <style>{{css}}</style>
</head>
<body>
  <aside class="sidebar">
    <h2>Upload a PDF</h2>
    <form action="/upload" method="post" enctype="multipart/form-data">
      <input id="pdf-file" type="file" name="file" accept=".pdf,application/pdf" required>
      <iframe id="pdf-preview" title="PDF preview" hidden></iframe>
      <button type="submit">Add to Knowledge Base</button>
    </form>
    {{documents}}
  </aside>
  <main>
    <h1>Chat with PDF using {{model}}</h1>
    <p class="caption">This app allows you to chat with a PDF using a locally running Ollama model.</p>
    {{notice}}
    <section id="messages" class="messages">
{{messages}}
    </section>
    <form class="ask" action="/ask" method="post">
      <input type="text" name="prompt" placeholder="Ask a question about the PDF" autocomplete="off" autofocus>
      <button type="submit">Send</button>
    </form>
    <form class="clear" action="/clear" method="post">
      <button type="submit">Clear Chat History</button>
    </form>
  </main>
  <script>{{script}}</script>
</body>
</html>"#;

const CSS: &str = r#"
body { margin: 0; display: flex; min-height: 100vh; font-family: system-ui, sans-serif; color: #262730; }
.sidebar { width: 320px; padding: 1.5rem; background: #f0f2f6; box-sizing: border-box; }
.sidebar form { display: flex; flex-direction: column; gap: 0.75rem; }
#pdf-preview { width: 100%; height: 400px; border: 1px solid #ccc; }
main { flex: 1; padding: 1.5rem 3rem; max-width: 60rem; }
.caption { color: #6b6f76; }
.notice { padding: 0.75rem 1rem; border-radius: 0.5rem; margin-bottom: 1rem; }
.notice.success { background: #e6f4ea; color: #1e7b34; }
.notice.error { background: #fdecea; color: #a4262c; }
.messages { display: flex; flex-direction: column; gap: 0.75rem; max-height: 60vh; overflow-y: auto; margin-bottom: 1rem; }
.message { padding: 0.75rem 1rem; border-radius: 0.5rem; white-space: pre-wrap; }
.message.user { background: #f0f2f6; align-self: flex-end; }
.message.assistant { background: #fff; border: 1px solid #e6e6e6; }
.message .role { display: block; font-size: 0.75rem; color: #6b6f76; margin-bottom: 0.25rem; }
.ask { display: flex; gap: 0.5rem; }
.ask input { flex: 1; padding: 0.6rem; }
.clear { margin-top: 0.75rem; }
.documents { margin-top: 1.5rem; font-size: 0.9rem; }
"#;

/// Shows the picked file in the preview frame before it is uploaded
const PREVIEW_SCRIPT: &str = r#"
const input = document.getElementById('pdf-file');
const preview = document.getElementById('pdf-preview');
input.addEventListener('change', () => {
  const file = input.files[0];
  if (!file) { preview.hidden = true; return; }
  preview.src = URL.createObjectURL(file);
  preview.hidden = false;
});
const messages = document.getElementById('messages');
messages.scrollTop = messages.scrollHeight;
"#;

/// Everything the page shows for one session
pub struct PageView<'a> {
    pub model: &'a str,
    pub entries: &'a [ConversationEntry],
    pub notice: Option<&'a Notice>,
    pub documents: &'a [Document],
}

/// Render the chat page
pub fn render_page(view: &PageView<'_>) -> String {
    PAGE_TEMPLATE
        .replace("{{css}}", CSS)
        .replace("{{script}}", PREVIEW_SCRIPT)
        .replace("{{model}}", &html_escape(view.model))
        .replace("{{documents}}", &render_documents(view.documents))
        .replace("{{notice}}", &view.notice.map(render_notice).unwrap_or_default())
        .replace("{{messages}}", &render_messages(view.entries))
}

fn render_messages(entries: &[ConversationEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let (class, label) = match entry.role() {
                Role::User => ("user", "You"),
                Role::Assistant => ("assistant", "Assistant"),
            };
            format!(
                r#"      <div class="message {}"><span class="role">{}</span>{}</div>"#,
                class,
                label,
                html_escape(entry.content())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_notice(notice: &Notice) -> String {
    let class = if notice.is_error() { "error" } else { "success" };
    format!(
        r#"<div class="notice {}" role="status">{}</div>"#,
        class,
        html_escape(notice.message())
    )
}

fn render_documents(documents: &[Document]) -> String {
    if documents.is_empty() {
        return String::new();
    }

    let items: String = documents
        .iter()
        .map(|doc| {
            let pages = doc
                .total_pages
                .map(|p| format!(" ({} page{})", p, if p == 1 { "" } else { "s" }))
                .unwrap_or_default();
            format!("<li>{}{}</li>", html_escape(&doc.filename), pages)
        })
        .collect();

    format!(
        r#"<div class="documents"><h3>In the knowledge base</h3><ul>{}</ul></div>"#,
        items
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        // Keeps user text from forming template placeholders
        .replace('{', "&#123;")
}
