//! HTML for the two stages of the page.

use crate::image::{GeneratedImage, UploadedImage};
use std::fmt::Write;

const TITLE: &str = "🔥 Tinder Gen App";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; }
aside { width: 18rem; padding: 1.5rem; background: #f0f2f6; }
main { flex: 1; padding: 1.5rem 3rem; }
.panes { display: flex; gap: 2rem; }
.panes section { flex: 1; }
.panes img { width: 100%; }
.error { background: #ffe4e4; color: #7d1a1a; padding: .6rem 1rem; border-radius: .4rem; margin: .4rem 0; }
.warning { background: #fff6d6; color: #6b5200; padding: .6rem 1rem; border-radius: .4rem; margin: .4rem 0; }
.success { background: #dff5e1; color: #14532d; padding: .6rem 1rem; border-radius: .4rem; margin: .4rem 0; }
textarea, input[type=email], input[type=password] { width: 100%; box-sizing: border-box; }
button { width: 100%; padding: .6rem; background: #ff4b4b; color: white; border: 0; border-radius: .4rem; }
#busy { display: none; }
"#;

/// What the generated-image pane shows.
pub(crate) enum ResultPane<'a> {
    /// No click yet on this render.
    Idle,
    /// The first image the vendor returned.
    Image(&'a GeneratedImage),
    /// One line per problem.
    Errors(Vec<String>),
}

/// Everything the workflow stage needs to render.
pub(crate) struct WorkflowView<'a> {
    pub prompt: &'a str,
    pub uploaded: Option<&'a UploadedImage>,
    pub has_credential: bool,
    pub result: ResultPane<'a>,
}

/// The email gate.
pub(crate) fn gate_page(email: &str, error: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<main>");
    let _ = write!(body, "<h1>{TITLE}</h1>");
    body.push_str("<p>Welcome to the Tinder Gen App! Enter your email to get started.</p>");
    if let Some(error) = error {
        let _ = write!(body, r#"<div class="error">{}</div>"#, escape_html(error));
    }
    let _ = write!(
        body,
        r#"<form method="post" action="/subscribe">
<label for="email">Email</label>
<input type="email" id="email" name="email" value="{}" required autofocus>
<button type="submit">Submit</button>
</form>"#,
        escape_html(email)
    );
    body.push_str("</main>");
    page(&body)
}

/// The generator, shown once the gate has been passed.
pub(crate) fn workflow_page(view: &WorkflowView<'_>) -> String {
    let mut body = String::new();
    body.push_str(
        r#"<form method="post" action="/generate" enctype="multipart/form-data" onsubmit="document.getElementById('busy').style.display='block';this.querySelector('button').disabled=true;">"#,
    );

    body.push_str("<aside><h2>Settings</h2>");
    body.push_str(r#"<label for="api_key">Enter your API key</label>"#);
    body.push_str(
        r#"<input type="password" id="api_key" name="api_key" autocomplete="off" value="">"#,
    );
    if view.has_credential {
        body.push_str(r#"<div class="success">API key saved!</div>"#);
    } else {
        body.push_str(
            r#"<div class="warning">Please enter your API key to use this app.</div>"#,
        );
    }
    body.push_str("</aside>");

    body.push_str("<main>");
    let _ = write!(body, "<h1>{TITLE}</h1>");
    body.push_str("<p>Welcome to the Tinder Gen App!</p>");
    let _ = write!(
        body,
        r#"<label for="prompt">Enter your prompt</label>
<textarea id="prompt" name="prompt" rows="8" placeholder="Describe how you want to transform or generate the image for your Tinder profile.">{}</textarea>
<label for="image">Upload image</label>
<input type="file" id="image" name="image" accept=".jpg,.jpeg,.png,image/jpeg,image/png">
<button type="submit">Generate Image</button>
<div id="busy" class="warning">Generating image...</div>"#,
        escape_html(view.prompt)
    );

    body.push_str(r#"<div class="panes"><section><h2>Uploaded Image</h2>"#);
    if let Some(uploaded) = view.uploaded {
        let _ = write!(
            body,
            r#"<img src="{}" alt="Uploaded Image"><p>{}</p>"#,
            uploaded.to_data_url(),
            escape_html(uploaded.file_name().unwrap_or("Uploaded Image"))
        );
    }
    body.push_str("</section><section><h2>Generated Image</h2>");
    match &view.result {
        ResultPane::Idle => body.push_str(
            r#"<div class="warning">Click the 'Generate Image' button to generate an image.</div>"#,
        ),
        ResultPane::Image(image) => {
            let _ = write!(
                body,
                r#"<img src="{}" alt="Generated Image"><p>Generated Image</p>"#,
                image.to_data_url()
            );
        }
        ResultPane::Errors(errors) => {
            for error in errors {
                let _ = write!(body, r#"<div class="error">{}</div>"#, escape_html(error));
            }
        }
    }
    body.push_str("</section></div></main></form>");
    page(&body)
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Tinder Gen App</title>
<style>{STYLE}</style>
</head>
<body>{body}</body>
</html>"#
    )
}

/// Escapes text for use in element content and double-quoted attributes.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::types::tests::PNG_MAGIC;
    use crate::image::{GenerationMetadata, ImageFormat, ImageProviderKind};

    fn view(result: ResultPane<'_>) -> WorkflowView<'_> {
        WorkflowView {
            prompt: "",
            uploaded: None,
            has_credential: false,
            result,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_gate_page_has_only_email_form() {
        let html = gate_page("", None);
        assert!(html.contains(r#"action="/subscribe""#));
        assert!(!html.contains(r#"action="/generate""#));
        assert!(!html.contains("class=\"error\""));
    }

    #[test]
    fn test_gate_page_refills_and_escapes() {
        let html = gate_page("<script>", Some("please enter a valid email address"));
        assert!(html.contains(r#"value="&lt;script&gt;""#));
        assert!(html.contains("please enter a valid email address"));
    }

    #[test]
    fn test_workflow_page_has_no_email_form() {
        let html = workflow_page(&view(ResultPane::Idle));
        assert!(html.contains(r#"action="/generate""#));
        assert!(!html.contains(r#"action="/subscribe""#));
        assert!(html.contains("Click the 'Generate Image' button"));
        assert!(html.contains("Please enter your API key to use this app."));
    }

    #[test]
    fn test_workflow_page_never_echoes_credential() {
        let mut v = view(ResultPane::Idle);
        v.has_credential = true;
        let html = workflow_page(&v);
        assert!(html.contains("API key saved!"));
        assert!(html.contains(r#"name="api_key" autocomplete="off" value="""#));
    }

    #[test]
    fn test_workflow_page_shows_panes() {
        let uploaded =
            UploadedImage::from_bytes(PNG_MAGIC.to_vec(), Some("me.png".into())).unwrap();
        let generated = GeneratedImage::new(
            PNG_MAGIC.to_vec(),
            ImageFormat::Png,
            ImageProviderKind::Gemini,
            GenerationMetadata::default(),
        );
        let html = workflow_page(&WorkflowView {
            prompt: "at the beach",
            uploaded: Some(&uploaded),
            has_credential: true,
            result: ResultPane::Image(&generated),
        });
        assert!(html.contains("at the beach</textarea>"));
        assert!(html.contains(r#"alt="Uploaded Image""#));
        assert!(html.contains(r#"alt="Generated Image""#));
        assert!(html.contains("data:image/png;base64,"));
    }

    #[test]
    fn test_workflow_page_lists_every_error() {
        let html = workflow_page(&view(ResultPane::Errors(vec![
            "first".into(),
            "second".into(),
        ])));
        assert_eq!(html.matches(r#"<div class="error">"#).count(), 2);
    }
}
