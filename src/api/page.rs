use ammonia::clean_text;
use pulldown_cmark::{html, Options, Parser};

use crate::error::AppError;
use crate::pipeline::{PipelineReport, VideoOutcome};

/// Stages of one submission, in the order the pipeline runs them.
pub const PROGRESS_STAGES: &[&str] = &[
    "Fetching the post through the proxy",
    "Extracting page metadata and video link",
    "Downloading the video (if the post has one)",
    "Analyzing with Gemini",
];

pub const SAMPLE_URLS: &[&str] = &[
    "https://t.me/abualiexpress/105824",
    "https://t.me/abualiexpress/105838",
    "https://t.me/shikmabressler24/145",
    "https://beactive.co.il/project/84917",
];

const HEAD: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Social Post Summarizer</title>
    <style>
      body { font-family: system-ui, sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }
      input[type=text], select { width: 100%; padding: .4rem; margin: .3rem 0 .8rem; box-sizing: border-box; }
      button { padding: .5rem 1.2rem; }
      pre { white-space: pre-wrap; background: #f4f4f4; padding: .8rem; }
      .error { background: #fde2e1; border: 1px solid #e0a3a0; padding: .8rem; }
      .notice { background: #fff6d5; border: 1px solid #e6d38a; padding: .8rem; }
      .success { background: #e3f6e5; border: 1px solid #9bd3a2; padding: .8rem; }
      #progress { display: none; margin-top: 1rem; }
      #progress ol { margin: .4rem 0; }
      .spinner { display: inline-block; width: 1rem; height: 1rem; border: 2px solid #999;
                 border-top-color: transparent; border-radius: 50%; animation: spin 1s linear infinite; }
      @keyframes spin { to { transform: rotate(360deg); } }
    </style>
  </head>
  <body>
    <h1>Social Post Summarizer</h1>
    <h2>Analyze a Social Post</h2>
"#;

const FOOT: &str = r#"    <script>
      document.getElementById("sample").addEventListener("change", function (e) {
        if (e.target.value) { document.getElementById("post_url").value = e.target.value; }
      });
      document.getElementById("summarize-form").addEventListener("submit", function () {
        document.getElementById("submit").disabled = true;
        document.getElementById("progress").style.display = "block";
        var started = Date.now();
        setInterval(function () {
          document.getElementById("elapsed").textContent = Math.round((Date.now() - started) / 1000) + "s";
        }, 1000);
      });
    </script>
  </body>
</html>
"#;

/// Renders the form page, followed by the outcome of a submission if there is one.
pub fn render(url: &str, outcome: Option<&Result<PipelineReport, AppError>>) -> String {
    let mut page = String::with_capacity(8 * 1024);
    page.push_str(HEAD);
    push_form(&mut page, url);

    match outcome {
        None => {}
        Some(Ok(report)) => push_report(&mut page, report),
        Some(Err(err)) => {
            page.push_str(&format!(
                "    <div class=\"error\" role=\"alert\"><strong>Error ({}):</strong> {}</div>\n",
                err.kind(),
                clean_text(&err.to_string())
            ));
        }
    }

    page.push_str(FOOT);
    page
}

fn push_form(page: &mut String, url: &str) {
    page.push_str("    <label for=\"sample\">Sample URLs</label>\n");
    page.push_str("    <select id=\"sample\">\n      <option value=\"\">(select a sample)</option>\n");
    for sample in SAMPLE_URLS {
        let escaped = clean_text(sample);
        page.push_str(&format!("      <option value=\"{escaped}\">{escaped}</option>\n"));
    }
    page.push_str("    </select>\n");

    page.push_str(&format!(
        r#"    <form id="summarize-form" action="/summarize" method="post">
      <label for="post_url">Post URL</label>
      <input type="text" id="post_url" name="url" value="{}" autofocus>
      <button id="submit" type="submit">Summarize</button>
    </form>
    <div id="progress" role="status">
      <span class="spinner"></span> Working on it (<span id="elapsed">0s</span>). The stages run in order:
      <ol>
"#,
        clean_text(url)
    ));
    for stage in PROGRESS_STAGES {
        page.push_str(&format!("        <li>{}...</li>\n", stage));
    }
    page.push_str("      </ol>\n    </div>\n");
}

fn push_report(page: &mut String, report: &PipelineReport) {
    page.push_str("    <h3>Fetched content (preview)</h3>\n");
    page.push_str(&format!("    <pre>{}</pre>\n", clean_text(&report.preview)));

    match &report.video {
        VideoOutcome::NotFound => {}
        VideoOutcome::Attached { bytes, mime_type } => page.push_str(&format!(
            "    <div class=\"success\">Video downloaded for analysis ({} bytes, {}).</div>\n",
            bytes,
            clean_text(mime_type)
        )),
        VideoOutcome::Skipped { reason } => page.push_str(&format!(
            "    <div class=\"notice\">Video download failed: {}. The summary uses the text only.</div>\n",
            clean_text(reason)
        )),
    }

    page.push_str("    <h3>Summary</h3>\n    <div class=\"summary\">\n");
    page.push_str(&render_markdown(&report.summary));
    page.push_str("\n    </div>\n");
}

/// Markdown from the model rendered to sanitized HTML.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut unsafe_html = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut unsafe_html, Parser::new_ext(markdown, options));
    ammonia::clean(&unsafe_html)
}
