use crate::{
    model::ModelSpec,
    story::{Genre, LengthTier},
};

pub struct PageView<'a> {
    pub story: &'a str,
    pub prompt: &'a str,
    pub genre: Genre,
    pub length: LengthTier,
    pub models: &'a [ModelSpec],
    pub current_model: &'a str,
}

const INLINE_CSS: &str = "body{font-family:Georgia,serif;max-width:46rem;margin:2rem auto;padding:0 1rem;}\
textarea{width:100%;min-height:5rem;}\
.story{white-space:pre-wrap;border-left:3px solid #8a6;padding:.5rem 1rem;margin:1.5rem 0;}\
.actions form{display:inline-block;margin-right:.5rem;}";

pub fn render(view: &PageView<'_>) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Story Generator</title>\n<style>");
    html.push_str(INLINE_CSS);
    html.push_str("</style>\n</head>\n<body>\n<h1>Story Generator</h1>\n");

    html.push_str("<form method=\"post\" action=\"/\">\n");
    html.push_str(&format!(
        "<label for=\"prompt\">Story prompt</label>\n<textarea id=\"prompt\" name=\"prompt\">{}</textarea>\n",
        escape_html(view.prompt)
    ));

    html.push_str("<label for=\"genre\">Genre</label>\n<select id=\"genre\" name=\"genre\">\n");
    for genre in Genre::ALL {
        push_option(&mut html, genre.as_str(), genre.as_str(), genre == view.genre);
    }
    html.push_str("</select>\n");

    html.push_str(
        "<label for=\"length_value\">Length</label>\n<select id=\"length_value\" name=\"length_value\">\n",
    );
    for tier in LengthTier::ALL {
        push_option(&mut html, tier.as_str(), tier.as_str(), tier == view.length);
    }
    html.push_str("</select>\n");

    html.push_str("<label for=\"model\">Model</label>\n<select id=\"model\" name=\"model\">\n");
    for spec in view.models {
        push_option(&mut html, &spec.key, &spec.name, spec.key == view.current_model);
    }
    html.push_str("</select>\n<button type=\"submit\">Generate</button>\n</form>\n");

    if !view.story.is_empty() {
        let story = escape_html(view.story);
        html.push_str(&format!("<div class=\"story\">{story}</div>\n"));
        html.push_str("<div class=\"actions\">\n");
        for (action, label) in [
            ("/download_story", "Download"),
            ("/generate_speech", "Listen"),
        ] {
            html.push_str(&format!(
                "<form method=\"post\" action=\"{action}\"><input type=\"hidden\" name=\"story_content\" value=\"{story}\"><button type=\"submit\">{label}</button></form>\n"
            ));
        }
        html.push_str("</div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn push_option(html: &mut String, value: &str, label: &str, selected: bool) {
    let selected = if selected { " selected" } else { "" };
    html.push_str(&format!(
        "<option value=\"{}\"{selected}>{}</option>\n",
        escape_html(value),
        escape_html(label)
    ));
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
