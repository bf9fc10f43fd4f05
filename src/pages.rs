//! Minimal server-rendered HTML.

use std::fmt::Write;

use crate::encoding::{ANIMALS, SYMPTOM_GROUPS};
use crate::server::{Notice, Outcome};
use crate::types::FEATURE_COUNT;

const SITE_NAME: &str = "Beyond the Veil of Wellness";

const FEATURE_LABELS: [&str; FEATURE_COUNT] = [
    "Animal",
    "Blood/Brain Disease",
    "Appearance Disease",
    "General Disease",
    "Lung Disease",
    "Abdominal Disease",
];

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn humanize(label: &str) -> String {
    let mut words = label.replace('_', " ");
    if let Some(first) = words.get(..1) {
        let upper = first.to_uppercase();
        words.replace_range(..1, &upper);
    }
    words
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | {SITE_NAME}</title>\n</head>\n<body>\n\
         <nav><a href=\"/\">Home</a> <a href=\"/predict\">Predict</a> \
         <a href=\"/about\">About</a> <a href=\"/contact\">Contact</a></nav>\n\
         <main>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
    )
}

pub fn home() -> String {
    layout(
        "Home",
        "<h1>Beyond the Veil of Wellness</h1>\n\
         <p>Describe an animal's symptoms and get an instant health assessment.</p>\n\
         <p><a href=\"/predict\">Start a prediction</a></p>",
    )
}

pub fn about() -> String {
    layout(
        "About",
        "<h1>About</h1>\n\
         <p>A tree-based classifier trained on categorical symptom observations \
         flags animals that need urgent veterinary attention.</p>",
    )
}

pub fn contact() -> String {
    layout(
        "Contact",
        "<h1>Contact</h1>\n<p>Questions or feedback? Reach out to the maintainers.</p>",
    )
}

pub fn not_found() -> String {
    layout(
        "Not Found",
        "<h1>404</h1>\n<p>The page you requested does not exist.</p>",
    )
}

pub fn server_error() -> String {
    layout(
        "Server Error",
        "<h1>500</h1>\n<p>Something went wrong on our side. Please try again later.</p>",
    )
}

fn select(out: &mut String, name: &str, label: &str, options: &[&str]) {
    let _ = writeln!(out, "<label for=\"{name}\">{}</label>", escape(label));
    let _ = writeln!(out, "<select id=\"{name}\" name=\"{name}\" required>");
    out.push_str("<option value=\"\">Select...</option>\n");
    for option in options {
        let _ = writeln!(
            out,
            "<option value=\"{}\">{}</option>",
            escape(option),
            escape(&humanize(option))
        );
    }
    out.push_str("</select>\n");
}

pub fn predict_form(notice: Option<Notice>) -> String {
    let mut body = String::from("<h1>Animal Health Prediction</h1>\n");
    if let Some(notice) = notice {
        let _ = writeln!(
            body,
            "<div class=\"alert alert-error\" data-notice=\"{}\">{}</div>",
            notice.code(),
            escape(notice.message())
        );
    }

    body.push_str("<form method=\"post\" action=\"/submit\">\n");
    let animals: Vec<&str> = ANIMALS.iter().map(|&(name, _)| name).collect();
    select(&mut body, "animal_name", "Animal", &animals);
    for ((group, options), label) in SYMPTOM_GROUPS.iter().zip(&FEATURE_LABELS[1..]) {
        select(&mut body, &format!("{group}_disease"), label, options);
    }
    body.push_str("<button type=\"submit\">Predict</button>\n</form>");

    layout("Predict", &body)
}

pub fn result(outcome: &Outcome) -> String {
    let labels = &outcome.labels;
    let assessment = &outcome.assessment;
    let mut body = String::from("<h1>Prediction Result</h1>\n");
    let _ = writeln!(
        body,
        "<section class=\"result {}\">",
        assessment.status_class.as_str()
    );
    let _ = writeln!(body, "<h2>{}</h2>", escape(&labels[0]));
    let _ = writeln!(
        body,
        "<p class=\"status\">{}</p>",
        escape(assessment.health_status)
    );
    let _ = writeln!(
        body,
        "<p class=\"confidence\">Confidence: {:.2}%</p>",
        assessment.confidence
    );
    let _ = writeln!(
        body,
        "<p class=\"recommendation\">{}</p>",
        escape(assessment.recommendation)
    );

    body.push_str("<table class=\"features\">\n");
    for (name, value) in FEATURE_LABELS.iter().zip(labels) {
        let _ = writeln!(
            body,
            "<tr><th>{}</th><td>{}</td></tr>",
            escape(name),
            escape(value)
        );
    }
    body.push_str("</table>\n</section>\n<p><a href=\"/predict\">Make another prediction</a></p>");

    layout("Result", &body)
}
